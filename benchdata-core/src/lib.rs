//! Benchdata core library.
//!
//! Produces train/test feature-label pairs for benchmark harnesses from three
//! kinds of source: seeded synthetic generators, downloaded real-world
//! datasets cached on disk, and an all-zero baseline. Generated data is
//! delivered in the representation the caller asks for (dense arrays,
//! columnar frames, device-layout arrays, or compressed sparse matrices).
//!
//! The entry point is [`DataGenerator::gen_data`], which memoises its most
//! recent results in a bounded LRU cache.
//!
//! # Memo cache metrics
//!
//! When the `metrics` feature is enabled the memo cache emits:
//!
//! - `benchdata_memo_hits` (counter)
//! - `benchdata_memo_misses` (counter)
//! - `benchdata_memo_evictions` (counter)

mod config;
mod convert;
mod dataset;
mod error;
mod fetch;
mod generators;
mod orchestrator;
mod snapshot;
mod split;
#[cfg(test)]
mod test_utils;

pub use crate::{
    config::{BenchdataConfig, CACHE_DIR_ENV, DEFAULT_MEMO_CAPACITY, DEFAULT_SPARSITY_RATIO},
    convert::{
        CompressedMatrix, Convertible, Converter, ConverterRegistry, DataFormat, DeviceArray,
        MemoryOrder, SparseLayout, Value,
    },
    dataset::{BenchmarkData, Dataset, LearningTask, Split},
    error::{BenchdataError, BenchdataErrorCode, ErrorCategory, Result},
    fetch::{DownloadClient, Fetcher, UreqDownloadClient},
    generators::{
        DataContext, DatasetName, DatasetSources, Generator, GeneratorParams, GeneratorRegistry,
        GeneratorRequest,
    },
    orchestrator::{DEFAULT_RANDOM_STATE, DataGenerator, GenDataRequest, RequestKey},
    snapshot::SnapshotCache,
    split::train_test_split,
};
