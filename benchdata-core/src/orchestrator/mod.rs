//! The memoised `gen_data` entry point.
//!
//! A request flows through the generator registry, an optional seeded
//! train/test split, and the converter registry. Converted splits are shared
//! behind [`Arc`] and remembered in a bounded LRU keyed by every parameter
//! that can change the result.

mod memo;

use std::{path::Path, sync::Arc};

use rand::{SeedableRng, rngs::SmallRng};
use tracing::{debug, instrument};

use crate::{
    config::BenchdataConfig,
    convert::{Converter, ConverterRegistry, DataFormat},
    dataset::Split,
    error::{BenchdataError, Result},
    fetch::{DownloadClient, Fetcher},
    generators::{
        DataContext, DatasetName, Generator, GeneratorParams, GeneratorRegistry, GeneratorRequest,
    },
    split::train_test_split,
};

use self::memo::MemoCache;

/// Seed used when a request does not supply one.
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// Parameters of a single [`DataGenerator::gen_data`] call.
///
/// # Examples
/// ```
/// use benchdata_core::{DataFormat, DatasetName, GenDataRequest};
///
/// let request = GenDataRequest::new(DatasetName::Blobs, DataFormat::Numpy)
///     .with_samples(1_000)
///     .with_features(8)
///     .with_test_fraction(0.2);
/// assert_eq!(request.n_samples(), 1_000);
/// assert_eq!(request.random_state(), 42);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenDataRequest {
    dataset: DatasetName,
    format: DataFormat,
    n_samples: usize,
    n_features: usize,
    random_state: u64,
    test_fraction: f64,
    params: GeneratorParams,
}

impl GenDataRequest {
    /// Requests `dataset` in `format` with default sizes, seed, and no split.
    #[must_use]
    pub const fn new(dataset: DatasetName, format: DataFormat) -> Self {
        Self {
            dataset,
            format,
            n_samples: 0,
            n_features: 0,
            random_state: DEFAULT_RANDOM_STATE,
            test_fraction: 0.0,
            params: GeneratorParams {
                centers: None,
                n_classes: None,
            },
        }
    }

    /// Parses dataset and format names.
    ///
    /// # Errors
    /// Returns [`BenchdataError::UnknownDataset`] or
    /// [`BenchdataError::UnknownFormat`] for unregistered names.
    pub fn parse(dataset: &str, format: &str) -> Result<Self> {
        Ok(Self::new(dataset.parse()?, format.parse()?))
    }

    /// Sets the number of train rows; 0 asks for the generator default.
    #[must_use]
    pub const fn with_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Sets the number of features; 0 asks for the generator default.
    #[must_use]
    pub const fn with_features(mut self, n_features: usize) -> Self {
        self.n_features = n_features;
        self
    }

    /// Sets the seed used for generation, splitting, and sparsification.
    #[must_use]
    pub const fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Sets the fraction of generated rows held out for testing.
    #[must_use]
    pub const fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Sets generator-specific parameters.
    #[must_use]
    pub const fn with_params(mut self, params: GeneratorParams) -> Self {
        self.params = params;
        self
    }

    /// Requested dataset.
    #[must_use]
    pub const fn dataset(&self) -> DatasetName {
        self.dataset
    }

    /// Requested output format.
    #[must_use]
    pub const fn format(&self) -> DataFormat {
        self.format
    }

    /// Requested train rows, or 0 for the default.
    #[must_use]
    pub const fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Requested features, or 0 for the default.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }

    /// Seed for every randomised step.
    #[must_use]
    pub const fn random_state(&self) -> u64 {
        self.random_state
    }

    /// Fraction of generated rows held out for testing.
    #[must_use]
    pub const fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Generator-specific parameters.
    #[must_use]
    pub const fn params(&self) -> GeneratorParams {
        self.params
    }

    /// Memoisation key identifying this request.
    #[must_use]
    pub const fn key(&self) -> RequestKey {
        RequestKey {
            dataset: self.dataset,
            format: self.format,
            n_samples: self.n_samples,
            n_features: self.n_features,
            random_state: self.random_state,
            test_fraction_bits: self.test_fraction.to_bits(),
            params: self.params,
        }
    }
}

/// Hashable identity of a [`GenDataRequest`].
///
/// The test fraction is compared bit-for-bit.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RequestKey {
    dataset: DatasetName,
    format: DataFormat,
    n_samples: usize,
    n_features: usize,
    random_state: u64,
    test_fraction_bits: u64,
    params: GeneratorParams,
}

/// Produces benchmark splits and memoises the most recent results.
///
/// # Examples
/// ```
/// use benchdata_core::{BenchdataConfig, DataFormat, DataGenerator, DatasetName, GenDataRequest};
///
/// let dir = tempfile::tempdir().expect("temporary cache dir");
/// let generator = DataGenerator::new(BenchdataConfig::new().with_cache_dir(dir.path()))
///     .expect("valid configuration");
/// let request = GenDataRequest::new(DatasetName::Zeros, DataFormat::Numpy)
///     .with_samples(10)
///     .with_features(3);
/// let split = generator.gen_data(&request).expect("zeros always generate");
/// assert_eq!(split.train_x.rows(), 10);
/// assert!(split.test_x.is_none());
/// ```
#[derive(Debug)]
pub struct DataGenerator {
    generators: GeneratorRegistry,
    converters: ConverterRegistry,
    context: DataContext,
    memo: MemoCache,
}

impl DataGenerator {
    /// Builds a generator with the built-in datasets and formats.
    ///
    /// # Errors
    /// Returns [`BenchdataError::InvalidParameter`] when the configuration
    /// fails validation.
    pub fn new(config: BenchdataConfig) -> Result<Self> {
        let capacity = config.validate()?;
        let converters = ConverterRegistry::new(config.sparsity_ratio())?;
        let cache_dir = config.cache_dir().to_path_buf();
        let context = DataContext::in_dir(&cache_dir, config.into_sources());
        Ok(Self {
            generators: GeneratorRegistry::default(),
            converters,
            context,
            memo: MemoCache::new(capacity),
        })
    }

    /// Replaces the transport used to download external datasets.
    #[must_use]
    pub fn with_download_client(mut self, client: Arc<dyn DownloadClient>) -> Self {
        let fetcher = Fetcher::with_client(self.cache_dir(), client);
        self.context = DataContext::new(
            fetcher,
            self.context.snapshots().clone(),
            self.context.sources().clone(),
        );
        self
    }

    /// Replaces the generator registered under `name`.
    #[must_use]
    pub fn with_generator(mut self, name: DatasetName, generator: Arc<dyn Generator>) -> Self {
        self.generators = self.generators.with_generator(name, generator);
        self
    }

    /// Replaces the converter registered for its format.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters = self.converters.with_converter(converter);
        self
    }

    /// Directory holding downloads and snapshots.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        self.context.fetcher().cache_dir()
    }

    /// The registered generators.
    #[must_use]
    pub const fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Number of results currently memoised.
    #[must_use]
    pub fn memoised(&self) -> usize {
        self.memo.len()
    }

    /// Generates, splits, and converts the data described by `request`.
    ///
    /// Identical requests return the same shared result until it is evicted.
    /// Failed requests are not memoised.
    ///
    /// # Errors
    /// Returns lookup errors for unregistered datasets or formats,
    /// [`BenchdataError::InvalidParameter`] for a test fraction outside
    /// `[0, 1)`, [`BenchdataError::Split`] when the train size exceeds the
    /// generated rows, and any error raised while generating or converting.
    #[instrument(
        name = "gen_data",
        err,
        skip(self, request),
        fields(dataset = %request.dataset, format = %request.format)
    )]
    pub fn gen_data(&self, request: &GenDataRequest) -> Result<Arc<Split>> {
        let key = request.key();
        if let Some(hit) = self.memo.get(&key) {
            debug!("memo hit");
            return Ok(hit);
        }
        let split = Arc::new(self.compute(request)?);
        self.memo.insert(key, Arc::clone(&split));
        Ok(split)
    }

    /// Parses `dataset` and `format` and generates them with default sizes.
    ///
    /// # Errors
    /// Returns lookup errors for unknown names, then anything
    /// [`DataGenerator::gen_data`] returns.
    pub fn gen_data_named(&self, dataset: &str, format: &str) -> Result<Arc<Split>> {
        self.gen_data(&GenDataRequest::parse(dataset, format)?)
    }

    fn compute(&self, request: &GenDataRequest) -> Result<Split> {
        let fraction = validate_test_fraction(request.test_fraction)?;
        self.converters.get(request.format)?;
        let generator = self.generators.get(request.dataset)?;
        let generator_request = GeneratorRequest {
            n_samples: inflate_for_test(request.n_samples, fraction),
            n_features: request.n_features,
            random_state: request.random_state,
            params: request.params,
        };
        let dataset = generator.generate(&generator_request, &self.context)?;
        debug!(
            rows = dataset.rows(),
            columns = dataset.columns(),
            "generated dataset"
        );

        let split = if fraction > 0.0 {
            let train_size = if request.n_samples == 0 {
                train_share(dataset.rows(), fraction)
            } else {
                request.n_samples
            };
            train_test_split(dataset, train_size, request.random_state)?
        } else {
            Split::unsplit(dataset)
        };
        let mut rng = SmallRng::seed_from_u64(request.random_state);
        self.converters
            .convert_split(request.format, split, &mut rng)
    }
}

fn validate_test_fraction(fraction: f64) -> Result<f64> {
    if fraction.is_finite() && (0.0..1.0).contains(&fraction) {
        return Ok(fraction);
    }
    Err(BenchdataError::InvalidParameter {
        parameter: "test_fraction",
        message: format!("{fraction} is not within [0, 1)"),
    })
}

/// Rows to generate so that `n_samples` remain after holding out `fraction`.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "row counts are scaled by a fraction in [0, 1) and floored"
)]
fn inflate_for_test(n_samples: usize, fraction: f64) -> usize {
    (n_samples as f64 / (1.0 - fraction)).floor() as usize
}

/// Train rows kept from `rows` generated rows when `fraction` is held out.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "row counts are scaled by a fraction in [0, 1) and floored"
)]
fn train_share(rows: usize, fraction: f64) -> usize {
    (rows as f64 * (1.0 - fraction)).floor() as usize
}

#[cfg(test)]
mod tests;
