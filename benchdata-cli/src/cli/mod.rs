//! Command-line interface for listing, fetching, and generating benchmark
//! datasets.
//!
//! `list` prints the registered dataset and format names and marks the
//! datasets that are downloaded. `fetch` warms the download cache for a single
//! URL. `generate` runs the memoised generation pipeline once and reports the
//! shape of each partition. `--log-format` and `--log-filter` apply to every
//! command.

mod commands;

pub use commands::{
    Cli, CliError, Command, DatasetListing, ExecutionSummary, FetchCommand, GenerateCommand,
    GenerationSummary, LoggingArgs, render_summary, run_cli,
};
