//! Command implementations and argument parsing for the benchdata CLI.

use std::io::{self, Write};
use std::path::PathBuf;

use benchdata_core::{
    BenchdataConfig, BenchdataError, DEFAULT_RANDOM_STATE, DataFormat, DataGenerator,
    DatasetName, Fetcher, GenDataRequest, GeneratorParams,
};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use crate::logging::{LogFormat, LoggingError, LoggingSettings};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "benchdata",
    about = "Generate, download, and convert benchmark datasets."
)]
pub struct Cli {
    /// Logging overrides shared by every command.
    #[command(flatten)]
    pub logging: LoggingArgs,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Flags controlling diagnostic output on stderr.
#[derive(Debug, Args, Clone, Default)]
pub struct LoggingArgs {
    /// Log format; overrides `BENCHDATA_LOG_FORMAT`.
    #[arg(long = "log-format", value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    /// Filter directives such as `benchdata_core=debug`; overrides `RUST_LOG`.
    #[arg(long = "log-filter", global = true)]
    pub log_filter: Option<String>,
}

impl LoggingArgs {
    /// Resolves these flags against the environment.
    ///
    /// # Errors
    /// Returns [`LoggingError`] when the resolved format or filter is invalid.
    pub fn settings(&self) -> Result<LoggingSettings, LoggingError> {
        LoggingSettings::resolve(self.log_format, self.log_filter.as_deref())
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List the registered datasets and output formats.
    List,
    /// Download and decompress a single remote file into the cache.
    Fetch(FetchCommand),
    /// Generate a dataset and report the shape of each partition.
    Generate(GenerateCommand),
}

/// Options accepted by the `fetch` command.
#[derive(Debug, Args, Clone)]
pub struct FetchCommand {
    /// URL of a `.gz`, `.bz2`, or `.zip` file.
    pub url: String,

    /// Cache directory (defaults to `BENCHDATA_CACHE_DIR`, then `.`).
    #[arg(long = "cache-dir")]
    pub cache_dir: Option<PathBuf>,
}

/// Options accepted by the `generate` command.
#[derive(Debug, Args, Clone)]
pub struct GenerateCommand {
    /// Registered dataset name.
    #[arg(long)]
    pub dataset: String,

    /// Output format name.
    #[arg(long, default_value = "numpy")]
    pub format: String,

    /// Train rows; 0 uses the dataset default.
    #[arg(long, default_value_t = 0)]
    pub samples: usize,

    /// Features; 0 uses the dataset default.
    #[arg(long, default_value_t = 0)]
    pub features: usize,

    /// Seed for generation, splitting, and sparsification.
    #[arg(long, default_value_t = DEFAULT_RANDOM_STATE)]
    pub seed: u64,

    /// Fraction of generated rows held out for testing, in `[0, 1)`.
    #[arg(long = "test-fraction", default_value_t = 0.0)]
    pub test_fraction: f64,

    /// Cluster count for `blobs`.
    #[arg(long)]
    pub centers: Option<usize>,

    /// Class count for `classification`.
    #[arg(long)]
    pub classes: Option<usize>,

    /// Cache directory (defaults to `BENCHDATA_CACHE_DIR`, then `.`).
    #[arg(long = "cache-dir")]
    pub cache_dir: Option<PathBuf>,

    /// Fraction of entries zeroed by the sparse formats.
    #[arg(long = "sparsity-ratio")]
    pub sparsity_ratio: Option<f64>,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Core dataset handling failed.
    #[error(transparent)]
    Core(#[from] BenchdataError),
}

/// Shapes of the partitions produced by `generate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Dataset that was generated.
    pub dataset: DatasetName,
    /// Format the partitions were converted to.
    pub format: DataFormat,
    /// Training features.
    pub train_x: String,
    /// Training labels, if any.
    pub train_y: Option<String>,
    /// Test features, if a split was requested.
    pub test_x: Option<String>,
    /// Test labels, if a split was requested and the dataset is labelled.
    pub test_y: Option<String>,
}

/// One row of the `list` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetListing {
    /// Registered name.
    pub name: &'static str,
    /// Whether generating it downloads data into the cache directory.
    pub external: bool,
}

impl From<DatasetName> for DatasetListing {
    fn from(name: DatasetName) -> Self {
        Self {
            name: name.as_str(),
            external: name.is_external(),
        }
    }
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionSummary {
    /// Registered names.
    Listing {
        /// Dataset names in registry order, flagged when downloaded rather
        /// than synthesised.
        datasets: Vec<DatasetListing>,
        /// Format names in registry order.
        formats: Vec<&'static str>,
    },
    /// Path of a fetched, decompressed file.
    Fetched(PathBuf),
    /// Result of a `generate` run.
    Generated(GenerationSummary),
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when the command fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use benchdata_cli::cli::{Cli, Command, ExecutionSummary, LoggingArgs, run_cli};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = run_cli(Cli {
///     logging: LoggingArgs::default(),
///     command: Command::List,
/// })?;
/// assert!(matches!(
///     summary,
///     ExecutionSummary::Listing { ref datasets, .. }
///         if datasets.iter().any(|dataset| dataset.name == "blobs")
/// ));
/// # Ok(())
/// # }
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    match cli.command {
        Command::List => {
            span.record("command", field::display("list"));
            Ok(list())
        }
        Command::Fetch(fetch) => {
            span.record("command", field::display("fetch"));
            run_fetch(fetch)
        }
        Command::Generate(generate) => {
            span.record("command", field::display("generate"));
            run_generate(generate)
        }
    }
}

pub(super) fn list() -> ExecutionSummary {
    ExecutionSummary::Listing {
        datasets: DatasetName::ALL.into_iter().map(DatasetListing::from).collect(),
        formats: DataFormat::ALL.into_iter().map(DataFormat::as_str).collect(),
    }
}

#[instrument(name = "cli.fetch", err, skip(command), fields(url = %command.url))]
pub(super) fn run_fetch(command: FetchCommand) -> Result<ExecutionSummary, CliError> {
    let config = configure(command.cache_dir, None);
    let fetcher = Fetcher::new(config.cache_dir());
    let path = fetcher.fetch_and_cache(&command.url)?;
    info!(path = %path.display(), "fetch completed");
    Ok(ExecutionSummary::Fetched(path))
}

#[instrument(
    name = "cli.generate",
    err,
    skip(command),
    fields(dataset = %command.dataset, format = %command.format),
)]
pub(super) fn run_generate(command: GenerateCommand) -> Result<ExecutionSummary, CliError> {
    let config = configure(command.cache_dir, command.sparsity_ratio);
    let generator = DataGenerator::new(config)?;
    let request = GenDataRequest::parse(&command.dataset, &command.format)?
        .with_samples(command.samples)
        .with_features(command.features)
        .with_random_state(command.seed)
        .with_test_fraction(command.test_fraction)
        .with_params(GeneratorParams {
            centers: command.centers,
            n_classes: command.classes,
        });
    let split = generator.gen_data(&request)?;
    info!(
        train_rows = split.train_x.rows(),
        test_rows = split.test_x.as_ref().map_or(0, benchdata_core::Value::rows),
        "generate completed"
    );
    Ok(ExecutionSummary::Generated(GenerationSummary {
        dataset: request.dataset(),
        format: request.format(),
        train_x: split.train_x.to_string(),
        train_y: split.train_y.as_ref().map(ToString::to_string),
        test_x: split.test_x.as_ref().map(ToString::to_string),
        test_y: split.test_y.as_ref().map(ToString::to_string),
    }))
}

/// Layers CLI flags over the environment-derived defaults.
pub(super) fn configure(
    cache_dir: Option<PathBuf>,
    sparsity_ratio: Option<f64>,
) -> BenchdataConfig {
    let mut config = BenchdataConfig::new();
    if let Some(dir) = cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(ratio) = sparsity_ratio {
        config = config.with_sparsity_ratio(ratio);
    }
    config
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use std::path::PathBuf;
/// # use benchdata_cli::cli::{ExecutionSummary, render_summary};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary::Fetched(PathBuf::from("HIGGS.csv"));
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "fetched: HIGGS.csv\n");
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Listing { datasets, formats } => {
            let names: Vec<String> = datasets
                .iter()
                .map(|dataset| {
                    if dataset.external {
                        format!("{} (download)", dataset.name)
                    } else {
                        dataset.name.to_owned()
                    }
                })
                .collect();
            writeln!(writer, "datasets: {}", names.join(", "))?;
            writeln!(writer, "formats: {}", formats.join(", "))?;
        }
        ExecutionSummary::Fetched(path) => writeln!(writer, "fetched: {}", path.display())?,
        ExecutionSummary::Generated(generated) => {
            writeln!(writer, "dataset: {}", generated.dataset)?;
            writeln!(writer, "format: {}", generated.format)?;
            let partitions = [
                ("train_x", Some(&generated.train_x)),
                ("train_y", generated.train_y.as_ref()),
                ("test_x", generated.test_x.as_ref()),
                ("test_y", generated.test_y.as_ref()),
            ];
            for (label, value) in partitions {
                writeln!(
                    writer,
                    "{label}\t{}",
                    value.map_or("none", String::as_str)
                )?;
            }
        }
    }
    Ok(())
}
