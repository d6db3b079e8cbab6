//! Logging initialisation for the benchdata CLI.
//!
//! Format and filter are resolved from command-line flags first, then from
//! `BENCHDATA_LOG_FORMAT` and `RUST_LOG`, then from built-in defaults. The
//! resolved [`LoggingSettings`] install a global `tracing` subscriber writing
//! to stderr, with the `log` facade bridged into it.

use std::{env, fmt, sync::OnceLock};

use clap::ValueEnum;
use thiserror::Error;
use tracing::debug;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::ParseError, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "BENCHDATA_LOG_FORMAT";

/// Environment variable holding the filter directives.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// Filter used when neither a flag nor `RUST_LOG` supplies one.
pub const DEFAULT_LOG_FILTER: &str = "info";

static INITIALISED: OnceLock<LoggingSettings> = OnceLock::new();

/// Errors raised while initialising structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Environment variable contained invalid UTF-8 data.
    #[error("environment variable `{name}` contained invalid UTF-8: {source}")]
    InvalidUnicode {
        /// Name of the offending environment variable.
        name: &'static str,
        /// Underlying parse failure.
        #[source]
        source: env::VarError,
    },
    /// Unsupported log format requested via `BENCHDATA_LOG_FORMAT`.
    #[error("unsupported log format `{provided}`; expected `human` or `json`")]
    UnsupportedFormat {
        /// Raw value supplied by the user.
        provided: String,
    },
    /// Filter directives could not be parsed.
    #[error("invalid log filter `{filter}`: {source}")]
    InvalidFilter {
        /// Directives as supplied.
        filter: String,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// Failed to install the global tracing subscriber.
    #[error("failed to install tracing subscriber: {source}")]
    InstallFailed {
        /// Error raised by `tracing_subscriber`.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
}

/// Output encoding of log events.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per event, with the active span list.
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self, LoggingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnsupportedFormat {
                provided: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Human => "human",
            Self::Json => "json",
        })
    }
}

/// Resolved logging configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoggingSettings {
    format: LogFormat,
    filter: String,
}

impl LoggingSettings {
    /// Resolves settings from flags, falling back to the process environment.
    ///
    /// # Errors
    /// Returns [`LoggingError`] when a consulted environment variable is not
    /// valid Unicode or names an unsupported format, or when the chosen
    /// filter does not parse.
    pub fn resolve(
        format_flag: Option<LogFormat>,
        filter_flag: Option<&str>,
    ) -> Result<Self, LoggingError> {
        Self::from_sources(
            format_flag,
            || env::var(LOG_FORMAT_ENV),
            filter_flag,
            || env::var(LOG_FILTER_ENV),
        )
    }

    /// Applies flag, then environment, then default precedence. Environment
    /// lookups run only when the matching flag is absent.
    pub(crate) fn from_sources(
        format_flag: Option<LogFormat>,
        format_env: impl FnOnce() -> Result<String, env::VarError>,
        filter_flag: Option<&str>,
        filter_env: impl FnOnce() -> Result<String, env::VarError>,
    ) -> Result<Self, LoggingError> {
        let format = format_flag.map_or_else(|| env_format(format_env()), Ok)?;
        let filter = filter_flag.map_or_else(
            || env_filter_or_default(filter_env()),
            |filter| Ok(filter.to_owned()),
        )?;
        build_filter(&filter)?;
        Ok(Self { format, filter })
    }

    /// Selected output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Selected filter directives.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

fn optional_env(
    name: &'static str,
    value: Result<String, env::VarError>,
) -> Result<Option<String>, LoggingError> {
    match value {
        Ok(raw) => Ok(Some(raw)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(source @ env::VarError::NotUnicode(_)) => {
            Err(LoggingError::InvalidUnicode { name, source })
        }
    }
}

fn env_format(value: Result<String, env::VarError>) -> Result<LogFormat, LoggingError> {
    optional_env(LOG_FORMAT_ENV, value)?
        .as_deref()
        .map_or(Ok(LogFormat::default()), LogFormat::parse)
}

fn env_filter_or_default(value: Result<String, env::VarError>) -> Result<String, LoggingError> {
    Ok(optional_env(LOG_FILTER_ENV, value)?
        .filter(|raw| !raw.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned()))
}

fn build_filter(filter: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(filter).map_err(|source| LoggingError::InvalidFilter {
        filter: filter.to_owned(),
        source,
    })
}

/// Installs global structured logging once per process.
///
/// Later calls are no-ops, whatever settings they carry. Events go to
/// `stderr` so command summaries on `stdout` remain parseable.
///
/// # Errors
/// Returns [`LoggingError::InvalidFilter`] if the filter no longer parses.
/// A subscriber installed by someone else is reported on stderr and
/// otherwise left in place.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), LoggingError> {
    if INITIALISED.get().is_some() {
        return Ok(());
    }
    match install_subscriber(settings) {
        Ok(()) => {}
        Err(LoggingError::InstallFailed { source }) => report_existing_subscriber(&source),
        Err(err) => return Err(err),
    }
    INITIALISED.get_or_init(|| settings.clone());
    Ok(())
}

#[expect(
    clippy::print_stderr,
    reason = "the global subscriber belongs to someone else, so tracing may be silent"
)]
fn report_existing_subscriber(source: &tracing_subscriber::util::TryInitError) {
    eprintln!("structured logging already configured elsewhere: {source}");
}

fn install_subscriber(settings: &LoggingSettings) -> Result<(), LoggingError> {
    let env_filter = build_filter(&settings.filter)?;
    let events = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let layer = match settings.format {
        LogFormat::Json => events
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Human => events.boxed(),
    };

    // Another logger may already own the `log` slot; keep it if so.
    let bridged = LogTracer::init().is_ok();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(|source| LoggingError::InstallFailed { source })?;
    debug!(
        format = %settings.format,
        filter = %settings.filter,
        log_bridge = bridged,
        "logging initialised"
    );
    Ok(())
}
