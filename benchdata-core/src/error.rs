//! Error types for the benchdata core library.
//!
//! Defines the error enum exposed by the public API, its stable error codes,
//! and a convenient result alias.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Broad failure category, used by callers that only need to know whether a
/// request was malformed or the environment failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// An unknown dataset or format name.
    Lookup,
    /// A request exceeded the rows or features a cached dataset holds.
    Capacity,
    /// A converter received a value kind it cannot handle.
    Type,
    /// Network, filesystem, decoding, or external tool failure.
    Io,
    /// A request parameter or intermediate shape was invalid.
    Validation,
}

/// Error type produced by dataset generation, caching, and conversion.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BenchdataError {
    /// No generator is registered under the requested dataset name.
    #[error("unknown dataset `{name}`")]
    UnknownDataset {
        /// Name supplied by the caller.
        name: String,
    },
    /// No converter is registered under the requested format name.
    #[error("unknown dataset format `{name}`")]
    UnknownFormat {
        /// Name supplied by the caller.
        name: String,
    },
    /// More rows were requested than the cached dataset holds.
    #[error("{dataset} dataset has only {available} rows, cannot support {requested}")]
    InsufficientRows {
        /// Dataset whose snapshot was too small.
        dataset: String,
        /// Rows held by the snapshot.
        available: usize,
        /// Rows requested by the caller.
        requested: usize,
    },
    /// More features were requested than the cached dataset holds.
    #[error("{dataset} dataset has only {available} features, cannot support {requested}")]
    InsufficientFeatures {
        /// Dataset whose snapshot was too narrow.
        dataset: String,
        /// Columns held by the snapshot.
        available: usize,
        /// Columns requested by the caller.
        requested: usize,
    },
    /// A converter was handed a value kind it does not accept.
    #[error("format `{format}` does not support input of type {kind}")]
    UnsupportedInput {
        /// Format whose converter rejected the value.
        format: &'static str,
        /// Kind of the offending value.
        kind: &'static str,
    },
    /// Reading or writing a local file failed.
    #[error("I/O failure at `{path}`: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// A download failed.
    #[error("download failed for `{url}`: {message}")]
    Download {
        /// URL that failed.
        url: String,
        /// Human-readable failure message.
        message: String,
    },
    /// A compressed file could not be decoded.
    #[error("failed to decompress `{path}`: {message}")]
    Decompress {
        /// Compressed file that failed to decode.
        path: PathBuf,
        /// Human-readable failure message.
        message: String,
    },
    /// The compressed file extension has no matching decoder.
    #[error("no decoder for compressed file `{path}`")]
    UnsupportedCompression {
        /// File whose extension was not recognised.
        path: PathBuf,
    },
    /// A raw dataset file was malformed.
    #[error("failed to parse `{path}` at line {line}: {message}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// One-based line number of the failure.
        line: usize,
        /// Human-readable failure message.
        message: String,
    },
    /// A cached snapshot could not be encoded or decoded.
    #[error("snapshot `{path}` is unusable: {message}")]
    Snapshot {
        /// Snapshot path.
        path: PathBuf,
        /// Human-readable failure message.
        message: String,
    },
    /// An external command used to fetch a dataset failed.
    #[error("external command `{command}` failed: {message}")]
    ExternalCommand {
        /// Command line that was executed.
        command: String,
        /// Exit status or spawn failure.
        message: String,
    },
    /// Labels did not align with feature rows, or a buffer had the wrong size.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },
    /// A request parameter was outside its valid range.
    #[error("invalid parameter `{parameter}`: {message}")]
    InvalidParameter {
        /// Parameter name.
        parameter: &'static str,
        /// Why the value was rejected.
        message: String,
    },
    /// The requested train partition does not fit the generated rows.
    #[error("train size {train_size} exceeds the {available} generated rows")]
    Split {
        /// Requested train rows.
        train_size: usize,
        /// Rows produced by the generator.
        available: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`BenchdataError`] variants.
    enum BenchdataErrorCode for BenchdataError {
        /// No generator is registered under the requested dataset name.
        UnknownDataset => UnknownDataset { .. } => "BENCHDATA_UNKNOWN_DATASET",
        /// No converter is registered under the requested format name.
        UnknownFormat => UnknownFormat { .. } => "BENCHDATA_UNKNOWN_FORMAT",
        /// More rows were requested than the cached dataset holds.
        InsufficientRows => InsufficientRows { .. } => "BENCHDATA_INSUFFICIENT_ROWS",
        /// More features were requested than the cached dataset holds.
        InsufficientFeatures => InsufficientFeatures { .. } => "BENCHDATA_INSUFFICIENT_FEATURES",
        /// A converter was handed a value kind it does not accept.
        UnsupportedInput => UnsupportedInput { .. } => "BENCHDATA_UNSUPPORTED_INPUT",
        /// Reading or writing a local file failed.
        Io => Io { .. } => "BENCHDATA_IO",
        /// A download failed.
        Download => Download { .. } => "BENCHDATA_DOWNLOAD",
        /// A compressed file could not be decoded.
        Decompress => Decompress { .. } => "BENCHDATA_DECOMPRESS",
        /// The compressed file extension has no matching decoder.
        UnsupportedCompression => UnsupportedCompression { .. } => "BENCHDATA_UNSUPPORTED_COMPRESSION",
        /// A raw dataset file was malformed.
        Parse => Parse { .. } => "BENCHDATA_PARSE",
        /// A cached snapshot could not be encoded or decoded.
        Snapshot => Snapshot { .. } => "BENCHDATA_SNAPSHOT",
        /// An external command used to fetch a dataset failed.
        ExternalCommand => ExternalCommand { .. } => "BENCHDATA_EXTERNAL_COMMAND",
        /// Labels did not align with feature rows.
        ShapeMismatch => ShapeMismatch { .. } => "BENCHDATA_SHAPE_MISMATCH",
        /// A request parameter was outside its valid range.
        InvalidParameter => InvalidParameter { .. } => "BENCHDATA_INVALID_PARAMETER",
        /// The requested train partition does not fit the generated rows.
        Split => Split { .. } => "BENCHDATA_SPLIT",
    }
}

impl BenchdataError {
    /// Returns the broad category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownDataset { .. } | Self::UnknownFormat { .. } => ErrorCategory::Lookup,
            Self::InsufficientRows { .. } | Self::InsufficientFeatures { .. } => {
                ErrorCategory::Capacity
            }
            Self::UnsupportedInput { .. } => ErrorCategory::Type,
            Self::Io { .. }
            | Self::Download { .. }
            | Self::Decompress { .. }
            | Self::UnsupportedCompression { .. }
            | Self::Parse { .. }
            | Self::Snapshot { .. }
            | Self::ExternalCommand { .. } => ErrorCategory::Io,
            Self::ShapeMismatch { .. } | Self::InvalidParameter { .. } | Self::Split { .. } => {
                ErrorCategory::Validation
            }
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, BenchdataError>;
