//! Configuration surface for [`crate::DataGenerator`].
//!
//! Values are validated when the generator is constructed, so a builder can be
//! assembled from untrusted input (CLI flags, environment) without failing
//! midway.

use std::{
    env,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use crate::{
    error::{BenchdataError, Result},
    generators::DatasetSources,
};

/// Environment variable naming the default cache directory.
pub const CACHE_DIR_ENV: &str = "BENCHDATA_CACHE_DIR";

/// Number of `gen_data` results kept by the memo cache by default.
pub const DEFAULT_MEMO_CAPACITY: usize = 8;

/// Fraction of entries zeroed by the sparse formats by default.
pub const DEFAULT_SPARSITY_RATIO: f64 = 0.3;

/// Configures cache locations, memoisation, and conversion for a
/// [`crate::DataGenerator`].
///
/// # Examples
/// ```
/// use benchdata_core::BenchdataConfig;
///
/// let config = BenchdataConfig::new()
///     .with_cache_dir("/tmp/benchdata")
///     .with_memo_capacity(4);
/// assert_eq!(config.memo_capacity(), 4);
/// assert_eq!(config.cache_dir().to_str(), Some("/tmp/benchdata"));
/// ```
#[derive(Clone, Debug)]
pub struct BenchdataConfig {
    cache_dir: PathBuf,
    memo_capacity: usize,
    sparsity_ratio: f64,
    sources: DatasetSources,
}

impl Default for BenchdataConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            memo_capacity: DEFAULT_MEMO_CAPACITY,
            sparsity_ratio: DEFAULT_SPARSITY_RATIO,
            sources: DatasetSources::default(),
        }
    }
}

impl BenchdataConfig {
    /// Creates a configuration populated with defaults.
    ///
    /// The cache directory is taken from `BENCHDATA_CACHE_DIR` when set and
    /// falls back to the current directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the directory holding downloads and snapshots.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Directory holding downloads and snapshots.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Overrides how many `gen_data` results are memoised.
    #[must_use]
    pub const fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity;
        self
    }

    /// Number of memoised `gen_data` results.
    #[must_use]
    pub const fn memo_capacity(&self) -> usize {
        self.memo_capacity
    }

    /// Overrides the fraction of entries zeroed by the sparse formats.
    #[must_use]
    pub const fn with_sparsity_ratio(mut self, ratio: f64) -> Self {
        self.sparsity_ratio = ratio;
        self
    }

    /// Fraction of entries zeroed by the sparse formats.
    #[must_use]
    pub const fn sparsity_ratio(&self) -> f64 {
        self.sparsity_ratio
    }

    /// Replaces the download locations of the external datasets.
    #[must_use]
    pub fn with_sources(mut self, sources: DatasetSources) -> Self {
        self.sources = sources;
        self
    }

    /// Download locations of the external datasets.
    #[must_use]
    pub const fn sources(&self) -> &DatasetSources {
        &self.sources
    }

    pub(crate) fn into_sources(self) -> DatasetSources {
        self.sources
    }

    /// Checks every value, returning the memo capacity in its validated form.
    ///
    /// # Errors
    /// Returns [`BenchdataError::InvalidParameter`] when the memo capacity is
    /// zero or the sparsity ratio is not a finite value in `[0, 1]`.
    pub fn validate(&self) -> Result<NonZeroUsize> {
        validate_sparsity_ratio(self.sparsity_ratio)?;
        NonZeroUsize::new(self.memo_capacity).ok_or_else(|| BenchdataError::InvalidParameter {
            parameter: "memo_capacity",
            message: "must be greater than zero".to_owned(),
        })
    }
}

pub(crate) fn validate_sparsity_ratio(ratio: f64) -> Result<()> {
    if ratio.is_finite() && (0.0..=1.0).contains(&ratio) {
        return Ok(());
    }
    Err(BenchdataError::InvalidParameter {
        parameter: "sparsity_ratio",
        message: format!("{ratio} is not within [0, 1]"),
    })
}

fn default_cache_dir() -> PathBuf {
    env::var_os(CACHE_DIR_ENV).map_or_else(|| PathBuf::from("."), PathBuf::from)
}
