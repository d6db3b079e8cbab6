//! On-disk snapshots of parsed external datasets.
//!
//! Parsing the raw CSV or SVMlight files is slow, so the first load of a
//! dataset at a given row budget is written to a Parquet snapshot and every
//! later load decodes that instead. Requests are then cropped to the leading
//! rows and columns.

mod codec;

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::{
    dataset::Dataset,
    error::{BenchdataError, Result},
    fetch::{ensure_dir, write_atomic_with},
};

/// Directory of Parquet snapshots keyed by dataset name and row budget.
///
/// # Examples
/// ```
/// use benchdata_core::{Dataset, SnapshotCache};
/// use ndarray::Array2;
///
/// let dir = tempfile::tempdir().expect("temporary directory");
/// let cache = SnapshotCache::new(dir.path());
/// let dataset = cache
///     .load_or_build("demo", 0, 2, |_| Dataset::new(Array2::ones((3, 4)), None))
///     .expect("loader succeeds");
/// assert_eq!((dataset.rows(), dataset.columns()), (3, 2));
/// assert!(cache.path_for("demo", 0).exists());
/// ```
#[derive(Clone, Debug)]
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    /// Creates a cache rooted at `dir`. The directory is created on first
    /// write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshots.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot path for `name` loaded with a row budget of `n_samples`.
    #[must_use]
    pub fn path_for(&self, name: &str, n_samples: usize) -> PathBuf {
        self.dir.join(format!("{name}-{n_samples}-samples.parquet"))
    }

    /// Loads the snapshot for `name` at `n_samples`, building it with
    /// `raw_loader` on a miss, and crops it to the requested shape.
    ///
    /// `raw_loader` receives `n_samples` as a row hint; zero means "all
    /// rows". Zero `n_samples` or `n_features` resolve to the loaded shape.
    ///
    /// # Errors
    /// Returns [`BenchdataError::InsufficientFeatures`] or
    /// [`BenchdataError::InsufficientRows`] when the loaded dataset is
    /// smaller than requested, [`BenchdataError::Snapshot`] when an existing
    /// snapshot cannot be decoded, and any error raised by `raw_loader`.
    #[instrument(name = "snapshot.load_or_build", err, skip(self, raw_loader))]
    pub fn load_or_build<F>(
        &self,
        name: &str,
        n_samples: usize,
        n_features: usize,
        raw_loader: F,
    ) -> Result<Dataset>
    where
        F: FnOnce(usize) -> Result<Dataset>,
    {
        let path = self.path_for(name, n_samples);
        let dataset = if path.exists() {
            debug!(path = %path.display(), "decoding snapshot");
            codec::decode(&path)?
        } else {
            let loaded = raw_loader(n_samples)?;
            self.store(&path, &loaded)?;
            loaded
        };
        crop(name, dataset, n_samples, n_features)
    }

    fn store(&self, path: &Path, dataset: &Dataset) -> Result<()> {
        ensure_dir(&self.dir)?;
        write_atomic_with(path, |sink| codec::encode(dataset, path, sink))?;
        info!(
            path = %path.display(),
            rows = dataset.rows(),
            columns = dataset.columns(),
            "stored snapshot"
        );
        Ok(())
    }
}

fn crop(name: &str, dataset: Dataset, n_samples: usize, n_features: usize) -> Result<Dataset> {
    let rows = if n_samples == 0 {
        dataset.rows()
    } else {
        n_samples
    };
    let columns = if n_features == 0 {
        dataset.columns()
    } else {
        n_features
    };
    if columns > dataset.columns() {
        return Err(BenchdataError::InsufficientFeatures {
            dataset: name.to_owned(),
            available: dataset.columns(),
            requested: columns,
        });
    }
    if rows > dataset.rows() {
        return Err(BenchdataError::InsufficientRows {
            dataset: name.to_owned(),
            available: dataset.rows(),
            requested: rows,
        });
    }
    if rows == dataset.rows() && columns == dataset.columns() {
        return Ok(dataset);
    }
    Ok(dataset.crop(rows, columns))
}
