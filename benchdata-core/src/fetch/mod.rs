//! Download-and-cache helper for remote dataset archives.
//!
//! Each URL maps to two files in the cache directory: the compressed
//! download, named after the URL's last path segment, and its decompressed
//! sibling with the final extension removed. Either file is produced at most
//! once; later calls reuse whatever is already on disk.

mod archive;

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, instrument};

use crate::error::{BenchdataError, Result};

pub(crate) use archive::Codec;

/// Transport used by [`Fetcher`] to retrieve remote files.
pub trait DownloadClient: Send + Sync {
    /// Streams the contents of `url` into `sink`, returning the byte count.
    ///
    /// # Errors
    /// Returns [`BenchdataError::Download`] if the request or the transfer
    /// fails.
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// [`DownloadClient`] backed by a blocking `ureq` agent.
///
/// A single attempt is made; failures are reported, not retried.
#[derive(Clone, Copy, Debug, Default)]
pub struct UreqDownloadClient;

impl DownloadClient for UreqDownloadClient {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let mut response = ureq::get(url)
            .call()
            .map_err(|error| download_error(url, &error))?;
        let mut body = response.body_mut().as_reader();
        io::copy(&mut body, sink).map_err(|error| download_error(url, &error))
    }
}

fn download_error(url: &str, error: &dyn std::error::Error) -> BenchdataError {
    BenchdataError::Download {
        url: url.to_owned(),
        message: error.to_string(),
    }
}

/// Downloads remote archives into a cache directory and decompresses them.
///
/// # Examples
/// ```no_run
/// use benchdata_core::Fetcher;
///
/// let fetcher = Fetcher::new("/var/cache/benchdata");
/// let csv = fetcher
///     .fetch_and_cache("https://archive.ics.uci.edu/ml/machine-learning-databases/00280/HIGGS.csv.gz")
///     .expect("download succeeds");
/// assert!(csv.ends_with("HIGGS.csv"));
/// ```
#[derive(Clone)]
pub struct Fetcher {
    cache_dir: PathBuf,
    client: Arc<dyn DownloadClient>,
}

impl Fetcher {
    /// Creates a fetcher that downloads with [`UreqDownloadClient`].
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_client(cache_dir, Arc::new(UreqDownloadClient))
    }

    /// Creates a fetcher using a caller-supplied transport.
    #[must_use]
    pub fn with_client(cache_dir: impl Into<PathBuf>, client: Arc<dyn DownloadClient>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            client,
        }
    }

    /// Directory holding downloads and their decompressed siblings.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Ensures the file behind `url` is downloaded and decompressed, returning
    /// the decompressed path.
    ///
    /// # Errors
    /// Returns [`BenchdataError::UnsupportedCompression`] before any download
    /// when the file extension has no decoder, and propagates transport,
    /// filesystem, and decoding failures unchanged.
    #[instrument(name = "fetch.fetch_and_cache", err, skip(self), fields(cache_dir = %self.cache_dir.display()))]
    pub fn fetch_and_cache(&self, url: &str) -> Result<PathBuf> {
        let compressed = self.cache_dir.join(file_name_from_url(url)?);
        Codec::from_path(&compressed)?;
        ensure_dir(&self.cache_dir)?;
        if compressed.exists() {
            debug!(path = %compressed.display(), "reusing cached download");
        } else {
            let bytes = write_atomic_with(&compressed, |sink| self.client.download(url, sink))?;
            info!(path = %compressed.display(), bytes, "downloaded");
        }
        self.decompress_cached(&compressed)
    }

    /// Decompresses an archive already present in the cache directory,
    /// unless its decompressed sibling exists.
    ///
    /// # Errors
    /// Returns [`BenchdataError::UnsupportedCompression`] for unknown
    /// extensions and [`BenchdataError::Decompress`] for corrupt archives.
    pub(crate) fn decompress_cached(&self, compressed: &Path) -> Result<PathBuf> {
        let codec = Codec::from_path(compressed)?;
        let target = compressed.with_extension("");
        if target.exists() {
            debug!(path = %target.display(), "reusing decompressed file");
            return Ok(target);
        }
        let bytes = write_atomic_with(&target, |sink| codec.decompress(compressed, sink))?;
        info!(path = %target.display(), bytes, "decompressed");
        Ok(target)
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| BenchdataError::io(dir, source))
}

/// Returns the temporary sibling used while `path` is being written.
pub(crate) fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Writes `path` through a `.part` sibling renamed into place on success.
///
/// A stale `.part` file left by an interrupted run is overwritten. On failure
/// the partial file is removed and `path` is left untouched.
pub(crate) fn write_atomic_with<T>(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<T>,
) -> Result<T> {
    let part = part_path(path);
    let file = File::create(&part).map_err(|source| BenchdataError::io(&part, source))?;
    let mut sink = BufWriter::new(file);
    let outcome = write(&mut sink).and_then(|value| {
        sink.flush()
            .map_err(|source| BenchdataError::io(&part, source))?;
        Ok(value)
    });
    drop(sink);
    match outcome {
        Ok(value) => {
            fs::rename(&part, path).map_err(|source| BenchdataError::io(path, source))?;
            Ok(value)
        }
        Err(error) => {
            if let Err(cleanup) = fs::remove_file(&part) {
                debug!(path = %part.display(), %cleanup, "failed to remove partial file");
            }
            Err(error)
        }
    }
}

fn file_name_from_url(url: &str) -> Result<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .ok_or_else(|| BenchdataError::InvalidParameter {
            parameter: "url",
            message: format!("`{url}` does not name a file"),
        })
}

#[cfg(test)]
mod tests;
