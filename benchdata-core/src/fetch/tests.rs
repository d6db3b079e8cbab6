//! Unit tests for the download cache and archive decoders.

use super::*;
use crate::test_utils::{ZIP_DEFLATED, ZIP_STORED, bzip2, gzip, zip_entry};
use rstest::{fixture, rstest};
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use tempfile::TempDir;

const HIGGS_URL: &str = "https://example.test/data/HIGGS.csv.gz";
const YEAR_URL: &str = "https://example.test/data/YearPredictionMSD.txt.zip";
const EPSILON_URL: &str = "https://example.test/data/epsilon_normalized.bz2";

struct FakeClient {
    payloads: HashMap<String, Vec<u8>>,
    call_count: AtomicUsize,
}

impl FakeClient {
    fn new(payloads: impl IntoIterator<Item = (&'static str, Vec<u8>)>) -> Self {
        Self {
            payloads: payloads
                .into_iter()
                .map(|(url, bytes)| (url.to_owned(), bytes))
                .collect(),
            call_count: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl DownloadClient for FakeClient {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let payload = self
            .payloads
            .get(url)
            .ok_or_else(|| BenchdataError::Download {
                url: url.to_owned(),
                message: "missing fake payload".to_owned(),
            })?;
        sink.write_all(payload)
            .map_err(|source| BenchdataError::io("fake", source))?;
        Ok(payload.len() as u64)
    }
}

#[fixture]
fn cache_dir() -> TempDir {
    TempDir::new().expect("create temporary cache dir")
}

#[rstest]
fn downloads_and_decompresses_once(cache_dir: TempDir) {
    let client = Arc::new(FakeClient::new([(HIGGS_URL, gzip(b"1,2,3\n"))]));
    let fetcher = Fetcher::with_client(cache_dir.path(), client.clone());

    let first = fetcher.fetch_and_cache(HIGGS_URL).expect("first fetch");
    let second = fetcher.fetch_and_cache(HIGGS_URL).expect("second fetch");

    assert_eq!(first, cache_dir.path().join("HIGGS.csv"));
    assert_eq!(first, second);
    assert_eq!(client.calls(), 1);
    assert_eq!(fs::read(&first).expect("read decompressed"), b"1,2,3\n");
    assert!(!part_path(&first).exists());
}

#[rstest]
fn existing_decompressed_file_is_not_rewritten(cache_dir: TempDir) {
    let client = Arc::new(FakeClient::new([(HIGGS_URL, gzip(b"fresh\n"))]));
    let fetcher = Fetcher::with_client(cache_dir.path(), client.clone());
    fs::write(cache_dir.path().join("HIGGS.csv.gz"), gzip(b"fresh\n")).expect("seed archive");
    fs::write(cache_dir.path().join("HIGGS.csv"), b"stale\n").expect("seed csv");

    let path = fetcher.fetch_and_cache(HIGGS_URL).expect("cached fetch");

    assert_eq!(client.calls(), 0);
    assert_eq!(fs::read(path).expect("read csv"), b"stale\n");
}

#[rstest]
#[case::deflated(ZIP_DEFLATED)]
#[case::stored(ZIP_STORED)]
fn zip_yields_first_entry(cache_dir: TempDir, #[case] method: u16) {
    let archive = zip_entry("YearPredictionMSD.txt", b"2001,0.5\n", method);
    let client = Arc::new(FakeClient::new([(YEAR_URL, archive)]));
    let fetcher = Fetcher::with_client(cache_dir.path(), client);

    let path = fetcher.fetch_and_cache(YEAR_URL).expect("zip fetch");

    assert_eq!(path, cache_dir.path().join("YearPredictionMSD.txt"));
    assert_eq!(fs::read(path).expect("read entry"), b"2001,0.5\n");
}

#[rstest]
fn stored_zip_entry_with_data_descriptor_is_rejected(cache_dir: TempDir) {
    let mut archive = zip_entry("YearPredictionMSD.txt", b"2001,0.5\n", ZIP_STORED);
    *archive.get_mut(6).expect("flag byte") = 1 << 3;
    let client = Arc::new(FakeClient::new([(YEAR_URL, archive)]));
    let fetcher = Fetcher::with_client(cache_dir.path(), client);

    let err = fetcher.fetch_and_cache(YEAR_URL).expect_err("size lives in the descriptor");

    assert!(matches!(err, BenchdataError::Decompress { .. }));
    assert!(!cache_dir.path().join("YearPredictionMSD.txt").exists());
}

#[rstest]
fn bzip2_is_decompressed_like_gzip(cache_dir: TempDir) {
    let client = Arc::new(FakeClient::new([(EPSILON_URL, bzip2(b"1 1:0.5\n"))]));
    let fetcher = Fetcher::with_client(cache_dir.path(), client.clone());

    let path = fetcher.fetch_and_cache(EPSILON_URL).expect("bz2 fetch");
    fetcher.fetch_and_cache(EPSILON_URL).expect("cached bz2 fetch");

    assert_eq!(path, cache_dir.path().join("epsilon_normalized"));
    assert_eq!(fs::read(path).expect("read decompressed"), b"1 1:0.5\n");
    assert_eq!(client.calls(), 1);
}

#[rstest]
fn unknown_extension_fails_before_download(cache_dir: TempDir) {
    let url = "https://example.test/epsilon_normalized.xz";
    let client = Arc::new(FakeClient::new([(url, vec![1, 2, 3])]));
    let fetcher = Fetcher::with_client(cache_dir.path(), client.clone());

    let err = fetcher.fetch_and_cache(url).expect_err("xz has no decoder");

    assert!(matches!(err, BenchdataError::UnsupportedCompression { .. }));
    assert_eq!(client.calls(), 0);
}

#[rstest]
fn failed_download_leaves_no_files(cache_dir: TempDir) {
    let client = Arc::new(FakeClient::new(Vec::new()));
    let fetcher = Fetcher::with_client(cache_dir.path(), client);

    let err = fetcher.fetch_and_cache(HIGGS_URL).expect_err("no payload");

    assert!(matches!(err, BenchdataError::Download { .. }));
    let leftovers = fs::read_dir(cache_dir.path()).expect("list cache").count();
    assert_eq!(leftovers, 0);
}

#[rstest]
fn corrupt_gzip_is_a_decompress_error(cache_dir: TempDir) {
    let client = Arc::new(FakeClient::new([(HIGGS_URL, b"not gzip".to_vec())]));
    let fetcher = Fetcher::with_client(cache_dir.path(), client);

    let err = fetcher.fetch_and_cache(HIGGS_URL).expect_err("corrupt archive");

    assert!(matches!(err, BenchdataError::Decompress { .. }));
    assert!(!cache_dir.path().join("HIGGS.csv").exists());
}

#[rstest]
fn creates_missing_cache_dir(cache_dir: TempDir) {
    let nested = cache_dir.path().join("nested").join("cache");
    let client = Arc::new(FakeClient::new([(HIGGS_URL, gzip(b"x\n"))]));
    let fetcher = Fetcher::with_client(&nested, client);

    let path = fetcher.fetch_and_cache(HIGGS_URL).expect("fetch into new dir");

    assert!(path.starts_with(&nested));
}

#[rstest]
#[case::plain("https://host/a/b/covtype.data.gz", Some("covtype.data.gz"))]
#[case::query("https://host/HIGGS.csv.gz?raw=1", Some("HIGGS.csv.gz"))]
#[case::trailing_slash("https://host/dir/", None)]
fn derives_file_name_from_url(#[case] url: &str, #[case] expected: Option<&str>) {
    assert_eq!(file_name_from_url(url).ok(), expected);
}
