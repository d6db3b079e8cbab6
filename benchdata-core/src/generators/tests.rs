//! Unit tests for the generator registry and the built-in generators.

use super::*;
use crate::fetch::DownloadClient;
use crate::test_utils::{ZIP_DEFLATED, bzip2, gzip, zip_entry};
use rstest::{fixture, rstest};
use std::{
    collections::HashMap,
    fs,
    io::Write,
    sync::atomic::{AtomicUsize, Ordering},
};
use tempfile::TempDir;

struct StaticClient {
    payloads: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

impl StaticClient {
    /// Serves each text gzipped.
    fn new(payloads: Vec<(&str, &str)>) -> Self {
        Self::encoded(
            payloads
                .into_iter()
                .map(|(url, text)| (url, gzip(text.as_bytes())))
                .collect(),
        )
    }

    /// Serves each payload exactly as given.
    fn encoded(payloads: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            payloads: payloads
                .into_iter()
                .map(|(url, bytes)| (url.to_owned(), bytes))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl DownloadClient for StaticClient {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let payload = self
            .payloads
            .get(url)
            .ok_or_else(|| BenchdataError::Download {
                url: url.to_owned(),
                message: "no fixture".to_owned(),
            })?;
        sink.write_all(payload)
            .map_err(|source| BenchdataError::io(url, source))?;
        Ok(payload.len() as u64)
    }
}

fn test_sources() -> DatasetSources {
    DatasetSources {
        covtype: "https://fixtures.test/covtype.data.gz".to_owned(),
        epsilon_train: "https://fixtures.test/epsilon_normalized.gz".to_owned(),
        epsilon_test: "https://fixtures.test/epsilon_normalized.t.gz".to_owned(),
        year: "https://fixtures.test/YearPredictionMSD.txt.zip".to_owned(),
        higgs: "https://fixtures.test/HIGGS.csv.gz".to_owned(),
        ..DatasetSources::default()
    }
}

fn context_with(dir: &TempDir, client: Arc<StaticClient>) -> DataContext {
    DataContext::new(
        Fetcher::with_client(dir.path(), client),
        SnapshotCache::new(dir.path()),
        test_sources(),
    )
}

#[fixture]
fn cache_dir() -> TempDir {
    TempDir::new().expect("create temporary cache dir")
}

fn request(n_samples: usize, n_features: usize, random_state: u64) -> GeneratorRequest {
    GeneratorRequest {
        n_samples,
        n_features,
        random_state,
        params: GeneratorParams::default(),
    }
}

#[rstest]
#[case::blobs(DatasetName::Blobs)]
#[case::classification(DatasetName::Classification)]
#[case::regression(DatasetName::Regression)]
fn synthetic_generators_are_deterministic(cache_dir: TempDir, #[case] name: DatasetName) {
    let registry = GeneratorRegistry::default();
    let context = DataContext::in_dir(cache_dir.path(), DatasetSources::default());
    let generator = registry.get(name).expect("built-in generator");

    let first = generator
        .generate(&request(50, 6, 7), &context)
        .expect("generate");
    let second = generator
        .generate(&request(50, 6, 7), &context)
        .expect("generate");
    let other_seed = generator
        .generate(&request(50, 6, 8), &context)
        .expect("generate");

    assert_eq!(first, second);
    assert_ne!(first.features(), other_seed.features());
    assert_eq!((first.rows(), first.columns()), (50, 6));
    assert_eq!(first.labels().map(|labels| labels.len()), Some(50));
}

#[rstest]
fn default_feature_count_applies_to_features(cache_dir: TempDir) {
    let context = DataContext::in_dir(cache_dir.path(), DatasetSources::default());
    let dataset = synthetic::blobs(&request(20, 0, 1), &context).expect("generate");
    assert_eq!((dataset.rows(), dataset.columns()), (20, 100));
}

#[rstest]
fn zeros_keeps_zero_sizes(cache_dir: TempDir) {
    let context = DataContext::in_dir(cache_dir.path(), DatasetSources::default());
    let empty = synthetic::zeros(&request(0, 0, 1), &context).expect("generate");
    assert_eq!((empty.rows(), empty.columns()), (0, 0));

    let filled = synthetic::zeros(&request(4, 3, 1), &context).expect("generate");
    assert!(filled.features().iter().all(|value| *value == 0.0));
    assert!(filled.labels().is_some_and(|labels| labels.iter().all(|value| *value == 0.0)));
}

#[rstest]
fn blob_labels_cover_requested_centers(cache_dir: TempDir) {
    let context = DataContext::in_dir(cache_dir.path(), DatasetSources::default());
    let mut blob_request = request(30, 2, 3);
    blob_request.params.centers = Some(5);
    let dataset = synthetic::blobs(&blob_request, &context).expect("generate");
    let labels = dataset.labels().expect("labelled");
    assert_eq!(labels.fold(0.0_f32, |acc, value| acc.max(*value)), 4.0);
}

#[rstest]
#[case::one_class(1, 10)]
#[case::too_many_for_one_feature(3, 1)]
fn classification_rejects_unplaceable_classes(
    cache_dir: TempDir,
    #[case] classes: usize,
    #[case] features: usize,
) {
    let context = DataContext::in_dir(cache_dir.path(), DatasetSources::default());
    let mut classification_request = request(10, features, 0);
    classification_request.params.n_classes = Some(classes);
    let err = synthetic::classification(&classification_request, &context)
        .expect_err("classes cannot be placed");
    assert!(matches!(
        err,
        BenchdataError::InvalidParameter {
            parameter: "n_classes",
            ..
        }
    ));
}

#[rstest]
fn multiclass_labels_use_every_class(cache_dir: TempDir) {
    let context = DataContext::in_dir(cache_dir.path(), DatasetSources::default());
    let mut classification_request = request(40, 5, 0);
    classification_request.params.n_classes = Some(4);
    let dataset =
        synthetic::classification(&classification_request, &context).expect("generate");
    let labels = dataset.labels().expect("labelled");
    for class in 0..4_u8 {
        assert!(labels.iter().any(|label| *label == f32::from(class)));
    }
}

#[rstest]
#[case::zeros_with_centers(DatasetName::Zeros, GeneratorParams { centers: Some(2), n_classes: None })]
#[case::blobs_with_classes(DatasetName::Blobs, GeneratorParams { centers: None, n_classes: Some(2) })]
#[case::higgs_with_centers(DatasetName::Higgs, GeneratorParams { centers: Some(2), n_classes: None })]
fn unexpected_parameters_are_rejected(
    cache_dir: TempDir,
    #[case] name: DatasetName,
    #[case] params: GeneratorParams,
) {
    let registry = GeneratorRegistry::default();
    let context = DataContext::in_dir(cache_dir.path(), DatasetSources::default());
    let mut bad_request = request(5, 2, 0);
    bad_request.params = params;
    let err = registry
        .get(name)
        .expect("built-in generator")
        .generate(&bad_request, &context)
        .expect_err("parameter is not accepted");
    assert!(matches!(err, BenchdataError::InvalidParameter { .. }));
}

#[rstest]
fn parses_dataset_names() {
    for name in DatasetName::ALL {
        assert_eq!(name.as_str().parse::<DatasetName>().expect("round trip"), name);
    }
    let err = "mnist".parse::<DatasetName>().expect_err("not registered");
    assert!(matches!(err, BenchdataError::UnknownDataset { name } if name == "mnist"));
}

#[rstest]
fn registry_overrides_replace_builtins(cache_dir: TempDir) {
    let replacement = |request: &GeneratorRequest, _: &DataContext| {
        Dataset::new(ndarray::Array2::ones((request.n_samples, 1)), None)
    };
    let registry = GeneratorRegistry::new().with_generator(DatasetName::Blobs, Arc::new(replacement));
    let context = DataContext::in_dir(cache_dir.path(), DatasetSources::default());
    let dataset = registry
        .get(DatasetName::Blobs)
        .expect("registered")
        .generate(&request(3, 0, 0), &context)
        .expect("generate");
    assert_eq!((dataset.rows(), dataset.columns()), (3, 1));
    assert_eq!(registry.all_datasets(), DatasetName::ALL.to_vec());
}

#[rstest]
fn higgs_reads_label_first_and_snapshots(cache_dir: TempDir) {
    let client = Arc::new(StaticClient::new(vec![(
        "https://fixtures.test/HIGGS.csv.gz",
        "1.0,0.1,0.2\n0.0,0.3,0.4\n1.0,0.5,0.6\n",
    )]));
    let context = context_with(&cache_dir, Arc::clone(&client));

    let dataset = external::higgs(&request(2, 0, 0), &context).expect("load higgs");

    assert_eq!(dataset.features(), &ndarray::array![[0.1, 0.2], [0.3, 0.4]]);
    assert_eq!(dataset.labels(), Some(&ndarray::array![1.0, 0.0]));
    assert!(cache_dir.path().join("higgs-2-samples.parquet").exists());

    let again = external::higgs(&request(2, 1, 0), &context).expect("reload higgs");
    assert_eq!(again.features(), &ndarray::array![[0.1], [0.3]]);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn covtype_reads_label_last(cache_dir: TempDir) {
    let client = Arc::new(StaticClient::new(vec![(
        "https://fixtures.test/covtype.data.gz",
        "10,20,3\n30,40,7\n",
    )]));
    let context = context_with(&cache_dir, client);

    let dataset = external::covtype(&request(0, 0, 0), &context).expect("load covtype");

    assert_eq!(dataset.features(), &ndarray::array![[10.0, 20.0], [30.0, 40.0]]);
    assert_eq!(dataset.labels(), Some(&ndarray::array![3.0, 7.0]));
}

#[rstest]
fn epsilon_appends_test_rows_and_binarises_labels(cache_dir: TempDir) {
    let client = Arc::new(StaticClient::new(vec![
        ("https://fixtures.test/epsilon_normalized.gz", "1 1:0.5\n-1 2:0.25\n"),
        ("https://fixtures.test/epsilon_normalized.t.gz", "-1 3:1.0\n1 1:2.0\n"),
    ]));
    let context = context_with(&cache_dir, Arc::clone(&client));

    let dataset = external::epsilon(&request(3, 0, 0), &context).expect("load epsilon");

    assert_eq!((dataset.rows(), dataset.columns()), (3, 3));
    assert_eq!(dataset.labels(), Some(&ndarray::array![1.0, 0.0, 0.0]));
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}

#[rstest]
fn epsilon_skips_test_file_when_train_suffices(cache_dir: TempDir) {
    let client = Arc::new(StaticClient::new(vec![(
        "https://fixtures.test/epsilon_normalized.gz",
        "1 1:0.5\n-1 2:0.25\n",
    )]));
    let context = context_with(&cache_dir, Arc::clone(&client));

    let dataset = external::epsilon(&request(1, 0, 0), &context).expect("load epsilon");

    assert_eq!(dataset.rows(), 1);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn bosch_uses_existing_csv_without_kaggle(cache_dir: TempDir) {
    fs::write(
        cache_dir.path().join("train_numeric.csv"),
        "Id,L0_S0_F0,L0_S0_F2,Response\n4,0.03,,0\n6,,0.1,1\n",
    )
    .expect("seed bosch csv");
    let context = context_with(&cache_dir, Arc::new(StaticClient::new(Vec::new())));

    let dataset = external::bosch(&request(0, 0, 0), &context).expect("load bosch");

    assert_eq!((dataset.rows(), dataset.columns()), (2, 2));
    assert_eq!(dataset.labels(), Some(&ndarray::array![0.0, 1.0]));
}

#[rstest]
fn epsilon_loads_bzip2_from_default_sources(cache_dir: TempDir) {
    let sources = DatasetSources::default();
    let client = Arc::new(StaticClient::encoded(vec![
        (sources.epsilon_train.as_str(), bzip2(b"1 1:0.5 2:0.5\n-1 2:0.25\n")),
        (sources.epsilon_test.as_str(), bzip2(b"1 1:2.0\n")),
    ]));
    let context = DataContext::new(
        Fetcher::with_client(cache_dir.path(), Arc::<StaticClient>::clone(&client)),
        SnapshotCache::new(cache_dir.path()),
        sources.clone(),
    );

    let dataset = GeneratorRegistry::default()
        .get(DatasetName::Epsilon)
        .expect("built-in generator")
        .generate(&request(0, 0, 0), &context)
        .expect("load epsilon");

    assert_eq!((dataset.rows(), dataset.columns()), (3, 2));
    assert_eq!(dataset.labels(), Some(&ndarray::array![1.0, 0.0, 1.0]));
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
}

fn year_archive(csv: &str) -> Vec<u8> {
    zip_entry("YearPredictionMSD.txt", csv.as_bytes(), ZIP_DEFLATED)
}

#[rstest]
fn year_reads_zipped_label_first_csv_and_snapshots(cache_dir: TempDir) {
    let client = Arc::new(StaticClient::encoded(vec![(
        "https://fixtures.test/YearPredictionMSD.txt.zip",
        year_archive("2001,0.5,1.5\n1999,2.5,3.5\n2010,4.5,5.5\n"),
    )]));
    let context = context_with(&cache_dir, Arc::clone(&client));

    let dataset = GeneratorRegistry::default()
        .get(DatasetName::Year)
        .expect("built-in generator")
        .generate(&request(2, 0, 0), &context)
        .expect("load year");

    assert_eq!(dataset.features(), &ndarray::array![[0.5, 1.5], [2.5, 3.5]]);
    assert_eq!(dataset.labels(), Some(&ndarray::array![2001.0, 1999.0]));
    assert!(cache_dir.path().join("YearPredictionMSD.txt").exists());
    assert!(cache_dir.path().join("year-2-samples.parquet").exists());

    let cropped = external::year(&request(2, 1, 0), &context).expect("reload year");
    assert_eq!(cropped.features(), &ndarray::array![[0.5], [2.5]]);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn external_capacity_errors_name_the_dataset(cache_dir: TempDir) {
    let client = Arc::new(StaticClient::encoded(vec![(
        "https://fixtures.test/YearPredictionMSD.txt.zip",
        year_archive("2001,1,2\n"),
    )]));
    let context = context_with(&cache_dir, client);

    let err = external::year(&request(0, 5, 0), &context).expect_err("only two features");

    assert_eq!(
        err.to_string(),
        "year dataset has only 2 features, cannot support 5"
    );
}
