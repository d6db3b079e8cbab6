//! Unit tests for request handling and memoisation.

use super::*;
use crate::{convert::Value, dataset::Dataset};
use ndarray::{Array1, Array2};
use rstest::{fixture, rstest};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

#[fixture]
fn cache_dir() -> TempDir {
    TempDir::new().expect("create temporary cache dir")
}

fn generator_in(dir: &TempDir, capacity: usize) -> DataGenerator {
    DataGenerator::new(
        BenchdataConfig::new()
            .with_cache_dir(dir.path())
            .with_memo_capacity(capacity),
    )
    .expect("valid configuration")
}

fn counting(calls: &Arc<AtomicUsize>) -> Arc<dyn Generator> {
    let counter = Arc::clone(calls);
    Arc::new(move |request: &GeneratorRequest, _: &DataContext| {
        counter.fetch_add(1, Ordering::SeqCst);
        Dataset::new(
            Array2::ones((request.n_samples, 2)),
            Some(Array1::ones(request.n_samples)),
        )
    })
}

fn zeros(n_samples: usize, n_features: usize) -> GenDataRequest {
    GenDataRequest::new(DatasetName::Zeros, DataFormat::Numpy)
        .with_samples(n_samples)
        .with_features(n_features)
}

#[rstest]
#[case::none(0, 0.5, 0)]
#[case::half(10, 0.5, 20)]
#[case::fifth(8, 0.2, 10)]
#[case::unsplit(7, 0.0, 7)]
fn inflates_rows_for_the_test_partition(
    #[case] n_samples: usize,
    #[case] fraction: f64,
    #[case] expected: usize,
) {
    assert_eq!(inflate_for_test(n_samples, fraction), expected);
}

#[rstest]
#[case::negative(-0.1)]
#[case::one(1.0)]
#[case::nan(f64::NAN)]
#[case::infinite(f64::INFINITY)]
fn rejects_out_of_range_test_fraction(cache_dir: TempDir, #[case] fraction: f64) {
    let generator = generator_in(&cache_dir, 2);
    let err = generator
        .gen_data(&zeros(4, 1).with_test_fraction(fraction))
        .expect_err("fraction must lie in [0, 1)");
    assert!(matches!(
        err,
        BenchdataError::InvalidParameter {
            parameter: "test_fraction",
            ..
        }
    ));
    assert_eq!(generator.memoised(), 0);
}

#[rstest]
fn identical_requests_share_one_result(cache_dir: TempDir) {
    let calls = Arc::new(AtomicUsize::new(0));
    let generator = generator_in(&cache_dir, 2).with_generator(DatasetName::Blobs, counting(&calls));
    let request = GenDataRequest::new(DatasetName::Blobs, DataFormat::Numpy).with_samples(3);

    let first = generator.gen_data(&request).expect("generate");
    let second = generator.gen_data(&request).expect("memo hit");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[rstest]
fn every_parameter_is_part_of_the_key(cache_dir: TempDir) {
    let calls = Arc::new(AtomicUsize::new(0));
    let generator =
        generator_in(&cache_dir, 16).with_generator(DatasetName::Blobs, counting(&calls));
    let base = GenDataRequest::new(DatasetName::Blobs, DataFormat::Numpy).with_samples(4);
    let variants = [
        base,
        base.with_samples(5),
        base.with_features(3),
        base.with_random_state(1),
        base.with_test_fraction(0.25),
        base.with_params(GeneratorParams {
            centers: Some(2),
            n_classes: None,
        }),
        GenDataRequest::new(DatasetName::Blobs, DataFormat::Pandas).with_samples(4),
    ];
    for request in &variants {
        generator.gen_data(request).expect("generate");
    }
    assert_eq!(calls.load(Ordering::SeqCst), variants.len());
    assert_eq!(generator.memoised(), variants.len());
}

#[rstest]
fn least_recent_result_is_evicted(cache_dir: TempDir) {
    let calls = Arc::new(AtomicUsize::new(0));
    let generator = generator_in(&cache_dir, 1).with_generator(DatasetName::Blobs, counting(&calls));
    let small = GenDataRequest::new(DatasetName::Blobs, DataFormat::Numpy).with_samples(1);
    let large = small.with_samples(2);

    generator.gen_data(&small).expect("generate");
    generator.gen_data(&large).expect("generate");
    generator.gen_data(&small).expect("regenerate after eviction");

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(generator.memoised(), 1);
}

#[rstest]
fn zero_samples_resolve_from_generated_rows(cache_dir: TempDir) {
    let fixed = |_: &GeneratorRequest, _: &DataContext| {
        Dataset::new(Array2::zeros((10, 1)), Some(Array1::zeros(10)))
    };
    let generator = generator_in(&cache_dir, 2).with_generator(DatasetName::Higgs, Arc::new(fixed));
    let request = GenDataRequest::new(DatasetName::Higgs, DataFormat::Numpy).with_test_fraction(0.3);

    let split = generator.gen_data(&request).expect("generate");

    assert_eq!(split.train_x.rows(), 7);
    assert_eq!(split.test_x.as_ref().map(Value::rows), Some(3));
}

#[rstest]
fn oversized_train_request_is_a_split_error(cache_dir: TempDir) {
    let short = |_: &GeneratorRequest, _: &DataContext| {
        Dataset::new(Array2::zeros((5, 1)), None)
    };
    let generator = generator_in(&cache_dir, 2).with_generator(DatasetName::Year, Arc::new(short));
    let request = GenDataRequest::new(DatasetName::Year, DataFormat::Numpy)
        .with_samples(8)
        .with_test_fraction(0.5);

    let err = generator.gen_data(&request).expect_err("only five rows");

    assert!(matches!(
        err,
        BenchdataError::Split {
            train_size: 8,
            available: 5
        }
    ));
    assert_eq!(generator.memoised(), 0);
}

#[rstest]
fn sparse_formats_are_reproducible(cache_dir: TempDir) {
    let generator = generator_in(&cache_dir, 1);
    let request = GenDataRequest::new(DatasetName::Blobs, DataFormat::ScipySparseCsr)
        .with_samples(20)
        .with_features(4)
        .with_random_state(5);

    let first = generator.gen_data(&request).expect("generate");
    let evict = generator
        .gen_data(&request.with_random_state(6))
        .expect("generate");
    let again = generator.gen_data(&request).expect("regenerate");

    assert!(!Arc::ptr_eq(&first, &again));
    match (&first.train_x, &again.train_x, &evict.train_x) {
        (Value::Sparse(left), Value::Sparse(right), Value::Sparse(_)) => {
            assert_eq!(left, right);
            assert_eq!(left.nnz(), 56);
        }
        other => panic!("expected sparse matrices, found {other:?}"),
    }
}

#[rstest]
fn named_entry_point_reports_lookup_errors(cache_dir: TempDir) {
    let generator = generator_in(&cache_dir, 1);
    let dataset = generator
        .gen_data_named("mnist", "numpy")
        .expect_err("unknown dataset");
    let format = generator
        .gen_data_named("zeros", "arrow")
        .expect_err("unknown format");
    assert!(matches!(dataset, BenchdataError::UnknownDataset { .. }));
    assert!(matches!(format, BenchdataError::UnknownFormat { .. }));
}

#[rstest]
fn rejects_zero_memo_capacity(cache_dir: TempDir) {
    let err = DataGenerator::new(
        BenchdataConfig::new()
            .with_cache_dir(cache_dir.path())
            .with_memo_capacity(0),
    )
    .expect_err("capacity must be positive");
    assert!(matches!(
        err,
        BenchdataError::InvalidParameter {
            parameter: "memo_capacity",
            ..
        }
    ));
}
