//! Seeded synthetic generators.
//!
//! Every generator here is deterministic for a given request: the same sizes,
//! seed, and parameters always produce the same dataset.

use ndarray::{Array1, Array2, Axis, s};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::{debug, instrument};

use super::{
    DataContext, DatasetName, GeneratorRequest,
    sampling::{round_robin_labels, standard_normal, standard_normal_matrix},
};
use crate::{
    dataset::Dataset,
    error::{BenchdataError, Result},
};

const DEFAULT_SAMPLES: usize = 1_000_000;
const DEFAULT_FEATURES: usize = 100;
const DEFAULT_CENTERS: usize = 3;
const DEFAULT_CLASSES: usize = 2;
const CENTER_BOX: f32 = 10.0;
const CLUSTER_STD: f32 = 1.0;
const CLASS_SEPARATION: f32 = 1.0;
const MAX_INFORMATIVE_REGRESSORS: usize = 10;
const MAX_COEFFICIENT: f32 = 100.0;

const fn or_default(value: usize, default: usize) -> usize {
    if value == 0 { default } else { value }
}

fn resolve_shape(request: &GeneratorRequest) -> (usize, usize) {
    (
        or_default(request.n_samples, DEFAULT_SAMPLES),
        or_default(request.n_features, DEFAULT_FEATURES),
    )
}

#[expect(
    clippy::cast_precision_loss,
    reason = "labels are small class indices stored as f32"
)]
fn labels_to_f32(labels: &[usize]) -> Array1<f32> {
    labels.iter().map(|label| *label as f32).collect()
}

/// Isotropic Gaussian clusters with uniformly placed centres.
#[instrument(name = "generate.blobs", err, skip(_context))]
#[expect(
    clippy::float_arithmetic,
    reason = "cluster samples are centre plus scaled noise"
)]
pub(super) fn blobs(request: &GeneratorRequest, _context: &DataContext) -> Result<Dataset> {
    request
        .params
        .check_accepted(DatasetName::Blobs, &["centers"])?;
    let (rows, columns) = resolve_shape(request);
    let centers = request.params.centers.unwrap_or(DEFAULT_CENTERS);
    if centers == 0 {
        return Err(BenchdataError::InvalidParameter {
            parameter: "centers",
            message: "must be at least one".to_owned(),
        });
    }

    let mut rng = SmallRng::seed_from_u64(request.random_state);
    let centres = Array2::from_shape_simple_fn((centers, columns), || {
        rng.gen_range(-CENTER_BOX..CENTER_BOX)
    });
    let labels = round_robin_labels(rows, centers);
    let mut features = Array2::zeros((rows, columns));
    for (mut row, label) in features.axis_iter_mut(Axis(0)).zip(&labels) {
        let centre = centres.row(*label);
        for (value, mean) in row.iter_mut().zip(centre) {
            *value = *mean + standard_normal(&mut rng) * CLUSTER_STD;
        }
    }
    debug!(rows, columns, centers, "generated blobs");
    Dataset::new(features, Some(labels_to_f32(&labels)))
}

/// All-zero features and labels. Zero sizes are kept as-is.
#[instrument(name = "generate.zeros", err, skip(_context))]
pub(super) fn zeros(request: &GeneratorRequest, _context: &DataContext) -> Result<Dataset> {
    request.params.check_accepted(DatasetName::Zeros, &[])?;
    Dataset::new(
        Array2::zeros((request.n_samples, request.n_features)),
        Some(Array1::zeros(request.n_samples)),
    )
}

/// Gaussian classes centred on hypercube vertices of an informative
/// subspace; the remaining features are pure noise.
#[instrument(name = "generate.classification", err, skip(_context))]
#[expect(
    clippy::float_arithmetic,
    reason = "class samples are vertex plus Gaussian noise"
)]
pub(super) fn classification(
    request: &GeneratorRequest,
    _context: &DataContext,
) -> Result<Dataset> {
    request
        .params
        .check_accepted(DatasetName::Classification, &["n_classes"])?;
    let (rows, columns) = resolve_shape(request);
    let classes = request.params.n_classes.unwrap_or(DEFAULT_CLASSES);
    if classes < 2 {
        return Err(BenchdataError::InvalidParameter {
            parameter: "n_classes",
            message: format!("{classes} classes requested, need at least two"),
        });
    }
    let informative = informative_dimensions(classes).min(columns);
    if !fits_on_vertices(classes, informative) {
        return Err(BenchdataError::InvalidParameter {
            parameter: "n_classes",
            message: format!(
                "{classes} classes do not fit on the vertices of a {informative}-dimensional hypercube"
            ),
        });
    }

    let mut rng = SmallRng::seed_from_u64(request.random_state);
    let mut features = standard_normal_matrix(rows, columns, &mut rng);
    let labels = round_robin_labels(rows, classes);
    for (mut row, label) in features.axis_iter_mut(Axis(0)).zip(&labels) {
        for (bit, value) in row.iter_mut().take(informative).enumerate() {
            *value += vertex_coordinate(*label, bit);
        }
    }
    debug!(rows, columns, classes, informative, "generated classification");
    Dataset::new(features, Some(labels_to_f32(&labels)))
}

/// Bits needed to give every class its own vertex, with a floor of two.
fn informative_dimensions(classes: usize) -> usize {
    let bits = usize::BITS - classes.saturating_sub(1).leading_zeros();
    usize::try_from(bits).map_or(2, |needed| needed.max(2))
}

fn fits_on_vertices(classes: usize, dimensions: usize) -> bool {
    u32::try_from(dimensions)
        .ok()
        .and_then(|shift| 1_usize.checked_shl(shift))
        .is_none_or(|vertices| classes <= vertices)
}

const fn vertex_coordinate(label: usize, bit: usize) -> f32 {
    if (label >> bit) & 1 == 1 {
        CLASS_SEPARATION
    } else {
        -CLASS_SEPARATION
    }
}

/// Linear targets over Gaussian features; only the first few features carry
/// signal.
#[instrument(name = "generate.regression", err, skip(_context))]
#[expect(
    clippy::float_arithmetic,
    reason = "coefficients are scaled uniform draws"
)]
pub(super) fn regression(request: &GeneratorRequest, _context: &DataContext) -> Result<Dataset> {
    request
        .params
        .check_accepted(DatasetName::Regression, &[])?;
    let (rows, columns) = resolve_shape(request);
    let informative = columns.min(MAX_INFORMATIVE_REGRESSORS);

    let mut rng = SmallRng::seed_from_u64(request.random_state);
    let features = standard_normal_matrix(rows, columns, &mut rng);
    let coefficients: Array1<f32> = (0..informative)
        .map(|_| rng.gen_range(0.0_f32..1.0_f32) * MAX_COEFFICIENT)
        .collect();
    let targets = features.slice(s![.., ..informative]).dot(&coefficients);
    debug!(rows, columns, informative, "generated regression");
    Dataset::new(features, Some(targets))
}
