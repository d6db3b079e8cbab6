//! Random sampling helpers shared by the synthetic generators.

use std::f32::consts::PI;

use ndarray::Array2;
use rand::{Rng, rngs::SmallRng};

/// Draws one standard normal sample with the Box-Muller transform.
#[expect(
    clippy::float_arithmetic,
    reason = "Box-Muller transform requires floating-point arithmetic"
)]
pub(super) fn standard_normal(rng: &mut SmallRng) -> f32 {
    let u1 = rng.gen_range(0.0_f32..1.0_f32).max(f32::EPSILON);
    let u2 = rng.gen_range(0.0_f32..1.0_f32);
    let radius = (-2.0_f32 * u1.ln()).sqrt();
    let theta = 2.0_f32 * PI * u2;
    radius * theta.cos()
}

/// Fills a `rows x columns` matrix with standard normal samples.
pub(super) fn standard_normal_matrix(
    rows: usize,
    columns: usize,
    rng: &mut SmallRng,
) -> Array2<f32> {
    Array2::from_shape_simple_fn((rows, columns), || standard_normal(rng))
}

/// Cycles through `0..classes`, one label per row.
pub(super) fn round_robin_labels(rows: usize, classes: usize) -> Vec<usize> {
    (0..classes).cycle().take(rows).collect()
}
