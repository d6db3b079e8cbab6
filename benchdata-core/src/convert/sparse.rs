//! Compressed sparse matrices and randomised sparsification.
//!
//! The sparse formats exist to exercise sparse code paths in benchmarks, so
//! conversion first zeroes a fixed fraction of entries chosen uniformly at
//! random. The original values of zeroed entries are not recoverable.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::{rngs::SmallRng, seq::index};
use tracing::debug;

use super::{
    Converter, DataFormat, Value,
    frame::{frame_to_matrix, series_values},
    unsupported,
};
use crate::{
    config::{DEFAULT_SPARSITY_RATIO, validate_sparsity_ratio},
    error::Result,
};

/// Compression axis of a [`CompressedMatrix`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SparseLayout {
    /// Compressed sparse rows.
    Csr,
    /// Compressed sparse columns.
    Csc,
}

/// A matrix in compressed sparse row or column form.
///
/// For [`SparseLayout::Csr`], `indptr` has one entry per row plus one and
/// `indices` holds column indices; [`SparseLayout::Csc`] swaps the roles.
/// Explicit zeros are never stored.
///
/// # Examples
/// ```
/// use benchdata_core::{CompressedMatrix, SparseLayout};
/// use ndarray::array;
///
/// let dense = array![[0.0, 2.0], [3.0, 0.0]];
/// let csr = CompressedMatrix::from_dense(dense.view(), SparseLayout::Csr);
/// assert_eq!(csr.nnz(), 2);
/// assert_eq!(csr.to_dense(), dense);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CompressedMatrix {
    layout: SparseLayout,
    rows: usize,
    columns: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

impl CompressedMatrix {
    /// Encodes the nonzero entries of `dense`.
    #[must_use]
    pub fn from_dense(dense: ArrayView2<'_, f32>, layout: SparseLayout) -> Self {
        let (rows, columns) = dense.dim();
        let axis = match layout {
            SparseLayout::Csr => Axis(0),
            SparseLayout::Csc => Axis(1),
        };
        let mut indptr = Vec::with_capacity(dense.len_of(axis).saturating_add(1));
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for lane in dense.axis_iter(axis) {
            for (index, value) in lane.iter().enumerate() {
                if *value != 0.0 {
                    indices.push(index);
                    data.push(*value);
                }
            }
            indptr.push(data.len());
        }
        Self {
            layout,
            rows,
            columns,
            indptr,
            indices,
            data,
        }
    }

    /// Compression axis.
    #[must_use]
    pub const fn layout(&self) -> SparseLayout {
        self.layout
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Offsets into [`Self::indices`] and [`Self::data`] per compressed lane.
    #[must_use]
    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    /// Minor-axis index of each stored entry.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Stored values.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Expands back into a dense row-major matrix.
    #[must_use]
    pub fn to_dense(&self) -> Array2<f32> {
        let mut dense = Array2::zeros((self.rows, self.columns));
        for (lane, bounds) in self.indptr.windows(2).enumerate() {
            let (Some(&start), Some(&end)) = (bounds.first(), bounds.get(1)) else {
                continue;
            };
            let entries = self
                .indices
                .iter()
                .zip(&self.data)
                .skip(start)
                .take(end.saturating_sub(start));
            for (&minor, &value) in entries {
                let position = match self.layout {
                    SparseLayout::Csr => (lane, minor),
                    SparseLayout::Csc => (minor, lane),
                };
                if let Some(slot) = dense.get_mut(position) {
                    *slot = value;
                }
            }
        }
        dense
    }
}

/// Sparsifies dense input and encodes it as a [`CompressedMatrix`].
#[derive(Clone, Copy, Debug)]
pub struct SparseConverter {
    layout: SparseLayout,
    sparsity_ratio: f64,
}

impl SparseConverter {
    /// Creates a converter zeroing `sparsity_ratio` of the entries.
    ///
    /// # Errors
    /// Returns [`crate::BenchdataError::InvalidParameter`] when the ratio is
    /// not a finite value in `[0, 1]`.
    pub fn new(layout: SparseLayout, sparsity_ratio: f64) -> Result<Self> {
        validate_sparsity_ratio(sparsity_ratio)?;
        Ok(Self {
            layout,
            sparsity_ratio,
        })
    }

    /// Creates a converter using the default sparsity ratio.
    #[must_use]
    pub const fn with_default_ratio(layout: SparseLayout) -> Self {
        Self {
            layout,
            sparsity_ratio: DEFAULT_SPARSITY_RATIO,
        }
    }

    fn encode(&self, matrix: Array2<f32>, rng: &mut SmallRng) -> Value {
        let sparse = sparsify(matrix, self.sparsity_ratio, rng);
        Value::Sparse(CompressedMatrix::from_dense(sparse.view(), self.layout))
    }
}

impl Converter for SparseConverter {
    fn format(&self) -> DataFormat {
        match self.layout {
            SparseLayout::Csr => DataFormat::ScipySparseCsr,
            SparseLayout::Csc => DataFormat::ScipySparseCsc,
        }
    }

    fn convert_value(&self, value: Value, rng: &mut SmallRng) -> Result<Value> {
        match value {
            Value::Matrix(matrix) => Ok(self.encode(matrix, rng)),
            Value::Vector(vector) => Ok(self.encode(vector.insert_axis(Axis(0)), rng)),
            Value::Frame(frame) => {
                let matrix = frame_to_matrix(&frame, self.format())?;
                Ok(self.encode(matrix, rng))
            }
            Value::Series(series) => {
                let vector = Array1::from_vec(series_values(&series));
                Ok(self.encode(vector.insert_axis(Axis(0)), rng))
            }
            Value::Device(_) | Value::Sparse(_) => Err(unsupported(self.format(), &value)),
        }
    }
}

/// Zeroes `floor(len * ratio)` entries of `matrix`, chosen uniformly without
/// replacement over its row-major flattening.
pub(crate) fn sparsify(dense: Array2<f32>, ratio: f64, rng: &mut SmallRng) -> Array2<f32> {
    let mut matrix = if dense.is_standard_layout() {
        dense
    } else {
        dense.as_standard_layout().into_owned()
    };
    let size = matrix.len();
    let amount = zeroed_count(size, ratio);
    if let Some(flat) = matrix.as_slice_mut() {
        for position in index::sample(rng, size, amount) {
            if let Some(slot) = flat.get_mut(position) {
                *slot = 0.0;
            }
        }
    }
    debug!(size, zeroed = amount, "sparsified dense input");
    matrix
}

#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_arithmetic,
    reason = "the zeroed count is the floor of a fraction of the element count"
)]
fn zeroed_count(size: usize, ratio: f64) -> usize {
    let amount = (size as f64 * ratio).floor() as usize;
    amount.min(size)
}
