//! Columnar frame and series conversion backed by Arrow arrays.
use std::sync::Arc;

use arrow_array::{Array, ArrayRef, Float32Array, RecordBatch, RecordBatchOptions};
use arrow_schema::{DataType, Field, Schema};
use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::SmallRng;

use super::{Converter, DataFormat, Value, unsupported};
use crate::error::{BenchdataError, Result};

/// Produces Arrow frames for matrices and Arrow series for vectors.
///
/// Frame columns are named by their zero-based index.
#[derive(Clone, Copy, Debug)]
pub struct FrameConverter {
    format: DataFormat,
}

impl FrameConverter {
    /// Creates a converter registered under `format`.
    #[must_use]
    pub const fn new(format: DataFormat) -> Self {
        Self { format }
    }
}

impl Converter for FrameConverter {
    fn format(&self) -> DataFormat {
        self.format
    }

    fn convert_value(&self, value: Value, _rng: &mut SmallRng) -> Result<Value> {
        match value {
            Value::Frame(_) | Value::Series(_) => Ok(value),
            Value::Matrix(matrix) => {
                let names = (0..matrix.ncols()).map(|index| index.to_string());
                Ok(Value::Frame(matrix_to_frame(matrix.view(), names, None)?))
            }
            Value::Vector(vector) => Ok(Value::Series(Float32Array::from(vector.to_vec()))),
            Value::Device(_) | Value::Sparse(_) => Err(unsupported(self.format, &value)),
        }
    }
}

/// Builds a frame with one non-nullable `Float32` column per matrix column,
/// optionally followed by a trailing `label` column.
pub(crate) fn matrix_to_frame(
    matrix: ArrayView2<'_, f32>,
    names: impl Iterator<Item = String>,
    labels: Option<(&str, &Array1<f32>)>,
) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(matrix.ncols().saturating_add(1));
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());
    for (name, column) in names.zip(matrix.columns()) {
        fields.push(Field::new(name, DataType::Float32, false));
        columns.push(Arc::new(Float32Array::from_iter_values(column.iter().copied())));
    }
    if let Some((name, values)) = labels {
        fields.push(Field::new(name, DataType::Float32, false));
        columns.push(Arc::new(Float32Array::from(values.to_vec())));
    }
    let options = RecordBatchOptions::new().with_row_count(Some(matrix.nrows()));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)
        .map_err(|error| BenchdataError::InvalidParameter {
            parameter: "frame",
            message: error.to_string(),
        })
}

/// Copies the values of a `Float32` column, mapping nulls to NaN.
pub(crate) fn column_values(column: &dyn Array) -> Option<Vec<f32>> {
    let floats = column.as_any().downcast_ref::<Float32Array>()?;
    Some(series_values(floats))
}

pub(super) fn series_values(series: &Float32Array) -> Vec<f32> {
    if series.null_count() == 0 {
        return series.values().to_vec();
    }
    series
        .iter()
        .map(|value| value.unwrap_or(f32::NAN))
        .collect()
}

/// Gathers every column of `frame` into a row-major matrix.
pub(super) fn frame_to_matrix(frame: &RecordBatch, format: DataFormat) -> Result<Array2<f32>> {
    let rows = frame.num_rows();
    let columns = frame.num_columns();
    let mut matrix = Array2::zeros((rows, columns));
    for (mut target, column) in matrix.columns_mut().into_iter().zip(frame.columns()) {
        let values = column_values(column.as_ref()).ok_or(BenchdataError::UnsupportedInput {
            format: format.as_str(),
            kind: "frame with non-Float32 columns",
        })?;
        target.assign(&Array1::from_vec(values));
    }
    Ok(matrix)
}
