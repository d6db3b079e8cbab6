//! Dense row-major array conversion.
use ndarray::Array1;
use rand::rngs::SmallRng;

use super::{
    Converter, DataFormat, Value,
    frame::{frame_to_matrix, series_values},
    unsupported,
};
use crate::error::Result;

/// Produces row-major `ndarray` matrices and vectors.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseConverter;

impl Converter for DenseConverter {
    fn format(&self) -> DataFormat {
        DataFormat::Numpy
    }

    fn convert_value(&self, value: Value, _rng: &mut SmallRng) -> Result<Value> {
        match value {
            Value::Matrix(matrix) if matrix.is_standard_layout() => Ok(Value::Matrix(matrix)),
            Value::Matrix(matrix) => Ok(Value::Matrix(matrix.as_standard_layout().into_owned())),
            Value::Vector(_) => Ok(value),
            Value::Frame(frame) => frame_to_matrix(&frame, DataFormat::Numpy).map(Value::Matrix),
            Value::Series(series) => Ok(Value::Vector(Array1::from_vec(series_values(&series)))),
            Value::Device(_) | Value::Sparse(_) => Err(unsupported(DataFormat::Numpy, &value)),
        }
    }
}
