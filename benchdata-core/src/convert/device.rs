//! Device-layout arrays.
//!
//! A [`DeviceArray`] is a host buffer laid out the way a device upload
//! expects it: matrices are stored contiguously in either Fortran or C order,
//! vectors are plain contiguous buffers. Moving the buffer to a device is the
//! caller's concern.

use ndarray::{Array1, Array2, ArrayView2, ShapeBuilder};
use rand::rngs::SmallRng;

use super::{
    Converter, DataFormat, Value,
    frame::{frame_to_matrix, series_values},
    unsupported,
};
use crate::error::Result;

/// Element order of a contiguous matrix buffer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MemoryOrder {
    /// Column-major.
    Fortran,
    /// Row-major.
    C,
}

/// A contiguous array ready for device upload.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceArray {
    /// A matrix stored contiguously in the given order.
    Matrix {
        /// Element order of the buffer.
        order: MemoryOrder,
        /// The matrix; its memory layout matches `order`.
        values: Array2<f32>,
    },
    /// A contiguous vector.
    Vector(Array1<f32>),
}

impl DeviceArray {
    /// Copies `matrix` into a contiguous buffer of the requested order.
    #[must_use]
    pub fn from_matrix(matrix: ArrayView2<'_, f32>, order: MemoryOrder) -> Self {
        let shape = matrix.raw_dim();
        let mut values = match order {
            MemoryOrder::Fortran => Array2::zeros(shape.f()),
            MemoryOrder::C => Array2::zeros(shape),
        };
        values.assign(&matrix);
        Self::Matrix { order, values }
    }

    /// Element order, or `None` for vectors.
    #[must_use]
    pub const fn order(&self) -> Option<MemoryOrder> {
        match self {
            Self::Matrix { order, .. } => Some(*order),
            Self::Vector(_) => None,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        match self {
            Self::Matrix { values, .. } => values.nrows(),
            Self::Vector(values) => values.len(),
        }
    }

    /// Number of columns, or `None` for vectors.
    #[must_use]
    pub fn columns(&self) -> Option<usize> {
        match self {
            Self::Matrix { values, .. } => Some(values.ncols()),
            Self::Vector(_) => None,
        }
    }

    /// The raw buffer in memory order.
    #[must_use]
    pub fn as_slice(&self) -> Option<&[f32]> {
        match self {
            Self::Matrix { values, .. } => values.as_slice_memory_order(),
            Self::Vector(values) => values.as_slice(),
        }
    }
}

/// Produces [`DeviceArray`] values in a fixed memory order.
#[derive(Clone, Copy, Debug)]
pub struct DeviceConverter {
    order: MemoryOrder,
}

impl DeviceConverter {
    /// Creates a converter producing `order` matrices.
    #[must_use]
    pub const fn new(order: MemoryOrder) -> Self {
        Self { order }
    }
}

impl Converter for DeviceConverter {
    fn format(&self) -> DataFormat {
        match self.order {
            MemoryOrder::Fortran => DataFormat::GpuArray,
            MemoryOrder::C => DataFormat::GpuArrayC,
        }
    }

    fn convert_value(&self, value: Value, _rng: &mut SmallRng) -> Result<Value> {
        let array = match value {
            Value::Matrix(matrix) => DeviceArray::from_matrix(matrix.view(), self.order),
            Value::Vector(vector) => DeviceArray::Vector(vector.as_standard_layout().into_owned()),
            Value::Frame(frame) => {
                let matrix = frame_to_matrix(&frame, self.format())?;
                DeviceArray::from_matrix(matrix.view(), self.order)
            }
            Value::Series(series) => DeviceArray::Vector(Array1::from_vec(series_values(&series))),
            Value::Device(DeviceArray::Matrix { order, values }) if order == self.order => {
                DeviceArray::Matrix { order, values }
            }
            Value::Device(DeviceArray::Matrix { values, .. }) => {
                DeviceArray::from_matrix(values.view(), self.order)
            }
            Value::Device(vector @ DeviceArray::Vector(_)) => vector,
            Value::Sparse(_) => return Err(unsupported(self.format(), &value)),
        };
        Ok(Value::Device(array))
    }
}
