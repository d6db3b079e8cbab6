//! Output representations and the converters that produce them.
//!
//! Converters operate on [`Convertible`], a small tree of optional values and
//! tuples, so a whole train/test split can be converted in one call while
//! absent test partitions stay absent.

mod dense;
mod device;
mod frame;
mod sparse;

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use arrow_array::{Float32Array, RecordBatch};
use ndarray::{Array1, Array2};
use rand::rngs::SmallRng;
use tracing::instrument;

use crate::{
    dataset::Split,
    error::{BenchdataError, Result},
};

pub use dense::DenseConverter;
pub use device::{DeviceArray, DeviceConverter, MemoryOrder};
pub use frame::FrameConverter;
pub use sparse::{CompressedMatrix, SparseConverter, SparseLayout};

pub(crate) use frame::matrix_to_frame;

/// A concrete table or column in one of the supported representations.
#[derive(Clone, Debug)]
pub enum Value {
    /// Dense row-major matrix.
    Matrix(Array2<f32>),
    /// Dense vector.
    Vector(Array1<f32>),
    /// Columnar frame with one `Float32` column per feature.
    Frame(RecordBatch),
    /// Columnar series.
    Series(Float32Array),
    /// Contiguous array in the layout expected by a device upload.
    Device(DeviceArray),
    /// Compressed sparse matrix.
    Sparse(CompressedMatrix),
}

impl Value {
    /// Short name of the representation, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Matrix(_) => "dense-matrix",
            Self::Vector(_) => "dense-vector",
            Self::Frame(_) => "frame",
            Self::Series(_) => "series",
            Self::Device(_) => "device-array",
            Self::Sparse(matrix) => match matrix.layout() {
                SparseLayout::Csr => "sparse-csr",
                SparseLayout::Csc => "sparse-csc",
            },
        }
    }

    /// Number of rows (samples) held by the value.
    #[must_use]
    pub fn rows(&self) -> usize {
        match self {
            Self::Matrix(matrix) => matrix.nrows(),
            Self::Vector(vector) => vector.len(),
            Self::Frame(frame) => frame.num_rows(),
            Self::Series(series) => series.len(),
            Self::Device(array) => array.rows(),
            Self::Sparse(matrix) => matrix.rows(),
        }
    }

    /// Number of columns, or `None` for one-dimensional values.
    #[must_use]
    pub fn columns(&self) -> Option<usize> {
        match self {
            Self::Matrix(matrix) => Some(matrix.ncols()),
            Self::Frame(frame) => Some(frame.num_columns()),
            Self::Device(array) => array.columns(),
            Self::Sparse(matrix) => Some(matrix.columns()),
            Self::Vector(_) | Self::Series(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.columns() {
            Some(columns) => write!(f, "{} {}x{}", self.kind(), self.rows(), columns),
            None => write!(f, "{} {}", self.kind(), self.rows()),
        }
    }
}

/// Input accepted by [`Converter::convert`].
#[derive(Clone, Debug)]
pub enum Convertible {
    /// A missing component, such as the test set of an unsplit dataset.
    Absent,
    /// An ordered group converted element by element.
    Tuple(Vec<Convertible>),
    /// A concrete value.
    Value(Value),
}

impl From<Value> for Convertible {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<Value>> for Convertible {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Absent, Self::Value)
    }
}

impl From<Split> for Convertible {
    fn from(split: Split) -> Self {
        Self::Tuple(vec![
            split.train_x.into(),
            split.train_y.into(),
            split.test_x.into(),
            split.test_y.into(),
        ])
    }
}

impl TryFrom<Convertible> for Split {
    type Error = BenchdataError;

    fn try_from(data: Convertible) -> Result<Self> {
        let Convertible::Tuple(items) = data else {
            return Err(BenchdataError::ShapeMismatch {
                expected: 4,
                actual: 1,
            });
        };
        let actual = items.len();
        let Ok([train_x, train_y, test_x, test_y]) = <[Convertible; 4]>::try_from(items) else {
            return Err(BenchdataError::ShapeMismatch {
                expected: 4,
                actual,
            });
        };
        let Some(train_x) = into_value(train_x)? else {
            return Err(BenchdataError::ShapeMismatch {
                expected: 1,
                actual: 0,
            });
        };
        Ok(Self {
            train_x,
            train_y: into_value(train_y)?,
            test_x: into_value(test_x)?,
            test_y: into_value(test_y)?,
        })
    }
}

fn into_value(item: Convertible) -> Result<Option<Value>> {
    match item {
        Convertible::Absent => Ok(None),
        Convertible::Value(value) => Ok(Some(value)),
        Convertible::Tuple(nested) => Err(BenchdataError::ShapeMismatch {
            expected: 1,
            actual: nested.len(),
        }),
    }
}

/// Maps values into one output representation.
///
/// Implementors provide [`Converter::convert_value`]; the provided
/// [`Converter::convert`] walks tuples and preserves absent entries.
pub trait Converter: Send + Sync {
    /// Format produced by this converter.
    fn format(&self) -> DataFormat;

    /// Converts a single value.
    ///
    /// `rng` is only consumed by converters that randomise their output.
    ///
    /// # Errors
    /// Returns [`BenchdataError::UnsupportedInput`] when the value kind is
    /// not accepted.
    fn convert_value(&self, value: Value, rng: &mut SmallRng) -> Result<Value>;

    /// Converts `data`, recursing into tuples.
    ///
    /// # Errors
    /// Propagates the first error raised by [`Converter::convert_value`].
    fn convert(&self, data: Convertible, rng: &mut SmallRng) -> Result<Convertible> {
        match data {
            Convertible::Absent => Ok(Convertible::Absent),
            Convertible::Tuple(items) => items
                .into_iter()
                .map(|item| self.convert(item, rng))
                .collect::<Result<Vec<_>>>()
                .map(Convertible::Tuple),
            Convertible::Value(value) => self.convert_value(value, rng).map(Convertible::Value),
        }
    }
}

pub(crate) const fn unsupported(format: DataFormat, value: &Value) -> BenchdataError {
    BenchdataError::UnsupportedInput {
        format: format.as_str(),
        kind: value.kind(),
    }
}

/// Output representations understood by [`ConverterRegistry`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DataFormat {
    /// Dense row-major arrays.
    Numpy,
    /// Columnar frame and series.
    Cudf,
    /// Columnar frame and series.
    Pandas,
    /// Device-layout arrays in Fortran (column-major) order.
    GpuArray,
    /// Device-layout arrays in C (row-major) order.
    GpuArrayC,
    /// Sparsified compressed sparse row matrices.
    ScipySparseCsr,
    /// Sparsified compressed sparse column matrices.
    ScipySparseCsc,
}

impl DataFormat {
    /// Every supported format, in registry order.
    pub const ALL: [Self; 7] = [
        Self::Numpy,
        Self::Cudf,
        Self::Pandas,
        Self::GpuArray,
        Self::GpuArrayC,
        Self::ScipySparseCsr,
        Self::ScipySparseCsc,
    ];

    /// Registry name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Numpy => "numpy",
            Self::Cudf => "cudf",
            Self::Pandas => "pandas",
            Self::GpuArray => "gpuarray",
            Self::GpuArrayC => "gpuarray-c",
            Self::ScipySparseCsr => "scipy-sparse-csr",
            Self::ScipySparseCsc => "scipy-sparse-csc",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = BenchdataError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == raw)
            .ok_or_else(|| BenchdataError::UnknownFormat {
                name: raw.to_owned(),
            })
    }
}

/// Name-keyed table of converters.
///
/// # Examples
/// ```
/// use benchdata_core::{ConverterRegistry, DataFormat};
///
/// let registry = ConverterRegistry::new(0.3).expect("ratio is valid");
/// assert!(registry.get(DataFormat::Numpy).is_ok());
/// ```
#[derive(Clone)]
pub struct ConverterRegistry {
    converters: HashMap<DataFormat, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// Registers every built-in format, using `sparsity_ratio` for the
    /// sparse formats.
    ///
    /// # Errors
    /// Returns [`BenchdataError::InvalidParameter`] when the ratio is not a
    /// finite value in `[0, 1]`.
    pub fn new(sparsity_ratio: f64) -> Result<Self> {
        Ok(Self::from_sparse(
            SparseConverter::new(SparseLayout::Csr, sparsity_ratio)?,
            SparseConverter::new(SparseLayout::Csc, sparsity_ratio)?,
        ))
    }

    fn from_sparse(csr: SparseConverter, csc: SparseConverter) -> Self {
        let converters: [Arc<dyn Converter>; 7] = [
            Arc::new(DenseConverter),
            Arc::new(FrameConverter::new(DataFormat::Cudf)),
            Arc::new(FrameConverter::new(DataFormat::Pandas)),
            Arc::new(DeviceConverter::new(MemoryOrder::Fortran)),
            Arc::new(DeviceConverter::new(MemoryOrder::C)),
            Arc::new(csr),
            Arc::new(csc),
        ];
        Self {
            converters: converters
                .into_iter()
                .map(|converter| (converter.format(), converter))
                .collect(),
        }
    }

    /// Replaces the converter registered for its format.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.insert(converter.format(), converter);
        self
    }

    /// Looks up the converter for `format`.
    ///
    /// # Errors
    /// Returns [`BenchdataError::UnknownFormat`] when no converter is
    /// registered.
    pub fn get(&self, format: DataFormat) -> Result<&dyn Converter> {
        self.converters
            .get(&format)
            .map(AsRef::as_ref)
            .ok_or_else(|| BenchdataError::UnknownFormat {
                name: format.as_str().to_owned(),
            })
    }

    /// Converts a split into `format`.
    ///
    /// # Errors
    /// Returns lookup or type errors raised by the converter.
    #[instrument(name = "convert.split", err, skip(self, split, rng), fields(format = %format))]
    pub fn convert_split(
        &self,
        format: DataFormat,
        split: Split,
        rng: &mut SmallRng,
    ) -> Result<Split> {
        let converter = self.get(format)?;
        let converted = converter.convert(split.into(), rng)?;
        Split::try_from(converted)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::from_sparse(
            SparseConverter::with_default_ratio(SparseLayout::Csr),
            SparseConverter::with_default_ratio(SparseLayout::Csc),
        )
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<&str> = self.converters.keys().map(|key| key.as_str()).collect();
        formats.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("formats", &formats)
            .finish()
    }
}
