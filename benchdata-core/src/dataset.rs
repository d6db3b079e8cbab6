//! Feature/label containers shared by generators, the snapshot cache, and
//! the orchestrator.

use ndarray::{Array1, Array2, s};

use crate::{
    convert::Value,
    error::{BenchdataError, Result},
};

/// A dense feature matrix with optional row-aligned labels.
///
/// Rows are samples and columns are features. When labels are present there
/// is exactly one per row.
///
/// # Examples
/// ```
/// use benchdata_core::Dataset;
/// use ndarray::{Array1, Array2};
///
/// let dataset = Dataset::new(Array2::zeros((4, 2)), Some(Array1::zeros(4)))
///     .expect("labels align with rows");
/// assert_eq!(dataset.rows(), 4);
/// assert_eq!(dataset.columns(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Option<Array1<f32>>,
}

impl Dataset {
    /// Pairs a feature matrix with optional labels.
    ///
    /// # Errors
    /// Returns [`BenchdataError::ShapeMismatch`] when the label count differs
    /// from the number of feature rows.
    pub fn new(features: Array2<f32>, labels: Option<Array1<f32>>) -> Result<Self> {
        if let Some(values) = &labels {
            if values.len() != features.nrows() {
                return Err(BenchdataError::ShapeMismatch {
                    expected: features.nrows(),
                    actual: values.len(),
                });
            }
        }
        Ok(Self { features, labels })
    }

    /// Builds a dataset from a row-major buffer.
    ///
    /// # Errors
    /// Returns [`BenchdataError::ShapeMismatch`] when `values` does not hold
    /// `rows * columns` elements or the labels are misaligned.
    pub fn from_row_major(
        rows: usize,
        columns: usize,
        values: Vec<f32>,
        labels: Option<Vec<f32>>,
    ) -> Result<Self> {
        let actual = values.len();
        let features = Array2::from_shape_vec((rows, columns), values).map_err(|_| {
            BenchdataError::ShapeMismatch {
                expected: rows.saturating_mul(columns),
                actual,
            }
        })?;
        Self::new(features, labels.map(Array1::from_vec))
    }

    /// Number of samples.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.features.nrows()
    }

    /// Number of features per sample.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.features.ncols()
    }

    /// The feature matrix.
    #[must_use]
    pub const fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// The labels, if the source provides them.
    #[must_use]
    pub const fn labels(&self) -> Option<&Array1<f32>> {
        self.labels.as_ref()
    }

    /// Consumes the dataset, returning its features and labels.
    #[must_use]
    pub fn into_parts(self) -> (Array2<f32>, Option<Array1<f32>>) {
        (self.features, self.labels)
    }

    /// Copies the leading `rows` samples and `columns` features.
    ///
    /// Callers validate the bounds; requests beyond the stored shape are
    /// clamped by the slice.
    #[must_use]
    pub(crate) fn crop(&self, rows: usize, columns: usize) -> Self {
        let kept_rows = rows.min(self.rows());
        let kept_columns = columns.min(self.columns());
        Self {
            features: self
                .features
                .slice(s![..kept_rows, ..kept_columns])
                .to_owned(),
            labels: self
                .labels
                .as_ref()
                .map(|values| values.slice(s![..kept_rows]).to_owned()),
        }
    }
}

/// A train partition plus an optional test partition.
///
/// Test components are `None` when no split was requested, which is distinct
/// from a split that produced zero test rows.
#[derive(Clone, Debug)]
pub struct Split {
    /// Training features.
    pub train_x: Value,
    /// Training labels, absent for unlabelled sources.
    pub train_y: Option<Value>,
    /// Test features, absent when no split was requested.
    pub test_x: Option<Value>,
    /// Test labels, absent when no split was requested or the source is unlabelled.
    pub test_y: Option<Value>,
}

impl Split {
    /// Wraps an unsplit dataset as a train-only split.
    #[must_use]
    pub fn unsplit(dataset: Dataset) -> Self {
        let (features, labels) = dataset.into_parts();
        Self {
            train_x: Value::Matrix(features),
            train_y: labels.map(Value::Vector),
            test_x: None,
            test_y: None,
        }
    }

    /// Whether a test partition was produced.
    #[must_use]
    pub const fn has_test(&self) -> bool {
        self.test_x.is_some()
    }
}

/// The kind of learning problem a dataset is used for.
///
/// The tag is supplied by the caller; nothing in this crate infers it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LearningTask {
    /// Continuous targets.
    Regression,
    /// Two-class targets.
    Classification,
    /// Targets drawn from more than two classes.
    MulticlassClassification,
}

/// A converted split tagged with its learning task and, for ranking
/// datasets, per-row query group identifiers.
#[derive(Clone, Debug)]
pub struct BenchmarkData {
    /// Training features.
    pub x_train: Value,
    /// Test features.
    pub x_test: Option<Value>,
    /// Training labels.
    pub y_train: Option<Value>,
    /// Test labels.
    pub y_test: Option<Value>,
    /// Learning task supplied by the caller.
    pub learning_task: LearningTask,
    qid_train: Option<Vec<i64>>,
    qid_test: Option<Vec<i64>>,
}

impl BenchmarkData {
    /// Tags `split` with `learning_task`.
    #[must_use]
    pub fn new(split: Split, learning_task: LearningTask) -> Self {
        Self {
            x_train: split.train_x,
            x_test: split.test_x,
            y_train: split.train_y,
            y_test: split.test_y,
            learning_task,
            qid_train: None,
            qid_test: None,
        }
    }

    /// Attaches query group identifiers to the train and test rows.
    ///
    /// Identifiers are opaque and are not reordered or deduplicated.
    ///
    /// # Errors
    /// Returns [`BenchdataError::ShapeMismatch`] when an identifier vector
    /// does not have one entry per row of the partition it annotates, or
    /// [`BenchdataError::InvalidParameter`] when test identifiers are given
    /// without a test partition.
    pub fn with_query_ids(
        mut self,
        qid_train: Option<Vec<i64>>,
        qid_test: Option<Vec<i64>>,
    ) -> Result<Self> {
        if let Some(ids) = &qid_train {
            check_qid_len(self.x_train.rows(), ids.len())?;
        }
        if let Some(ids) = &qid_test {
            let rows = self
                .x_test
                .as_ref()
                .map(Value::rows)
                .ok_or_else(|| BenchdataError::InvalidParameter {
                    parameter: "qid_test",
                    message: "no test partition to annotate".to_owned(),
                })?;
            check_qid_len(rows, ids.len())?;
        }
        self.qid_train = qid_train;
        self.qid_test = qid_test;
        Ok(self)
    }

    /// Query group identifiers for the train rows.
    #[must_use]
    pub fn qid_train(&self) -> Option<&[i64]> {
        self.qid_train.as_deref()
    }

    /// Query group identifiers for the test rows.
    #[must_use]
    pub fn qid_test(&self) -> Option<&[i64]> {
        self.qid_test.as_deref()
    }
}

const fn check_qid_len(rows: usize, ids: usize) -> Result<()> {
    if rows != ids {
        return Err(BenchdataError::ShapeMismatch {
            expected: rows,
            actual: ids,
        });
    }
    Ok(())
}
