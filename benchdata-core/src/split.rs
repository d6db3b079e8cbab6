//! Seeded train/test partitioning.

use ndarray::Axis;
use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use tracing::debug;

use crate::{
    convert::Value,
    dataset::{Dataset, Split},
    error::{BenchdataError, Result},
};

/// Shuffles the rows of `dataset` with `seed` and assigns the first
/// `train_size` to the train partition and the rest to the test partition.
///
/// Both test components are populated even when no rows remain for them;
/// only unlabelled datasets leave `test_y` empty.
///
/// # Errors
/// Returns [`BenchdataError::Split`] when `train_size` exceeds the number of
/// rows.
///
/// # Examples
/// ```
/// use benchdata_core::{Dataset, train_test_split};
/// use ndarray::{Array1, Array2};
///
/// let dataset = Dataset::new(Array2::zeros((10, 2)), Some(Array1::zeros(10)))
///     .expect("aligned labels");
/// let split = train_test_split(dataset, 7, 42).expect("enough rows");
/// assert_eq!(split.train_x.rows(), 7);
/// assert_eq!(split.test_x.map(|x| x.rows()), Some(3));
/// ```
pub fn train_test_split(dataset: Dataset, train_size: usize, seed: u64) -> Result<Split> {
    let available = dataset.rows();
    if train_size > available {
        return Err(BenchdataError::Split {
            train_size,
            available,
        });
    }
    let mut order: Vec<usize> = (0..available).collect();
    order.shuffle(&mut SmallRng::seed_from_u64(seed));
    let (train_rows, test_rows) = order.split_at(train_size);

    let (features, labels) = dataset.into_parts();
    debug!(
        train = train_rows.len(),
        test = test_rows.len(),
        "split dataset"
    );
    Ok(Split {
        train_x: Value::Matrix(features.select(Axis(0), train_rows)),
        train_y: labels
            .as_ref()
            .map(|values| Value::Vector(values.select(Axis(0), train_rows))),
        test_x: Some(Value::Matrix(features.select(Axis(0), test_rows))),
        test_y: labels.map(|values| Value::Vector(values.select(Axis(0), test_rows))),
    })
}
