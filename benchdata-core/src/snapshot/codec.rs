//! Parquet encoding of [`Dataset`] snapshots.
//!
//! Features are stored as non-nullable `Float32` columns `f0..f{n-1}`, labels
//! as a trailing `label` column of the same type.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};

use arrow_array::{Array, Float32Array, RecordBatch};
use arrow_schema::DataType;
use ndarray::{Array1, Array2, ShapeBuilder};
use parquet::arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder};

use crate::{
    convert::matrix_to_frame,
    dataset::Dataset,
    error::{BenchdataError, Result},
};

pub(super) const LABEL_COLUMN: &str = "label";

pub(super) fn encode(dataset: &Dataset, path: &Path, sink: &mut BufWriter<File>) -> Result<()> {
    let names = (0..dataset.columns()).map(|index| format!("f{index}"));
    let labels = dataset.labels().map(|labels| (LABEL_COLUMN, labels));
    let batch = matrix_to_frame(dataset.features().view(), names, labels)?;
    let mut writer = ArrowWriter::try_new(&mut *sink, batch.schema(), None)
        .map_err(|error| snapshot_error(path, error.to_string()))?;
    writer
        .write(&batch)
        .map_err(|error| snapshot_error(path, error.to_string()))?;
    writer.close().map_err(|error| snapshot_error(path, error.to_string()))?;
    sink.flush().map_err(|error| BenchdataError::io(path, error))
}

pub(super) fn decode(path: &Path) -> Result<Dataset> {
    let file = File::open(path).map_err(|error| BenchdataError::io(path, error))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|error| snapshot_error(path, error.to_string()))?;
    let schema = Arc::clone(builder.schema());
    let reader = builder
        .build()
        .map_err(|error| snapshot_error(path, error.to_string()))?;

    let width = schema
        .fields()
        .iter()
        .filter(|field| field.name() != LABEL_COLUMN)
        .count();
    let mut columns: Vec<Vec<f32>> = vec![Vec::new(); width];
    let mut labels = schema
        .fields()
        .iter()
        .any(|field| field.name() == LABEL_COLUMN)
        .then(Vec::new);
    for next in reader {
        let batch = next.map_err(|error| snapshot_error(path, error.to_string()))?;
        append_batch(&batch, path, &mut columns, labels.as_mut())?;
    }

    let rows = columns
        .first()
        .map_or_else(|| labels.as_ref().map_or(0, Vec::len), Vec::len);
    let column_major: Vec<f32> = columns.into_iter().flatten().collect();
    let features = Array2::from_shape_vec((rows, width).f(), column_major)
        .map_err(|error| snapshot_error(path, error.to_string()))?
        .as_standard_layout()
        .into_owned();
    Dataset::new(features, labels.map(Array1::from_vec))
}

fn append_batch(
    batch: &RecordBatch,
    path: &Path,
    columns: &mut [Vec<f32>],
    mut labels: Option<&mut Vec<f32>>,
) -> Result<()> {
    let schema = batch.schema();
    let mut features = columns.iter_mut();
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let values = float_values(column.as_ref(), field.name(), path)?;
        let target = if field.name() == LABEL_COLUMN {
            labels.as_deref_mut()
        } else {
            features.next()
        };
        let Some(slot) = target else {
            return Err(snapshot_error(
                path,
                format!("column `{}` does not match the file schema", field.name()),
            ));
        };
        slot.extend_from_slice(values);
    }
    Ok(())
}

fn float_values<'a>(column: &'a dyn Array, name: &str, path: &Path) -> Result<&'a [f32]> {
    if column.data_type() != &DataType::Float32 {
        return Err(snapshot_error(
            path,
            format!("column `{name}` has type {}", column.data_type()),
        ));
    }
    if column.null_count() > 0 {
        return Err(snapshot_error(
            path,
            format!("column `{name}` contains nulls"),
        ));
    }
    column
        .as_any()
        .downcast_ref::<Float32Array>()
        .map(|floats| floats.values().as_ref())
        .ok_or_else(|| snapshot_error(path, format!("column `{name}` is not a Float32 array")))
}

fn snapshot_error(path: &Path, message: impl Into<String>) -> BenchdataError {
    BenchdataError::Snapshot {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
