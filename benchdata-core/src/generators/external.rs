//! Loaders for the downloaded real-world datasets.
//!
//! Each loader parses its raw files on a snapshot miss and otherwise reuses
//! the snapshot stored for the same row budget. The random state is ignored;
//! these datasets are fixed.

use std::{path::PathBuf, process::Command};

use tracing::{info, instrument};

use super::{
    DataContext, DatasetName, GeneratorRequest,
    parse::{CsvLayout, LabelColumn, densify, read_csv, read_svmlight},
};
use crate::{
    dataset::Dataset,
    error::{BenchdataError, Result},
};

const KAGGLE_COMMAND: &str = "kaggle";

const LABEL_FIRST: CsvLayout = CsvLayout {
    has_header: false,
    skip_index: false,
    label: LabelColumn::First,
};

fn load_snapshot<F>(
    dataset: DatasetName,
    request: &GeneratorRequest,
    context: &DataContext,
    raw_loader: F,
) -> Result<Dataset>
where
    F: FnOnce(usize) -> Result<Dataset>,
{
    request.params.check_accepted(dataset, &[])?;
    context.snapshots().load_or_build(
        dataset.as_str(),
        request.n_samples,
        request.n_features,
        raw_loader,
    )
}

/// Bosch production line numeric features, fetched with the Kaggle CLI.
#[instrument(name = "generate.bosch", err, skip(context))]
pub(super) fn bosch(request: &GeneratorRequest, context: &DataContext) -> Result<Dataset> {
    load_snapshot(DatasetName::Bosch, request, context, |hint| {
        let archive = ensure_bosch_archive(context)?;
        let csv = context.fetcher().decompress_cached(&archive)?;
        let layout = CsvLayout {
            has_header: true,
            skip_index: true,
            label: LabelColumn::Last,
        };
        read_csv(&csv, layout, hint)
    })
}

fn ensure_bosch_archive(context: &DataContext) -> Result<PathBuf> {
    let sources = context.sources();
    let cache_dir = context.fetcher().cache_dir();
    let archive = cache_dir.join(&sources.bosch_file);
    if archive.exists() || archive.with_extension("").exists() {
        return Ok(archive);
    }
    crate::fetch::ensure_dir(cache_dir)?;
    let mut command = Command::new(KAGGLE_COMMAND);
    command
        .args(["competitions", "download", "-c"])
        .arg(&sources.bosch_competition)
        .arg("-f")
        .arg(&sources.bosch_file)
        .arg("-p")
        .arg(cache_dir);
    let rendered = format!(
        "{KAGGLE_COMMAND} competitions download -c {} -f {} -p {}",
        sources.bosch_competition,
        sources.bosch_file,
        cache_dir.display()
    );
    info!(command = %rendered, "fetching bosch archive");
    let status = command
        .status()
        .map_err(|error| BenchdataError::ExternalCommand {
            command: rendered.clone(),
            message: error.to_string(),
        })?;
    if !status.success() {
        return Err(BenchdataError::ExternalCommand {
            command: rendered,
            message: status.to_string(),
        });
    }
    Ok(archive)
}

/// Forest cover types: 54 features followed by the class label.
#[instrument(name = "generate.covtype", err, skip(context))]
pub(super) fn covtype(request: &GeneratorRequest, context: &DataContext) -> Result<Dataset> {
    load_snapshot(DatasetName::Covtype, request, context, |hint| {
        let csv = context.fetcher().fetch_and_cache(&context.sources().covtype)?;
        let layout = CsvLayout {
            has_header: false,
            skip_index: false,
            label: LabelColumn::Last,
        };
        read_csv(&csv, layout, hint)
    })
}

/// Epsilon in SVMlight format; the test file is appended when the train file
/// cannot satisfy the row hint. The hint bounds each file separately and the
/// snapshot crop trims the excess. Non-positive labels become 0.
#[instrument(name = "generate.epsilon", err, skip(context))]
pub(super) fn epsilon(request: &GeneratorRequest, context: &DataContext) -> Result<Dataset> {
    load_snapshot(DatasetName::Epsilon, request, context, |hint| {
        let sources = context.sources();
        let train_path = context.fetcher().fetch_and_cache(&sources.epsilon_train)?;
        let train = read_svmlight(&train_path, hint)?;
        let train_rows = train.len();
        let mut parts = vec![train];
        if hint == 0 || hint > train_rows {
            let test_path = context.fetcher().fetch_and_cache(&sources.epsilon_test)?;
            parts.push(read_svmlight(&test_path, hint)?);
        }
        let (features, labels) = densify(parts)?.into_parts();
        let binary = labels.map(|values| values.mapv(|label| label.max(0.0)));
        Dataset::new(features, binary)
    })
}

/// Higgs boson: the label, then 28 kinematic features.
#[instrument(name = "generate.higgs", err, skip(context))]
pub(super) fn higgs(request: &GeneratorRequest, context: &DataContext) -> Result<Dataset> {
    load_snapshot(DatasetName::Higgs, request, context, |hint| {
        let csv = context.fetcher().fetch_and_cache(&context.sources().higgs)?;
        read_csv(&csv, LABEL_FIRST, hint)
    })
}

/// Million Song year prediction: the release year, then 90 timbre features.
#[instrument(name = "generate.year", err, skip(context))]
pub(super) fn year(request: &GeneratorRequest, context: &DataContext) -> Result<Dataset> {
    load_snapshot(DatasetName::Year, request, context, |hint| {
        let csv = context.fetcher().fetch_and_cache(&context.sources().year)?;
        read_csv(&csv, LABEL_FIRST, hint)
    })
}
