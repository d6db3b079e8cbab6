//! Parsers for the raw files behind the external datasets.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::{
    dataset::Dataset,
    error::{BenchdataError, Result},
};

/// Position of the label within each CSV record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum LabelColumn {
    First,
    Last,
}

/// How a CSV file maps onto features and labels.
#[derive(Clone, Copy, Debug)]
pub(super) struct CsvLayout {
    pub(super) has_header: bool,
    pub(super) skip_index: bool,
    pub(super) label: LabelColumn,
}

/// Reads at most `row_limit` records (all when zero) from a numeric CSV.
///
/// Empty cells become NaN.
pub(super) fn read_csv(path: &Path, layout: CsvLayout, row_limit: usize) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(layout.has_header)
        .from_path(path)
        .map_err(|error| csv_error(path, &error))?;

    let mut values = Vec::new();
    let mut labels = Vec::new();
    let mut width: Option<usize> = None;
    let mut record = StringRecord::new();
    while row_limit == 0 || labels.len() < row_limit {
        if !reader
            .read_record(&mut record)
            .map_err(|error| csv_error(path, &error))?
        {
            break;
        }
        let line = record_line(&record);
        let mut cells = record
            .iter()
            .skip(usize::from(layout.skip_index))
            .map(|cell| parse_cell(cell, path, line))
            .collect::<Result<Vec<f32>>>()?;
        let extracted = match layout.label {
            LabelColumn::First if cells.is_empty() => None,
            LabelColumn::First => Some(cells.remove(0)),
            LabelColumn::Last => cells.pop(),
        };
        let Some(label) = extracted else {
            return Err(parse_error(path, line, "record has no label column"));
        };
        match width {
            Some(expected) if expected != cells.len() => {
                return Err(parse_error(
                    path,
                    line,
                    &format!("expected {expected} features, found {}", cells.len()),
                ));
            }
            Some(_) => {}
            None => width = Some(cells.len()),
        }
        values.extend(cells);
        labels.push(label);
    }

    let rows = labels.len();
    debug!(path = %path.display(), rows, "parsed csv");
    Dataset::from_row_major(rows, width.unwrap_or(0), values, Some(labels))
}

fn parse_cell(cell: &str, path: &Path, line: usize) -> Result<f32> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(f32::NAN);
    }
    trimmed
        .parse::<f32>()
        .map_err(|error| parse_error(path, line, &format!("`{trimmed}`: {error}")))
}

fn record_line(record: &StringRecord) -> usize {
    record
        .position()
        .and_then(|position| usize::try_from(position.line()).ok())
        .unwrap_or(0)
}

fn csv_error(path: &Path, error: &csv::Error) -> BenchdataError {
    let line = error
        .position()
        .and_then(|position| usize::try_from(position.line()).ok())
        .unwrap_or(0);
    parse_error(path, line, &error.to_string())
}

/// Rows parsed from one SVMlight file, still in sparse form.
#[derive(Debug, Default)]
pub(super) struct SvmlightRows {
    pub(super) labels: Vec<f32>,
    pub(super) rows: Vec<Vec<(usize, f32)>>,
    /// Largest one-based feature index seen.
    pub(super) max_index: usize,
}

impl SvmlightRows {
    pub(super) fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Reads at most `row_limit` SVMlight rows (all when zero).
///
/// Feature indices are one-based; `qid:` tokens and `#` comments are
/// skipped.
pub(super) fn read_svmlight(path: &Path, row_limit: usize) -> Result<SvmlightRows> {
    let file = File::open(path).map_err(|error| BenchdataError::io(path, error))?;
    let mut parsed = SvmlightRows::default();
    for (index, next) in BufReader::new(file).lines().enumerate() {
        if row_limit != 0 && parsed.len() >= row_limit {
            break;
        }
        let line = index.saturating_add(1);
        let text = next.map_err(|error| BenchdataError::io(path, error))?;
        let content = text.split('#').next().unwrap_or_default();
        let mut tokens = content.split_whitespace();
        let Some(raw_label) = tokens.next() else {
            continue;
        };
        let label = raw_label
            .parse::<f32>()
            .map_err(|error| parse_error(path, line, &format!("label `{raw_label}`: {error}")))?;
        let mut row = Vec::new();
        for token in tokens {
            let Some((key, value)) = token.split_once(':') else {
                return Err(parse_error(path, line, &format!("malformed pair `{token}`")));
            };
            if key == "qid" {
                continue;
            }
            let feature = key
                .parse::<usize>()
                .ok()
                .filter(|feature| *feature > 0)
                .ok_or_else(|| parse_error(path, line, &format!("bad feature index `{key}`")))?;
            let number = value
                .parse::<f32>()
                .map_err(|error| parse_error(path, line, &format!("`{value}`: {error}")))?;
            parsed.max_index = parsed.max_index.max(feature);
            row.push((feature, number));
        }
        parsed.labels.push(label);
        parsed.rows.push(row);
    }
    debug!(path = %path.display(), rows = parsed.len(), "parsed svmlight");
    Ok(parsed)
}

/// Densifies SVMlight parts into one dataset whose width is the largest
/// index seen in any part.
pub(super) fn densify(parts: Vec<SvmlightRows>) -> Result<Dataset> {
    let width = parts.iter().map(|part| part.max_index).max().unwrap_or(0);
    let rows: usize = parts.iter().map(SvmlightRows::len).sum();
    let mut values = vec![0.0_f32; rows.saturating_mul(width)];
    let mut labels = Vec::with_capacity(rows);
    let mut dense_rows = values.chunks_mut(width.max(1));
    for part in parts {
        labels.extend(part.labels);
        for sparse in part.rows {
            let Some(dense) = dense_rows.next() else {
                break;
            };
            for (feature, value) in sparse {
                if let Some(slot) = dense.get_mut(feature.saturating_sub(1)) {
                    *slot = value;
                }
            }
        }
    }
    Dataset::from_row_major(rows, width, values, Some(labels))
}

fn parse_error(path: &Path, line: usize, message: &str) -> BenchdataError {
    BenchdataError::Parse {
        path: path.to_path_buf(),
        line,
        message: message.to_owned(),
    }
}
