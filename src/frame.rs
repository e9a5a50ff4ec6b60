//! Frame - whole-dataset loading and writing through polars
//!
//! Transformations load the full dataset into a `DataFrame`, work on a
//! lazy copy, and write the result next to the source as
//! `<stem>_processed.csv`. The source file is never modified.

use crate::error::{DatasetError, Result};
use crate::table::{read_excel, Cell, Chunk, ColumnType, NA_TOKENS};
use crate::workspace::{DatasetFormat, Workspace};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of a tool that writes a processed copy of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformOutcome {
    pub message: String,
    pub output_path: String,
}

/// Load every row of a dataset.
pub fn load_frame(full_path: &Path, format: DatasetFormat) -> Result<DataFrame> {
    match format {
        DatasetFormat::Csv => {
            let null_values =
                NullValues::AllColumns(NA_TOKENS.iter().map(|s| s.to_string()).collect());
            let df = LazyCsvReader::new(full_path)
                .with_has_header(true)
                .with_null_values(Some(null_values))
                .with_infer_schema_length(None)
                .finish()
                .map_err(|e| {
                    DatasetError::Polars(format!("Failed to load CSV {}: {}", full_path.display(), e))
                })?
                .collect()?;
            Ok(df)
        }
        DatasetFormat::Excel => chunk_to_frame(&read_excel(full_path, None)?),
    }
}

/// Resolve `path` in the workspace and load it.
pub fn load_dataset(workspace: &Workspace, path: &str) -> Result<(PathBuf, DataFrame)> {
    let (full_path, format) = workspace.locate(path)?;
    let df = load_frame(&full_path, format)?;
    info!("Loaded {}: {} rows, {} columns", path, df.height(), df.width());
    Ok((full_path, df))
}

/// Build a `DataFrame` from a typed chunk. Object columns become strings.
pub fn chunk_to_frame(chunk: &Chunk) -> Result<DataFrame> {
    let mut series = Vec::with_capacity(chunk.columns().len());

    for (idx, (name, ty)) in chunk.columns().iter().zip(chunk.types()).enumerate() {
        let s = match ty {
            ColumnType::Int64 => {
                let values: Vec<Option<i64>> = chunk
                    .column(idx)
                    .map(|c| match c {
                        Cell::Int(i) => Some(*i),
                        _ => None,
                    })
                    .collect();
                Series::new(name.as_str(), values)
            }
            ColumnType::Float64 => {
                let values: Vec<Option<f64>> = chunk.column(idx).map(|c| c.as_f64()).collect();
                Series::new(name.as_str(), values)
            }
            ColumnType::Bool => {
                let values: Vec<Option<bool>> = chunk
                    .column(idx)
                    .map(|c| match c {
                        Cell::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect();
                Series::new(name.as_str(), values)
            }
            ColumnType::Object => {
                let values: Vec<Option<String>> = chunk
                    .column(idx)
                    .map(|c| (!c.is_null()).then(|| c.to_string()))
                    .collect();
                Series::new(name.as_str(), values)
            }
        };
        series.push(s);
    }

    Ok(DataFrame::new(series)?)
}

/// Write `df` as `<stem>_processed.csv` beside the source file.
pub fn write_processed(full_path: &Path, df: &mut DataFrame) -> Result<PathBuf> {
    let output_path = Workspace::processed_path(full_path);
    let mut file = File::create(&output_path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("Wrote {} rows to {}", df.height(), output_path.display());
    Ok(output_path)
}

/// Rows of `df` equal to an earlier row. Nulls compare equal to each other.
pub fn duplicated_row_count(df: &DataFrame) -> Result<usize> {
    let distinct = df
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::Any)
        .collect()?;
    Ok(df.height() - distinct.height())
}

/// Rows of `df` as JSON objects.
pub fn frame_to_records(df: &mut DataFrame) -> Result<Vec<Value>> {
    let mut buf = Vec::new();
    JsonWriter::new(&mut buf)
        .with_json_format(JsonFormat::Json)
        .finish(df)?;

    if buf.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_slice::<Value>(&buf)? {
        Value::Array(rows) => Ok(rows),
        other => Ok(vec![other]),
    }
}

/// The named column, or `ColumnNotFound`.
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|_| DatasetError::ColumnNotFound(name.to_string()))
}

/// The named column if it exists and holds numbers.
pub fn require_numeric<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    let series = require_column(df, name)?;
    if !series.dtype().is_numeric() {
        return Err(DatasetError::NonNumericColumn(name.to_string()));
    }
    Ok(series)
}

pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|s| s.dtype().is_numeric())
        .map(|s| s.name().to_string())
        .collect()
}

/// A JSON scalar as a polars literal.
pub fn json_literal(value: &Value) -> Result<Expr> {
    match value {
        Value::Bool(b) => Ok(lit(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(lit(i)),
            (None, Some(f)) => Ok(lit(f)),
            _ => Err(DatasetError::InvalidParameter(format!("Unsupported number: {}", n))),
        },
        Value::String(s) => Ok(lit(s.clone())),
        other => Err(DatasetError::InvalidParameter(format!(
            "Expected a scalar value, got {}",
            other
        ))),
    }
}
