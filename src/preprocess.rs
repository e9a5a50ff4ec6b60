//! Preprocessing - missing values and duplicate rows
//!
//! Both operations write a processed copy of the dataset and leave the
//! source untouched.

use crate::error::{DatasetError, Result};
use crate::frame::{json_literal, load_frame, numeric_columns, write_processed, TransformOutcome};
use crate::workspace::Workspace;
use polars::prelude::*;
use serde_json::Value;
use std::str::FromStr;
use tracing::info;

/// How to fill nulls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingValueStrategy {
    /// Column mean, numeric columns only
    Mean,
    /// Column median, numeric columns only
    Median,
    /// Most frequent value (smallest on ties), every column
    Mode,
    /// A caller-supplied value, every column
    Constant,
}

impl FromStr for MissingValueStrategy {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(MissingValueStrategy::Mean),
            "median" => Ok(MissingValueStrategy::Median),
            "mode" => Ok(MissingValueStrategy::Mode),
            "constant" => Ok(MissingValueStrategy::Constant),
            other => Err(DatasetError::InvalidStrategy(other.to_string())),
        }
    }
}

/// Fill the nulls of `df` according to `strategy`.
pub fn fill_missing(
    df: DataFrame,
    strategy: MissingValueStrategy,
    value: Option<&Value>,
) -> Result<DataFrame> {
    let all_columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();

    let exprs: Vec<Expr> = match strategy {
        MissingValueStrategy::Mean => numeric_columns(&df)
            .iter()
            .map(|c| col(c).fill_null(col(c).mean()))
            .collect(),
        MissingValueStrategy::Median => numeric_columns(&df)
            .iter()
            .map(|c| col(c).fill_null(col(c).median()))
            .collect(),
        MissingValueStrategy::Mode => all_columns
            .iter()
            .map(|c| col(c).fill_null(col(c).mode().min()))
            .collect(),
        MissingValueStrategy::Constant => {
            let fill = match value {
                Some(v) if !v.is_null() => json_literal(v)?,
                _ => return Err(DatasetError::MissingValue("constant".to_string())),
            };
            all_columns
                .iter()
                .map(|c| col(c).fill_null(fill.clone()))
                .collect()
        }
    };

    if exprs.is_empty() {
        return Ok(df);
    }
    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// Drop repeated rows, keeping the first occurrence in file order.
pub fn drop_duplicate_rows(df: DataFrame) -> Result<DataFrame> {
    Ok(df
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?)
}

pub fn handle_missing_values(
    workspace: &Workspace,
    path: &str,
    strategy: &str,
    value: Option<&Value>,
) -> Result<TransformOutcome> {
    let (full_path, format) = workspace.locate(path)?;
    let strategy = MissingValueStrategy::from_str(strategy)?;
    if strategy == MissingValueStrategy::Constant && value.map_or(true, Value::is_null) {
        return Err(DatasetError::MissingValue("constant".to_string()));
    }

    let df = load_frame(&full_path, format)?;
    let before: usize = df.get_columns().iter().map(|s| s.null_count()).sum();
    let mut filled = fill_missing(df, strategy, value)?;
    info!("Filled missing values in {} ({:?}, {} nulls before)", path, strategy, before);

    let output_path = write_processed(&full_path, &mut filled)?;
    Ok(TransformOutcome {
        message: format!(
            "Missing values handled successfully. The processed file is saved at {}",
            output_path.display()
        ),
        output_path: output_path.to_string_lossy().to_string(),
    })
}

pub fn remove_duplicates(workspace: &Workspace, path: &str) -> Result<TransformOutcome> {
    let (full_path, format) = workspace.locate(path)?;
    let df = load_frame(&full_path, format)?;
    let rows_before = df.height();

    let mut deduped = drop_duplicate_rows(df)?;
    info!(
        "Removed {} duplicate row(s) from {}",
        rows_before - deduped.height(),
        path
    );

    let output_path = write_processed(&full_path, &mut deduped)?;
    Ok(TransformOutcome {
        message: format!(
            "Duplicates removed successfully. The processed file is saved at {}",
            output_path.display()
        ),
        output_path: output_path.to_string_lossy().to_string(),
    })
}
