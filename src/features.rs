//! Feature construction

use crate::error::Result;
use crate::frame::{load_frame, require_numeric, write_processed, TransformOutcome};
use crate::workspace::Workspace;
use polars::prelude::*;
use tracing::info;

/// Name of the product column for `col1` and `col2`
pub fn interaction_name(col1: &str, col2: &str) -> String {
    format!("{}*{}", col1, col2)
}

/// Append `col1 * col2` to `df`. Both columns must be numeric.
pub fn add_interaction(df: DataFrame, col1: &str, col2: &str) -> Result<DataFrame> {
    require_numeric(&df, col1)?;
    require_numeric(&df, col2)?;

    let name = interaction_name(col1, col2);
    let out = df
        .lazy()
        .with_column((col(col1) * col(col2)).alias(&name))
        .collect()?;
    Ok(out)
}

pub fn create_interaction_terms(
    workspace: &Workspace,
    path: &str,
    col1: &str,
    col2: &str,
) -> Result<TransformOutcome> {
    let (full_path, format) = workspace.locate(path)?;
    let df = load_frame(&full_path, format)?;
    let mut out = add_interaction(df, col1, col2)?;
    info!("Added interaction term '{}' to {}", interaction_name(col1, col2), path);

    let output_path = write_processed(&full_path, &mut out)?;
    Ok(TransformOutcome {
        message: format!(
            "Interaction term created successfully. The processed file is saved at {}",
            output_path.display()
        ),
        output_path: output_path.to_string_lossy().to_string(),
    })
}
