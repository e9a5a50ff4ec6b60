//! Histogram - equal-width binning of a numeric column
//!
//! Bins are `bins` equal-width intervals spanning
//! `[min, max]`, each half-open except the last, which also holds `max`.
//! A constant column spans `[v - 0.5, v + 0.5]`; an all-null column
//! spans `[0, 1]`.

use crate::error::{DatasetError, Result};
use crate::frame::{load_frame, require_numeric};
use crate::workspace::Workspace;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub column: String,
    pub bin_edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn from_values(column: &str, values: &[f64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(DatasetError::InvalidParameter(
                "bins must be a positive integer".to_string(),
            ));
        }

        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if values.is_empty() {
            lo = 0.0;
            hi = 1.0;
        } else if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let mut bin_edges: Vec<f64> = (0..bins).map(|i| lo + width * i as f64).collect();
        bin_edges.push(hi);

        let mut counts = vec![0u64; bins];
        for v in values {
            let idx = (((v - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(Self {
            column: column.to_string(),
            bin_edges,
            counts,
        })
    }
}

pub fn histogram(workspace: &Workspace, path: &str, column: &str, bins: usize) -> Result<Histogram> {
    let (full_path, format) = workspace.locate(path)?;
    let df = load_frame(&full_path, format)?;
    let series = require_numeric(&df, column)?.cast(&DataType::Float64)?;

    let values: Vec<f64> = series.f64()?.into_iter().flatten().filter(|v| v.is_finite()).collect();
    debug!("Histogram of {}.{} over {} value(s)", path, column, values.len());
    Histogram::from_values(column, &values, bins)
}
