//! Toolkit Configuration
//!
//! Workspace location and the sizes that bound each pass over a dataset.
//! Values come from the environment with fixed defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_WORKSPACE_DIR: &str = "datasets";
pub const DEFAULT_CHUNK_ROWS: usize = 10_000;
pub const DEFAULT_SAMPLE_ROWS: usize = 1_000;
pub const DEFAULT_SIMILARITY_THRESHOLD: i64 = 80;
pub const PATTERN_THRESHOLD: i64 = 70;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// Directory every dataset path is resolved against
    pub workspace_root: PathBuf,

    /// Rows per chunk for the streaming pass over line-delimited files
    pub chunk_rows: usize,

    /// Leading rows read for descriptive statistics
    pub sample_rows: usize,

    /// Default cut-off for ad-hoc column lookups (0-100)
    pub similarity_threshold: i64,

    /// Cut-off for the fixed domain pattern table (0-100)
    pub pattern_threshold: i64,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from(DEFAULT_WORKSPACE_DIR),
            chunk_rows: DEFAULT_CHUNK_ROWS,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            pattern_threshold: PATTERN_THRESHOLD,
        }
    }
}

impl ToolkitConfig {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Self::default()
        }
    }

    /// Build a config from `DATASETS_DIR`, `DATASETS_CHUNK_ROWS` and
    /// `DATASETS_SAMPLE_ROWS`. Unparseable or zero sizes fall back to defaults.
    pub fn from_env() -> Self {
        let workspace_root = std::env::var("DATASETS_DIR")
            .unwrap_or_else(|_| DEFAULT_WORKSPACE_DIR.to_string());

        Self {
            workspace_root: PathBuf::from(workspace_root),
            chunk_rows: env_usize("DATASETS_CHUNK_ROWS").unwrap_or(DEFAULT_CHUNK_ROWS),
            sample_rows: env_usize("DATASETS_SAMPLE_ROWS").unwrap_or(DEFAULT_SAMPLE_ROWS),
            ..Self::default()
        }
    }

    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    pub fn with_sample_rows(mut self, sample_rows: usize) -> Self {
        self.sample_rows = sample_rows;
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ToolkitConfig::default();
        assert_eq!(config.workspace_root, PathBuf::from("datasets"));
        assert_eq!(config.chunk_rows, 10_000);
        assert_eq!(config.sample_rows, 1_000);
        assert_eq!(config.similarity_threshold, 80);
        assert_eq!(config.pattern_threshold, 70);
    }

    #[test]
    fn test_chunk_rows_never_zero() {
        let config = ToolkitConfig::new("/tmp/ws").with_chunk_rows(0);
        assert_eq!(config.chunk_rows, 1);
    }
}
