//! Workspace - dataset path resolution and discovery
//!
//! Every dataset reference is a path relative to the workspace root. Only
//! `.csv`, `.xlsx` and `.xls` files are datasets.

use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// On-disk layout of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetFormat {
    /// Line-delimited, read in chunks
    Csv,
    /// Spreadsheet workbook, read whole (first sheet)
    Excel,
}

impl DatasetFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(DatasetFormat::Csv),
            Some("xlsx") | Some("xls") => Ok(DatasetFormat::Excel),
            _ => Err(DatasetError::UnsupportedFileType),
        }
    }
}

/// A CSV file found under the workspace root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDataset {
    /// File name only, e.g. `trial.csv`
    pub name: String,
    /// Path relative to the workspace root; the header cache key
    pub relative_path: String,
    /// Root-joined path as shown to callers
    pub full_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a caller-supplied path onto the root. An absolute path replaces
    /// the root entirely.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Resolve a path and check that its extension names a supported format.
    pub fn locate(&self, path: &str) -> Result<(PathBuf, DatasetFormat)> {
        let full_path = self.resolve(path);
        let format = DatasetFormat::from_path(&full_path)?;
        Ok((full_path, format))
    }

    /// Recursively find `*.csv` files, sorted by path. Spreadsheets are not
    /// part of this enumeration. A missing root yields an empty list.
    pub fn discover_csv(&self) -> Vec<DiscoveredDataset> {
        let mut found = Vec::new();

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable workspace entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let is_csv = entry.path().extension().and_then(|e| e.to_str()) == Some("csv");
            if !is_csv {
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            found.push(DiscoveredDataset {
                name: entry.file_name().to_string_lossy().to_string(),
                relative_path,
                full_path: entry.path().to_path_buf(),
            });
        }

        found
    }

    /// File names of every discoverable CSV dataset.
    pub fn list_datasets(&self) -> Vec<String> {
        self.discover_csv().into_iter().map(|d| d.name).collect()
    }

    /// Sibling output path `<stem>_processed.csv` for a transformed dataset.
    pub fn processed_path(full_path: &Path) -> PathBuf {
        let stem = full_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        full_path.with_file_name(format!("{}_processed.csv", stem))
    }
}
