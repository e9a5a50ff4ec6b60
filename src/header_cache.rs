//! Header Cache
//!
//! Maps a dataset path, exactly as the caller spelled it, to its column
//! names. Entries are filled on first access and never invalidated, so a
//! file rewritten on disk keeps reporting its old header. Two spellings of
//! one file are two entries.

use crate::table::read_header;
use crate::workspace::Workspace;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

pub struct HeaderCache {
    workspace: Workspace,
    entries: DashMap<String, Vec<String>>,
    /// Header rows actually read from disk
    reads: AtomicUsize,
}

impl HeaderCache {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            entries: DashMap::new(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Column names for `path`, or `None` if the file cannot be read or is
    /// not a supported dataset. Failures are logged, not raised.
    pub fn get_headers(&self, path: &str) -> Option<Vec<String>> {
        if let Some(hit) = self.entries.get(path) {
            return Some(hit.value().clone());
        }

        let (full_path, format) = match self.workspace.locate(path) {
            Ok(located) => located,
            Err(e) => {
                debug!("Not loading headers for {}: {}", path, e);
                return None;
            }
        };

        self.reads.fetch_add(1, Ordering::Relaxed);
        match read_header(&full_path, format) {
            Ok(headers) => {
                self.entries.insert(path.to_string(), headers.clone());
                Some(headers)
            }
            Err(e) => {
                warn!("Error loading headers for {}: {}", path, e);
                None
            }
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}
