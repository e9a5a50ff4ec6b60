//! Dataset toolkit
//!
//! Inspection, fuzzy column matching and light transformation of tabular
//! datasets (CSV and Excel) kept under a single workspace directory.

pub mod column_matcher;
pub mod config;
pub mod error;
pub mod features;
pub mod frame;
pub mod header_cache;
pub mod histogram;
pub mod pipeline;
pub mod preprocess;
pub mod similarity;
pub mod summary;
pub mod table;
pub mod tool_system;
pub mod workspace;

pub use column_matcher::{ColumnMatch, ColumnMatcher, ColumnPatterns, PatternMatch};
pub use config::ToolkitConfig;
pub use error::{DatasetError, Result};
pub use header_cache::HeaderCache;
pub use histogram::Histogram;
pub use pipeline::PipelineStep;
pub use summary::{DatasetSummary, SummaryBuilder};
pub use tool_system::{DatasetToolkit, Tool, ToolCategory};
pub use workspace::{DatasetFormat, Workspace};
