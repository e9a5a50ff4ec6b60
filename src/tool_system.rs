//! Tool system
//!
//! `DatasetToolkit` owns the workspace, the shared header cache and the
//! summary builder, and exposes every dataset operation twice: as a typed
//! method, and as a named tool taking and returning JSON. The JSON surface
//! never fails; any error comes back as `{"error": "<message>"}`.

use crate::column_matcher::{ColumnMatch, ColumnMatcher, ColumnPatterns};
use crate::config::ToolkitConfig;
use crate::error::{DatasetError, Result};
use crate::features;
use crate::frame::TransformOutcome;
use crate::header_cache::HeaderCache;
use crate::histogram::{self, Histogram};
use crate::pipeline::{self, PipelineStep};
use crate::preprocess;
use crate::summary::{DatasetSummary, SummaryBuilder};
use crate::table::read_head;
use crate::workspace::Workspace;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    pub category: ToolCategory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolCategory {
    Inspection,
    Matching,
    Transformation,
    Analysis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub parameter_type: ParameterType,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ParameterType {
    String,
    Integer,
    Number,
    /// Any JSON scalar
    Scalar,
    Array(String),
    Object(HashMap<String, ParameterType>),
}

impl ToolParameter {
    fn new(name: &str, description: &str, parameter_type: ParameterType, required: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameter_type,
            required,
        }
    }
}

fn file_path_param() -> ToolParameter {
    ToolParameter::new(
        "file_path",
        "Dataset path relative to the workspace (.csv, .xlsx or .xls)",
        ParameterType::String,
        true,
    )
}

fn tool(name: &str, description: &str, category: ToolCategory, parameters: Vec<ToolParameter>) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
        category,
    }
}

fn catalog() -> Vec<Tool> {
    vec![
        tool(
            "list_datasets",
            "List the CSV dataset file names found anywhere under the workspace.",
            ToolCategory::Inspection,
            vec![],
        ),
        tool(
            "get_dataset_info",
            "Summarize a dataset: shape, memory estimate, null counts and percentages, duplicate rows, column types, and descriptive statistics. Statistics are computed from a leading sample of rows, not the full file.",
            ToolCategory::Inspection,
            vec![file_path_param()],
        ),
        tool(
            "get_data_sample",
            "Return the first rows of a dataset as row objects.",
            ToolCategory::Inspection,
            vec![
                file_path_param(),
                ToolParameter::new("n_rows", "Number of rows, default 5", ParameterType::Integer, false),
            ],
        ),
        tool(
            "find_similar_columns",
            "Find columns across all CSV datasets whose names resemble a target name, best match first.",
            ToolCategory::Matching,
            vec![
                ToolParameter::new("target_column", "Column name to look for", ParameterType::String, true),
                ToolParameter::new(
                    "threshold",
                    "Minimum similarity score 0-100, default 80",
                    ParameterType::Integer,
                    false,
                ),
            ],
        ),
        tool(
            "get_column_patterns",
            "Group the columns of all CSV datasets under common experiment patterns (cell_line, drug, dose, time, viability, gene, expression).",
            ToolCategory::Matching,
            vec![],
        ),
        tool(
            "handle_missing_values",
            "Fill missing values and save the result as <name>_processed.csv. Strategies: mean, median (numeric columns), mode, constant (every column).",
            ToolCategory::Transformation,
            vec![
                file_path_param(),
                ToolParameter::new("strategy", "mean, median, mode or constant; default mean", ParameterType::String, false),
                ToolParameter::new("value", "Fill value for the constant strategy", ParameterType::Scalar, false),
            ],
        ),
        tool(
            "remove_duplicates",
            "Drop repeated rows, keeping the first occurrence, and save the result as <name>_processed.csv.",
            ToolCategory::Transformation,
            vec![file_path_param()],
        ),
        tool(
            "create_interaction_terms",
            "Add the product of two numeric columns as '<col1>*<col2>' and save the result as <name>_processed.csv.",
            ToolCategory::Transformation,
            vec![
                file_path_param(),
                ToolParameter::new("col1", "First numeric column", ParameterType::String, true),
                ToolParameter::new("col2", "Second numeric column", ParameterType::String, true),
            ],
        ),
        tool(
            "histogram",
            "Equal-width bin counts for a numeric column.",
            ToolCategory::Analysis,
            vec![
                file_path_param(),
                ToolParameter::new("column", "Numeric column", ParameterType::String, true),
                ToolParameter::new("bins", "Number of bins, default 10", ParameterType::Integer, false),
            ],
        ),
        tool(
            "run_pipeline",
            "Run a list of table steps (select, drop, rename, filter, sort, head, drop_nulls, unique, derive, aggregate) on a copy of a dataset and return the resulting rows.",
            ToolCategory::Analysis,
            vec![
                file_path_param(),
                ToolParameter::new(
                    "steps",
                    "Step objects, each tagged with \"op\"",
                    ParameterType::Array("object".to_string()),
                    true,
                ),
            ],
        ),
    ]
}

#[derive(Deserialize)]
struct PathParams {
    file_path: String,
}

#[derive(Deserialize)]
struct SampleParams {
    file_path: String,
    #[serde(default = "default_n_rows")]
    n_rows: usize,
}

fn default_n_rows() -> usize {
    5
}

#[derive(Deserialize)]
struct SimilarParams {
    target_column: String,
    #[serde(default)]
    threshold: Option<i64>,
}

#[derive(Deserialize)]
struct MissingParams {
    file_path: String,
    #[serde(default = "default_strategy")]
    strategy: String,
    #[serde(default)]
    value: Option<Value>,
}

fn default_strategy() -> String {
    "mean".to_string()
}

#[derive(Deserialize)]
struct InteractionParams {
    file_path: String,
    col1: String,
    col2: String,
}

#[derive(Deserialize)]
struct HistogramParams {
    file_path: String,
    column: String,
    #[serde(default = "default_bins")]
    bins: usize,
}

fn default_bins() -> usize {
    10
}

#[derive(Deserialize)]
struct PipelineParams {
    file_path: String,
    steps: Value,
}

fn params<T: DeserializeOwned>(tool: &str, value: &Value) -> Result<T> {
    // tools without parameters accept null as well as {}
    let value = if value.is_null() { json!({}) } else { value.clone() };
    serde_json::from_value(value)
        .map_err(|e| DatasetError::InvalidParameter(format!("{}: {}", tool, e)))
}

/// Message reported at the tool surface. Expected conditions keep their
/// own wording; everything else is wrapped.
pub fn tool_error_message(err: &DatasetError) -> String {
    match err {
        DatasetError::UnsupportedFileType
        | DatasetError::HeaderReadFailure
        | DatasetError::ColumnNotFound(_)
        | DatasetError::NonNumericColumn(_)
        | DatasetError::InvalidStrategy(_)
        | DatasetError::MissingValue(_)
        | DatasetError::InvalidParameter(_)
        | DatasetError::UnknownTool(_)
        | DatasetError::SampleLoad { .. } => err.to_string(),
        other => format!("An error occurred: {}", other),
    }
}

pub struct DatasetToolkit {
    config: ToolkitConfig,
    headers: HeaderCache,
    summaries: SummaryBuilder,
    tools: Vec<Tool>,
}

impl DatasetToolkit {
    pub fn new(config: ToolkitConfig) -> Self {
        let headers = HeaderCache::new(Workspace::new(config.workspace_root.clone()));
        let summaries = SummaryBuilder::new(&config);
        Self {
            config,
            headers,
            summaries,
            tools: catalog(),
        }
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        self.headers.workspace()
    }

    pub fn header_cache(&self) -> &HeaderCache {
        &self.headers
    }

    pub fn get_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn list_tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn list_datasets(&self) -> Vec<String> {
        self.workspace().list_datasets()
    }

    pub fn get_dataset_info(&self, path: &str) -> Result<DatasetSummary> {
        self.summaries.build(&self.headers, path)
    }

    pub fn get_data_sample(&self, path: &str, n_rows: usize) -> Result<Vec<Value>> {
        let (full_path, format) = self.workspace().locate(path)?;
        let head = read_head(&full_path, format, n_rows).map_err(|e| DatasetError::SampleLoad {
            path: path.to_string(),
            cause: e.to_string(),
        })?;
        Ok(head.to_records())
    }

    pub fn find_similar_columns(&self, target: &str, threshold: Option<i64>) -> Vec<ColumnMatch> {
        let threshold = threshold.unwrap_or(self.config.similarity_threshold);
        self.matcher().find_similar_columns(target, threshold)
    }

    pub fn get_column_patterns(&self) -> ColumnPatterns {
        self.matcher().get_column_patterns()
    }

    pub fn handle_missing_values(
        &self,
        path: &str,
        strategy: &str,
        value: Option<&Value>,
    ) -> Result<TransformOutcome> {
        preprocess::handle_missing_values(self.workspace(), path, strategy, value)
    }

    pub fn remove_duplicates(&self, path: &str) -> Result<TransformOutcome> {
        preprocess::remove_duplicates(self.workspace(), path)
    }

    pub fn create_interaction_terms(&self, path: &str, col1: &str, col2: &str) -> Result<TransformOutcome> {
        features::create_interaction_terms(self.workspace(), path, col1, col2)
    }

    pub fn histogram(&self, path: &str, column: &str, bins: usize) -> Result<Histogram> {
        histogram::histogram(self.workspace(), path, column, bins)
    }

    pub fn run_pipeline(&self, path: &str, steps: &[PipelineStep]) -> Result<Vec<Value>> {
        pipeline::run_pipeline(self.workspace(), path, steps)
    }

    fn matcher(&self) -> ColumnMatcher<'_> {
        ColumnMatcher::new(&self.headers, self.config.pattern_threshold)
    }

    /// Invoke a tool by name with JSON parameters.
    pub fn call(&self, name: &str, parameters: &Value) -> Value {
        debug!("Calling tool {} with {}", name, parameters);
        match self.dispatch(name, parameters) {
            Ok(value) => value,
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                json!({ "error": tool_error_message(&e) })
            }
        }
    }

    fn dispatch(&self, name: &str, parameters: &Value) -> Result<Value> {
        let value = match name {
            "list_datasets" => serde_json::to_value(self.list_datasets())?,
            "get_dataset_info" => {
                let p: PathParams = params(name, parameters)?;
                serde_json::to_value(self.get_dataset_info(&p.file_path)?)?
            }
            "get_data_sample" => {
                let p: SampleParams = params(name, parameters)?;
                Value::Array(self.get_data_sample(&p.file_path, p.n_rows)?)
            }
            "find_similar_columns" => {
                let p: SimilarParams = params(name, parameters)?;
                serde_json::to_value(self.find_similar_columns(&p.target_column, p.threshold))?
            }
            "get_column_patterns" => serde_json::to_value(self.get_column_patterns())?,
            "handle_missing_values" => {
                let p: MissingParams = params(name, parameters)?;
                serde_json::to_value(self.handle_missing_values(
                    &p.file_path,
                    &p.strategy,
                    p.value.as_ref(),
                )?)?
            }
            "remove_duplicates" => {
                let p: PathParams = params(name, parameters)?;
                serde_json::to_value(self.remove_duplicates(&p.file_path)?)?
            }
            "create_interaction_terms" => {
                let p: InteractionParams = params(name, parameters)?;
                serde_json::to_value(self.create_interaction_terms(&p.file_path, &p.col1, &p.col2)?)?
            }
            "histogram" => {
                let p: HistogramParams = params(name, parameters)?;
                serde_json::to_value(self.histogram(&p.file_path, &p.column, p.bins)?)?
            }
            "run_pipeline" => {
                let p: PipelineParams = params(name, parameters)?;
                let steps = pipeline::parse_steps(&p.steps)?;
                Value::Array(self.run_pipeline(&p.file_path, &steps)?)
            }
            other => return Err(DatasetError::UnknownTool(other.to_string())),
        };
        info!("Tool {} completed", name);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn toolkit() -> (tempfile::TempDir, DatasetToolkit) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "dose,response,name\n1,0.5,x\n2,,y\n3,0.7,z\n").unwrap();
        let toolkit = DatasetToolkit::new(ToolkitConfig::new(dir.path()));
        (dir, toolkit)
    }

    #[test]
    fn test_catalog_covers_dispatch() {
        let (_dir, toolkit) = toolkit();
        assert_eq!(toolkit.list_tools().len(), 10);
        for tool in toolkit.list_tools() {
            let out = toolkit.call(&tool.name, &json!({}));
            // missing parameters are reported, never an unknown tool
            if let Some(err) = out.get("error").and_then(|e| e.as_str()) {
                assert!(!err.starts_with("Unknown tool"), "{}", tool.name);
            }
        }
        let sample = toolkit.get_tool("get_data_sample").unwrap();
        assert_eq!(sample.category, ToolCategory::Inspection);
        assert!(sample.parameters.iter().any(|p| p.name == "n_rows" && !p.required));
    }

    #[test]
    fn test_unknown_tool_and_bad_params() {
        let (_dir, toolkit) = toolkit();
        assert_eq!(
            toolkit.call("plot_histogram", &json!({})),
            json!({"error": "Unknown tool: plot_histogram"})
        );
        let out = toolkit.call("get_data_sample", &json!({"file_path": 3}));
        assert!(out["error"].as_str().unwrap().starts_with("Invalid parameter"));
    }

    #[test]
    fn test_dataset_info_error_messages() {
        let (dir, toolkit) = toolkit();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(
            toolkit.call("get_dataset_info", &json!({"file_path": "notes.txt"})),
            json!({"error": "Unsupported file type"})
        );
        assert_eq!(
            toolkit.call("get_dataset_info", &json!({"file_path": "missing.csv"})),
            json!({"error": "Could not load dataset headers"})
        );
    }

    #[test]
    fn test_sample_defaults_to_five_rows() {
        let dir = tempfile::tempdir().unwrap();
        let body: String = std::iter::once("n\n".to_string())
            .chain((0..8).map(|i| format!("{}\n", i)))
            .collect();
        fs::write(dir.path().join("n.csv"), body).unwrap();
        let toolkit = DatasetToolkit::new(ToolkitConfig::new(dir.path()));

        let out = toolkit.call("get_data_sample", &json!({"file_path": "n.csv"}));
        assert_eq!(out.as_array().unwrap().len(), 5);
        assert_eq!(out[0], json!({"n": 0}));
    }

    #[test]
    fn test_similar_columns_uses_configured_threshold() {
        let (_dir, toolkit) = toolkit();
        let out = toolkit.call("find_similar_columns", &json!({"target_column": "Dose"}));
        assert_eq!(out.as_array().unwrap().len(), 1);
        assert_eq!(out[0]["column"], "dose");
        assert_eq!(out[0]["similarity_score"], 100);
        assert_eq!(out[0]["dataset"], "a.csv");
    }

    #[test]
    fn test_missing_value_errors() {
        let (_dir, toolkit) = toolkit();
        assert_eq!(
            toolkit.call(
                "handle_missing_values",
                &json!({"file_path": "a.csv", "strategy": "constant"})
            ),
            json!({"error": "Please provide a value for the 'constant' strategy."})
        );
        assert_eq!(
            toolkit.call(
                "handle_missing_values",
                &json!({"file_path": "a.csv", "strategy": "zero"})
            ),
            json!({"error": "Invalid strategy: zero"})
        );
    }

    #[test]
    fn test_sample_load_errors_name_the_file() {
        let (_dir, toolkit) = toolkit();
        let out = toolkit.call("get_data_sample", &json!({"file_path": "missing.csv"}));
        assert!(out["error"]
            .as_str()
            .unwrap()
            .starts_with("Error loading sample from missing.csv: "));
        assert_eq!(
            toolkit.call("get_data_sample", &json!({"file_path": "a.json"})),
            json!({"error": "Unsupported file type"})
        );
    }

    #[test]
    fn test_pipeline_steps_are_validated() {
        let (_dir, toolkit) = toolkit();
        let out = toolkit.call(
            "run_pipeline",
            &json!({"file_path": "a.csv", "steps": [{"op": "exec", "code": "1+1"}]}),
        );
        assert!(out["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid parameter: Invalid pipeline: "));
        let rows = toolkit.call(
            "run_pipeline",
            &json!({"file_path": "a.csv", "steps": [{"op": "head", "n": 1}]}),
        );
        assert_eq!(rows.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_io_errors_are_wrapped() {
        let (_dir, toolkit) = toolkit();
        let out = toolkit.call("remove_duplicates", &json!({"file_path": "missing.csv"}));
        assert!(out["error"].as_str().unwrap().starts_with("An error occurred: "));
    }
}
