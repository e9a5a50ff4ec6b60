use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Unsupported file type")]
    UnsupportedFileType,

    #[error("Could not load dataset headers")]
    HeaderReadFailure,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("Error loading sample from {path}: {cause}")]
    SampleLoad { path: String, cause: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Column '{0}' not found in the dataset.")]
    ColumnNotFound(String),

    #[error("Column '{0}' is not numeric.")]
    NonNumericColumn(String),

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("Please provide a value for the '{0}' strategy.")]
    MissingValue(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for DatasetError {
    fn from(err: polars::error::PolarsError) -> Self {
        DatasetError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
