//! Error types for schema loading, feature mapping and inference

use std::path::PathBuf;
use thiserror::Error;

/// Dataset or metadata file could not be turned into a feature schema.
///
/// Fatal at startup.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("failed to read schema source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset has no data rows")]
    EmptyDataset,

    #[error("schema declares no input fields")]
    NoFields,

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

/// Model artifacts could not be loaded. Fatal at startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inconsistent model artifact: {0}")]
    Inconsistent(String),

    #[error("onnx runtime error: {0}")]
    Onnx(String),
}

/// The submitted values do not line up with what the models were fit on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureMappingError {
    #[error("submission is not a JSON object of field values: {0}")]
    MalformedPayload(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("missing value for field '{0}'")]
    MissingField(String),

    #[error("'{value}' is not an allowed value for '{field}'")]
    UnknownCategory { field: String, value: String },

    #[error("input fields do not match the schema (expected {expected:?}, got {actual:?})")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error(
        "feature columns do not match the model (missing {missing:?}, unexpected {unexpected:?})"
    )]
    ColumnMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("feature columns are not in the order the model expects")]
    ColumnOrder,
}

/// A predictor call failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("{model}: expected {expected} features, got {actual}")]
    DimensionMismatch {
        model: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{model}: column '{column}' has the wrong type")]
    ColumnType { model: &'static str, column: String },

    #[error("{model}: column '{column}' is missing from the record")]
    MissingColumn { model: &'static str, column: String },

    #[error("{0}: predictor returned no output")]
    EmptyOutput(&'static str),

    #[error("{model}: {message}")]
    Runtime { model: &'static str, message: String },
}

/// Per-submission failure returned from the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Mapping(#[from] FeatureMappingError),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl DispatchError {
    /// Short machine-readable kind, used in service replies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Mapping(_) => "feature_mapping",
            DispatchError::Prediction(_) => "prediction",
        }
    }
}
