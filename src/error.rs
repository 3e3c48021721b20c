//! Error types for foldwise

use thiserror::Error;

/// Result type alias for foldwise operations
pub type Result<T> = std::result::Result<T, FoldwiseError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum FoldwiseError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Schema mismatch: expected test features {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Arity mismatch: {models} models but {params} parameter sets")]
    ArityMismatch { models: usize, params: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Column not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl From<polars::error::PolarsError> for FoldwiseError {
    fn from(err: polars::error::PolarsError) -> Self {
        FoldwiseError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FoldwiseError {
    fn from(err: serde_json::Error) -> Self {
        FoldwiseError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FoldwiseError {
    fn from(err: ndarray::ShapeError) -> Self {
        FoldwiseError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
