//! Error types for the editor

use quire_model::ModelError;
use thiserror::Error;

use crate::operation::OperationError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// An operation inside a delta failed; everything before it was rolled back.
    #[error("Operation {index} ({kind}) failed: {source}")]
    Operation {
        index: usize,
        kind: &'static str,
        #[source]
        source: OperationError,
    },

    #[error("`{child}` is not allowed in `{parent}`")]
    SchemaViolation { parent: String, child: String },

    #[error("Marker `{0}` already exists")]
    MarkerExists(String),

    #[error("Marker `{0}` does not exist")]
    MarkerNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<OperationError> for EditorError {
    fn from(source: OperationError) -> Self {
        EditorError::Operation {
            index: 0,
            kind: "operation",
            source,
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
