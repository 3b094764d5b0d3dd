use quire_markup::MarkupError;
use thiserror::Error;

use crate::position::Position;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid position {position}: {reason}")]
    InvalidPosition { position: Position, reason: String },

    #[error("Invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("Offset {offset} is out of bounds (max {max})")]
    OffsetOutOfBounds { offset: usize, max: usize },

    #[error("Root `{0}` does not exist")]
    RootNotFound(String),

    #[error("Root `{0}` already exists")]
    DuplicateRoot(String),

    #[error("Selection ranges must not intersect")]
    IntersectingRanges,

    #[error("Schema item `{0}` is already registered")]
    DuplicateSchemaItem(String),

    #[error("Invalid model data: {0}")]
    InvalidData(String),

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),
}

impl ModelError {
    pub fn invalid_position(position: &Position, reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            position: position.clone(),
            reason: reason.into(),
        }
    }

    pub fn invalid_range(reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            reason: reason.into(),
        }
    }
}
