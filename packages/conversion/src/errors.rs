use quire_editor::EditorError;
use quire_markup::MarkupError;
use quire_model::ModelError;
use thiserror::Error;

use crate::view::ViewId;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("Unknown conversion pipeline `{0}`")]
    UnknownPipeline(String),

    #[error("Model element `{0}` has no view element")]
    UnmappedElement(String),

    #[error("View node {0} does not exist")]
    ViewNodeNotFound(ViewId),

    #[error("View node {0} is not an element")]
    NotAViewElement(ViewId),
}

pub type ConversionResult<T> = Result<T, ConversionError>;
