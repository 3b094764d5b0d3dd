//! Error types for the markup parser

use std::ops::Range;

use thiserror::Error;

pub type MarkupResult<T> = Result<T, MarkupError>;

/// Byte range into the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("Unexpected token at {span:?}: expected {expected}, found {found}")]
    UnexpectedToken {
        span: TokenSpan,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input: expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("Mismatched closing tag at {span:?}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        span: TokenSpan,
        expected: String,
        found: String,
    },

    #[error("Invalid markup at {span:?}: {message}")]
    InvalidMarkup { span: TokenSpan, message: String },

    #[error("Lexer error at {span:?}: {message}")]
    LexError { span: TokenSpan, message: String },
}

impl MarkupError {
    pub fn unexpected_token(
        span: Range<usize>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            span: span.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
        }
    }

    pub fn invalid(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::InvalidMarkup {
            span: span.into(),
            message: message.into(),
        }
    }

    pub fn lex(span: Range<usize>, message: impl Into<String>) -> Self {
        Self::LexError {
            span: span.into(),
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<TokenSpan> {
        match self {
            MarkupError::UnexpectedToken { span, .. } => Some(*span),
            MarkupError::UnexpectedEof { .. } => None,
            MarkupError::MismatchedTag { span, .. } => Some(*span),
            MarkupError::InvalidMarkup { span, .. } => Some(*span),
            MarkupError::LexError { span, .. } => Some(*span),
        }
    }

    fn label(&self) -> String {
        match self {
            MarkupError::UnexpectedToken { expected, .. } => format!("expected {}", expected),
            MarkupError::UnexpectedEof { expected } => format!("expected {}", expected),
            MarkupError::MismatchedTag { expected, .. } => format!("expected </{}>", expected),
            MarkupError::InvalidMarkup { message, .. } => message.clone(),
            MarkupError::LexError { message, .. } => message.clone(),
        }
    }
}

/// Pretty-print an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &MarkupError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span().unwrap_or(TokenSpan {
        start: source.len().saturating_sub(1),
        end: source.len(),
    });

    let mut output = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, span.start..span.end))
                .with_color(Color::Red)
                .with_message(error.label()),
        )
        .finish()
        .write((filename, Source::from(source)), &mut output);

    match written {
        Ok(()) => String::from_utf8(output).unwrap_or_else(|_| error.to_string()),
        Err(_) => error.to_string(),
    }
}

/// Plain rendering when ariadne is compiled out.
#[cfg(not(feature = "pretty-errors"))]
pub fn format_error(_source: &str, filename: &str, error: &MarkupError) -> String {
    format!("{}: {} ({})", filename, error, error.label())
}
