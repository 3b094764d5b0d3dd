//! Tag markup used for model data, view data and test fixtures.
//!
//! The grammar is a small XML-like subset: elements with quoted attributes,
//! text, self-closing tags and, optionally, `[` / `]` selection markers.

pub mod ast;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::*;
pub use error::*;
pub use parser::{decode_entities, parse, parse_with, ParseOptions};
pub use serializer::{escape_attribute, escape_text, serialize, serialize_with, SerializeOptions};
