//! # Document model
//!
//! A tree of elements and attributed text under named roots, addressed by
//! offset paths. Everything here is plain data: positions and ranges do not
//! borrow the tree, and the schema is owned by whoever owns the tree.

pub mod children;
pub mod data;
pub mod error;
pub mod id;
pub mod node;
pub mod position;
pub mod range;
pub mod schema;
pub mod selection;
pub mod tree;
pub mod walker;

pub use error::{ModelError, ModelResult};
pub use id::ElementId;
pub use node::{normalize_nodes, nodes_size, split_nodes, Attributes, Element, Node, Text, TEXT_NAME};
pub use position::Position;
pub use range::Range;
pub use schema::{Schema, SchemaItemDefinition};
pub use selection::{Selection, SelectionRange};
pub use tree::Tree;
pub use walker::{Direction, ElementShell, StepKind, TextProxy, TreeWalker, WalkerItem, WalkerOptions, WalkerValue};
