//! Deltas group the operations of one logical edit.

use serde::{Deserialize, Serialize};

use crate::operation::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeltaKind {
    Insert,
    Remove,
    Move,
    Attribute,
    Rename,
    Split,
    Merge,
    Wrap,
    Unwrap,
    Marker,
}

impl DeltaKind {
    pub fn name(self) -> &'static str {
        match self {
            DeltaKind::Insert => "insert",
            DeltaKind::Remove => "remove",
            DeltaKind::Move => "move",
            DeltaKind::Attribute => "attribute",
            DeltaKind::Rename => "rename",
            DeltaKind::Split => "split",
            DeltaKind::Merge => "merge",
            DeltaKind::Wrap => "wrap",
            DeltaKind::Unwrap => "unwrap",
            DeltaKind::Marker => "marker",
        }
    }

    /// Kind of a delta holding just `operation`.
    pub fn for_operation(operation: &Operation) -> DeltaKind {
        match operation {
            Operation::Insert { .. } => DeltaKind::Insert,
            Operation::Remove { .. } => DeltaKind::Remove,
            Operation::Move { .. } => DeltaKind::Move,
            Operation::Rename { .. } => DeltaKind::Rename,
            Operation::AttributeChange { .. } => DeltaKind::Attribute,
            Operation::Split { .. } => DeltaKind::Split,
            Operation::Merge { .. } => DeltaKind::Merge,
            Operation::MarkerChange { .. } => DeltaKind::Marker,
        }
    }

    pub fn inverse(self) -> DeltaKind {
        match self {
            DeltaKind::Insert => DeltaKind::Remove,
            DeltaKind::Remove => DeltaKind::Insert,
            DeltaKind::Split => DeltaKind::Merge,
            DeltaKind::Merge => DeltaKind::Split,
            DeltaKind::Wrap => DeltaKind::Unwrap,
            DeltaKind::Unwrap => DeltaKind::Wrap,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub kind: DeltaKind,
    pub operations: Vec<Operation>,
}

impl Delta {
    pub fn new(kind: DeltaKind) -> Self {
        Self {
            kind,
            operations: Vec::new(),
        }
    }

    pub fn with_operations(kind: DeltaKind, operations: Vec<Operation>) -> Self {
        Self { kind, operations }
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Inverse operations in reverse order.
    pub fn inverse(&self) -> Delta {
        Delta {
            kind: self.kind.inverse(),
            operations: self.operations.iter().rev().map(Operation::inverse).collect(),
        }
    }
}
