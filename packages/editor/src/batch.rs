//! Batches: the unit of undo.

use serde::{Deserialize, Serialize};

use crate::delta::Delta;
use crate::operation::Operation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BatchType {
    /// Recorded in the undo history.
    #[default]
    Default,
    /// Applied but never offered for undo (remote changes, setup).
    Transparent,
    /// Reverts the listed batch.
    Undo { reverts: BatchId },
    /// Reapplies what the listed undo batch reverted.
    Redo { reverts: BatchId },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Option<BatchId>,
    pub batch_type: BatchType,
    pub deltas: Vec<Delta>,
    pub description: Option<String>,
}

impl Batch {
    pub fn new(batch_type: BatchType) -> Self {
        Self {
            batch_type,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.iter().all(Delta::is_empty)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.deltas.iter().flat_map(|delta| delta.operations.iter())
    }

    pub fn operation_count(&self) -> usize {
        self.deltas.iter().map(|delta| delta.operations.len()).sum()
    }

    /// Undo-able batches end up in the history.
    pub fn is_undoable(&self) -> bool {
        !matches!(self.batch_type, BatchType::Transparent)
    }
}
