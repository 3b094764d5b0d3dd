//! # Undo/Redo History
//!
//! Tracks committed batches so they can be reverted.
//!
//! ## Design
//!
//! - Only `Default` batches are recorded; transparent batches never are
//! - Undo reverts a batch by applying its inverse as a new `Undo` batch,
//!   which moves to the redo stack
//! - Redo reverts that undo batch in turn, producing a `Redo` batch that
//!   goes back on the undo stack
//! - Recording a new batch clears the redo stack
//! - A batch and the batch that reverted it cancel out; later reverts skip
//!   both when transforming against the operation log
//!
//! The reverting itself lives on [`Document`](crate::Document), which owns
//! the operation log.

use std::collections::HashSet;

use crate::batch::{Batch, BatchId};

#[derive(Debug)]
pub struct History {
    /// Batches that can be undone (most recent last)
    undo_stack: Vec<Batch>,

    /// Undo batches that can be redone (most recent last)
    redo_stack: Vec<Batch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    canceled: HashSet<BatchId>,
}

impl History {
    /// Create a history with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            canceled: HashSet::new(),
        }
    }

    /// Record a new user batch. Invalidates everything that could be redone.
    pub fn record(&mut self, batch: Batch) {
        self.push_undo(batch);
        self.redo_stack.clear();
    }

    pub(crate) fn push_undo(&mut self, batch: Batch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }
    }

    pub(crate) fn push_redo(&mut self, batch: Batch) {
        self.redo_stack.push(batch);
    }

    pub(crate) fn pop_undo(&mut self) -> Option<Batch> {
        self.undo_stack.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Batch> {
        self.redo_stack.pop()
    }

    /// Mark a batch and the batch that reverted it as canceling out.
    pub(crate) fn cancel(&mut self, reverted: BatchId, reverting: BatchId) {
        self.canceled.insert(reverted);
        self.canceled.insert(reverting);
    }

    pub fn is_canceled(&self, id: BatchId) -> bool {
        self.canceled.contains(&id)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.canceled.clear();
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    /// Oldest batch still reachable through undo or redo.
    pub(crate) fn oldest_batch(&self) -> Option<BatchId> {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .filter_map(|batch| batch.id)
            .min()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchType;

    fn batch(id: u64) -> Batch {
        Batch {
            id: Some(BatchId(id)),
            ..Batch::new(BatchType::Default)
        }
    }

    #[test]
    fn test_history_creation() {
        let history = History::new();
        assert_eq!(history.undo_levels(), 0);
        assert_eq!(history.redo_levels(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.max_levels(), 100);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new();
        history.record(batch(1));
        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        assert!(history.can_redo());

        history.record(batch(2));
        assert!(!history.can_redo());
        assert_eq!(history.undo_levels(), 1);
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut history = History::with_max_levels(2);
        for id in 0..3 {
            history.record(batch(id));
        }
        assert_eq!(history.undo_levels(), 2);
        assert_eq!(history.oldest_batch(), Some(BatchId(1)));
    }

    #[test]
    fn test_descriptions() {
        let mut history = History::new();
        history.record(batch(1).with_description("Type text"));
        assert_eq!(history.undo_description(), Some("Type text"));
        assert_eq!(history.redo_description(), None);
    }
}
