//! # Edit Session Management
//!
//! One client's view of a shared document. Local changes are applied
//! immediately and kept as pending until the server confirms them; remote
//! operations are transformed over whatever is still pending before they
//! are applied.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::batch::BatchType;
use crate::delta::{Delta, DeltaKind};
use crate::document::Document;
use crate::errors::EditorResult;
use crate::operation::Operation;
use crate::transform::{transform_sets, transform_through};
use crate::writer::Writer;

pub struct EditSession {
    /// Unique session identifier
    pub id: String,

    pub document: Document,

    /// Local changes not yet acknowledged, oldest first
    pub pending: Vec<PendingChange>,

    next_change: usize,
}

/// Local change waiting for server acknowledgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    pub id: String,
    pub operations: Vec<Operation>,
    pub timestamp: u64,
}

impl EditSession {
    pub fn new(id: impl Into<String>, document: Document) -> Self {
        Self {
            id: id.into(),
            document,
            pending: Vec::new(),
            next_change: 0,
        }
    }

    /// Apply a local edit and keep it pending. Returns the change id to send
    /// along with the operations.
    pub fn apply_local(&mut self, callback: impl FnOnce(&mut Writer<'_>) -> EditorResult<()>) -> EditorResult<String> {
        let mut batch = self.document.batch(BatchType::Default);
        let result = self.document.change_in(&mut batch, callback);
        let operations: Vec<Operation> = batch.operations().cloned().collect();
        self.document.commit(batch);
        result?;
        Ok(self.push_pending(operations))
    }

    /// Apply a prepared delta optimistically.
    pub fn apply_optimistic(&mut self, delta: Delta) -> EditorResult<String> {
        let mut batch = self.document.batch(BatchType::Default);
        self.document.apply_delta(&mut batch, delta)?;
        let operations: Vec<Operation> = batch.operations().cloned().collect();
        self.document.commit(batch);
        Ok(self.push_pending(operations))
    }

    fn push_pending(&mut self, operations: Vec<Operation>) -> String {
        let id = format!("{}-{}", self.id, self.next_change);
        self.next_change += 1;
        self.pending.push(PendingChange {
            id: id.clone(),
            operations,
            timestamp: current_timestamp(),
        });
        id
    }

    /// Apply operations another client made against the state the server
    /// had before our pending changes. Remote operations win ties.
    pub fn receive_remote(&mut self, operations: &[Operation]) -> EditorResult<()> {
        let mut remote = operations.to_vec();
        for change in &mut self.pending {
            let (local, rest) = transform_sets(&change.operations, &remote, false);
            change.operations = local;
            remote = rest;
        }

        debug!(session = %self.id, ops = remote.len(), "Applying remote operations");
        let mut batch = self.document.batch(BatchType::Transparent);
        for operation in remote {
            let kind = DeltaKind::for_operation(&operation);
            self.document
                .apply_delta(&mut batch, Delta::with_operations(kind, vec![operation]))?;
        }
        self.document.commit(batch);
        Ok(())
    }

    /// The server accepted a change.
    pub fn confirm(&mut self, change_id: &str) {
        self.pending.retain(|change| change.id != change_id);
    }

    /// The server refused a change: revert it locally.
    pub fn reject(&mut self, change_id: &str) -> EditorResult<()> {
        let Some(index) = self.pending.iter().position(|change| change.id == change_id) else {
            return Ok(());
        };
        let rejected = self.pending.remove(index);

        let mut inverse: Vec<Operation> = rejected.operations.iter().rev().map(Operation::inverse).collect();
        for change in &mut self.pending[index..] {
            let (reverted, later) = transform_sets(&inverse, &change.operations, true);
            inverse = reverted;
            change.operations = later;
        }

        let mut batch = self.document.batch(BatchType::Transparent);
        for operation in inverse {
            let kind = DeltaKind::for_operation(&operation);
            self.document
                .apply_delta(&mut batch, Delta::with_operations(kind, vec![operation]))?;
        }
        self.document.commit(batch);
        Ok(())
    }

    /// Replace the document with the server's copy and replay pending
    /// changes on top. Changes that no longer apply are dropped.
    pub fn rebase(&mut self, server_document: Document) -> EditorResult<()> {
        let pending = std::mem::take(&mut self.pending);
        self.document = server_document;

        let mut dropped: Vec<Operation> = Vec::new();
        for mut change in pending {
            let operations: Vec<Operation> = change
                .operations
                .iter()
                .flat_map(|operation| transform_through(operation, &dropped, true))
                .collect();

            let mut batch = self.document.batch(BatchType::Transparent);
            let applied = operations.iter().try_for_each(|operation| {
                let kind = DeltaKind::for_operation(operation);
                self.document
                    .apply_delta(&mut batch, Delta::with_operations(kind, vec![operation.clone()]))
            });
            match applied {
                Ok(()) => {
                    change.operations = batch.operations().cloned().collect();
                    self.pending.push(change);
                }
                Err(err) => {
                    warn!(change = %change.id, error = %err, "Dropping pending change during rebase");
                    let done: Vec<Operation> = batch.operations().cloned().collect();
                    for operation in done.iter().rev() {
                        let kind = DeltaKind::for_operation(operation);
                        self.document.apply_delta(
                            &mut batch,
                            Delta::with_operations(kind, vec![operation.inverse()]),
                        )?;
                    }
                    dropped.extend(change.operations);
                }
            }
            self.document.commit(batch);
        }
        Ok(())
    }

    /// Get number of pending changes
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_model::{Position, Schema, SchemaItemDefinition};

    fn session(markup: &str) -> EditSession {
        let mut schema = Schema::new();
        schema
            .register("paragraph", SchemaItemDefinition::new().inherit_all_from("$block"))
            .unwrap();
        let mut doc = Document::new(schema);
        doc.create_root("main", "$root").unwrap();
        doc.set_data("main", markup).unwrap();
        EditSession::new("client-1", doc)
    }

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    #[test]
    fn test_session_creation() {
        let session = session("<paragraph>foo</paragraph>");
        assert_eq!(session.id, "client-1");
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_local_changes_are_pending_until_confirmed() {
        let mut session = session("<paragraph>foo</paragraph>");
        let id = session
            .apply_local(|writer| writer.insert_text("x", &pos(&[0, 0]), None))
            .unwrap();
        assert_eq!(id, "client-1-0");
        assert_eq!(session.pending_count(), 1);

        session.confirm(&id);
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_remote_operations_are_transformed_over_pending() {
        let mut session = session("<paragraph>foo</paragraph>");
        session
            .apply_local(|writer| writer.insert_text("ab", &pos(&[0, 0]), None))
            .unwrap();

        let remote = Operation::Insert {
            position: pos(&[0, 3]),
            nodes: vec![quire_model::Text::new("!").into()],
        };
        session.receive_remote(&[remote]).unwrap();

        assert_eq!(
            session.document.get_content("main").unwrap(),
            "<paragraph>abfoo!</paragraph>"
        );
        assert_eq!(session.pending_count(), 1);
    }

    #[test]
    fn test_reject_reverts_change() {
        let mut session = session("<paragraph>foo</paragraph>");
        let first = session
            .apply_local(|writer| writer.insert_text("a", &pos(&[0, 0]), None))
            .unwrap();
        session
            .apply_local(|writer| writer.insert_text("z", &pos(&[0, 4]), None))
            .unwrap();

        session.reject(&first).unwrap();
        assert_eq!(session.document.get_content("main").unwrap(), "<paragraph>fooz</paragraph>");
        assert_eq!(session.pending_count(), 1);
    }
}
