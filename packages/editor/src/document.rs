//! # Document
//!
//! The editable model: the tree, its schema, the selection, markers and
//! live ranges, plus the record of every applied operation.
//!
//! ## Lifecycle
//!
//! ```text
//! Writer → Delta → apply_delta → Operation::apply → live state follows → "change" event
//!                                                                      ↓
//!                                             commit(batch) → History (undo/redo)
//! ```
//!
//! A delta is applied as a unit: if one of its operations fails, the ones
//! before it are reverted and the selection, markers and live ranges are
//! restored.

use std::collections::BTreeMap;

use quire_common::{Emitter, EventInfo, ListenerId, Priority};
use quire_model::data::{parse, stringify};
use quire_model::{Position, Range, Schema, Selection, Tree};
use tracing::{debug, error, info, warn};

use crate::batch::{Batch, BatchId, BatchType};
use crate::config::EditorConfig;
use crate::delta::{Delta, DeltaKind};
use crate::errors::{EditorError, EditorResult};
use crate::history::History;
use crate::markers::MarkerCollection;
use crate::operation::Operation;
use crate::transform::transform_sets;
use crate::writer::Writer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LiveRangeId(u64);

/// Payload of the `change:<delta kind>` events.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub batch: BatchId,
    pub batch_type: BatchType,
    pub delta: Delta,
}

#[derive(Debug, Clone)]
struct LogEntry {
    operation: Operation,
    batch: BatchId,
    delta: usize,
}

pub type ChangeEmitter = Emitter<Document, ChangeEvent, EditorError>;

pub struct Document {
    tree: Tree,
    schema: Schema,
    selection: Selection,
    markers: MarkerCollection,
    live_ranges: BTreeMap<LiveRangeId, Range>,
    history: History,
    log: Vec<LogEntry>,
    pending_changes: Vec<Operation>,
    emitter: ChangeEmitter,
    config: EditorConfig,

    /// Increments with every applied operation
    pub version: u64,

    next_batch: u64,
    next_live_range: u64,
}

impl Document {
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, EditorConfig::default())
    }

    pub fn with_config(schema: Schema, config: EditorConfig) -> Self {
        Self {
            tree: Tree::new(),
            schema,
            selection: Selection::new(),
            markers: MarkerCollection::new(),
            live_ranges: BTreeMap::new(),
            history: History::with_max_levels(config.undo_max_levels),
            log: Vec::new(),
            pending_changes: Vec::new(),
            emitter: Emitter::new(),
            config,
            version: 0,
            next_batch: 1,
            next_live_range: 1,
        }
    }

    pub fn create_root(&mut self, name: &str, element_name: &str) -> EditorResult<()> {
        self.tree.create_root(name, element_name)?;
        Ok(())
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<()> {
        for range in selection.ranges() {
            self.tree.validate_range(range)?;
        }
        self.selection = selection;
        Ok(())
    }

    pub fn markers(&self) -> &MarkerCollection {
        &self.markers
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Start a batch with a fresh id.
    pub fn batch(&mut self, batch_type: BatchType) -> Batch {
        Batch {
            id: Some(self.next_batch_id()),
            ..Batch::new(batch_type)
        }
    }

    fn next_batch_id(&mut self) -> BatchId {
        let id = BatchId(self.next_batch);
        self.next_batch += 1;
        id
    }

    /// Run `callback` with a writer on a new batch, then commit it.
    pub fn change<R>(&mut self, callback: impl FnOnce(&mut Writer<'_>) -> EditorResult<R>) -> EditorResult<R> {
        let mut batch = self.batch(BatchType::Default);
        let result = self.change_in(&mut batch, callback);
        self.commit(batch);
        result
    }

    /// Run `callback` with a writer on an existing batch. The caller commits.
    pub fn change_in<R>(
        &mut self,
        batch: &mut Batch,
        callback: impl FnOnce(&mut Writer<'_>) -> EditorResult<R>,
    ) -> EditorResult<R> {
        let mut writer = Writer::new(self, batch);
        callback(&mut writer)
    }

    /// Apply all operations of `delta` and append the applied form to `batch`.
    pub fn apply_delta(&mut self, batch: &mut Batch, delta: Delta) -> EditorResult<()> {
        if delta.is_empty() {
            return Ok(());
        }
        let batch_id = match batch.id {
            Some(id) => id,
            None => {
                let id = self.next_batch_id();
                batch.id = Some(id);
                id
            }
        };

        let selection = self.selection.clone();
        let live_ranges = self.live_ranges.clone();
        let markers = self.markers.clone();

        let mut applied: Vec<Operation> = Vec::with_capacity(delta.operations.len());
        for (index, operation) in delta.operations.iter().enumerate() {
            match operation.apply(&mut self.tree, &mut self.markers) {
                Ok(done) => {
                    self.follow(&done);
                    applied.push(done);
                }
                Err(source) => {
                    warn!(index, kind = operation.kind(), error = %source, "Delta failed, rolling back");
                    for done in applied.iter().rev() {
                        if let Err(err) = done.inverse().apply(&mut self.tree, &mut self.markers) {
                            error!(error = %err, kind = done.kind(), "Rollback failed");
                        }
                    }
                    self.selection = selection;
                    self.live_ranges = live_ranges;
                    self.markers = markers;
                    return Err(EditorError::Operation {
                        index,
                        kind: operation.kind(),
                        source,
                    });
                }
            }
        }

        let delta_index = batch.deltas.len();
        for operation in &applied {
            self.log.push(LogEntry {
                operation: operation.clone(),
                batch: batch_id,
                delta: delta_index,
            });
        }
        self.pending_changes.extend(applied.iter().cloned());
        self.version += applied.len() as u64;

        let delta = Delta::with_operations(delta.kind, applied);
        debug!(batch = batch_id.0, delta = ?delta.kind, ops = delta.operations.len(), "Applied delta");

        self.fire_change(ChangeEvent {
            batch: batch_id,
            batch_type: batch.batch_type,
            delta: delta.clone(),
        });
        batch.deltas.push(delta);
        Ok(())
    }

    /// Move the selection, live ranges and markers along with `operation`.
    fn follow(&mut self, operation: &Operation) {
        self.selection.map_ranges(|range| operation.transform_range(range));
        for range in self.live_ranges.values_mut() {
            *range = operation.transform_range(range);
        }
        self.markers.transform(operation);
    }

    /// Finish a batch. Default batches become undo steps.
    pub fn commit(&mut self, batch: Batch) {
        if batch.is_empty() {
            return;
        }
        info!(batch = ?batch.id, ops = batch.operation_count(), "Batch committed");
        if batch.batch_type == BatchType::Default {
            self.history.record(batch);
        }
        self.trim_log();
    }

    /// Register a listener for `change` or `change:<delta kind>`.
    pub fn on<F>(&mut self, event: &str, priority: Priority, listener: F) -> ListenerId
    where
        F: Fn(&mut EventInfo, &mut Document, &mut ChangeEvent) -> EditorResult<()> + 'static,
    {
        self.emitter.on(event, priority, listener)
    }

    pub fn off(&mut self, event: &str, id: ListenerId) -> bool {
        self.emitter.off(event, id)
    }

    /// Listeners see the document after the delta was applied. Listeners
    /// registered while an event is being fired are discarded.
    fn fire_change(&mut self, mut event: ChangeEvent) {
        let emitter = std::mem::take(&mut self.emitter);
        let name = format!("change:{}", event.delta.kind.name());
        if let Err(err) = emitter.fire(&name, self, &mut event) {
            warn!(error = %err, event = %name, "Change listener failed");
        }
        self.emitter = emitter;
    }

    /// Track `range` so it follows every later operation.
    pub fn track_range(&mut self, range: Range) -> LiveRangeId {
        let id = LiveRangeId(self.next_live_range);
        self.next_live_range += 1;
        self.live_ranges.insert(id, range);
        id
    }

    pub fn live_range(&self, id: LiveRangeId) -> Option<&Range> {
        self.live_ranges.get(&id)
    }

    pub fn untrack_range(&mut self, id: LiveRangeId) -> Option<Range> {
        self.live_ranges.remove(&id)
    }

    /// Operations applied since the last call, in order.
    ///
    /// Every applied operation is queued here until taken, so a document
    /// that is edited must be drained regularly. The editing controller
    /// does this on each sync.
    pub fn take_changes(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.pending_changes)
    }

    pub fn has_changes(&self) -> bool {
        !self.pending_changes.is_empty()
    }

    /// Replace the content of `root` with model markup. Selection markers in
    /// the markup become the document selection. Not recorded for undo.
    pub fn set_data(&mut self, root: &str, markup: &str) -> EditorResult<()> {
        let data = parse(markup, root)?;
        let size = self.tree.root(root)?.max_offset();
        let mut batch = self.batch(BatchType::Transparent);

        let mut operations = Vec::new();
        if size > 0 {
            operations.push(Operation::Remove {
                position: Position::new(root, vec![0]),
                nodes: self.tree.root(root)?.slice(0, size)?,
            });
        }
        if !data.nodes.is_empty() {
            operations.push(Operation::Insert {
                position: Position::new(root, vec![0]),
                nodes: data.nodes,
            });
        }
        let applied = self.apply_delta(&mut batch, Delta::with_operations(DeltaKind::Insert, operations));
        self.commit(batch);
        applied?;

        match data.selection {
            Some(selection) => self.set_selection(selection)?,
            None => self.selection.remove_all_ranges(),
        }
        Ok(())
    }

    /// Model markup of `root` with the selection marked by `[` and `]`.
    pub fn get_data(&self, root: &str) -> EditorResult<String> {
        Ok(stringify(self.tree.root(root)?, root, Some(&self.selection)))
    }

    /// Model markup of `root` without selection markers.
    pub fn get_content(&self, root: &str) -> EditorResult<String> {
        Ok(stringify(self.tree.root(root)?, root, None))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Revert the most recent undo step. Returns `false` when there is none.
    pub fn undo(&mut self) -> EditorResult<bool> {
        let Some(batch) = self.history.pop_undo() else {
            return Ok(false);
        };
        let reverts = batch.id.unwrap_or_default();

        let undo = match self.revert(&batch, BatchType::Undo { reverts }) {
            Ok(undo) => undo,
            Err(err) => {
                self.history.push_undo(batch);
                return Err(err);
            }
        };

        if let Some(id) = undo.id {
            self.history.cancel(reverts, id);
        }
        info!(batch = reverts.0, "Undo");
        self.history.push_redo(undo);
        Ok(true)
    }

    /// Reapply the most recently undone step.
    pub fn redo(&mut self) -> EditorResult<bool> {
        let Some(undo) = self.history.pop_redo() else {
            return Ok(false);
        };
        let reverts = undo.id.unwrap_or_default();

        let redo = match self.revert(&undo, BatchType::Redo { reverts }) {
            Ok(redo) => redo,
            Err(err) => {
                self.history.push_redo(undo);
                return Err(err);
            }
        };

        if let Some(id) = redo.id {
            self.history.cancel(reverts, id);
        }
        info!(batch = reverts.0, "Redo");
        self.history.push_undo(redo);
        Ok(true)
    }

    /// Apply the inverse of `batch`, delta by delta from the last, with
    /// each inverse transformed over what other batches applied after the
    /// delta. The batch's own later deltas are already reverted at that
    /// point, so neither they nor their reverts take part.
    fn revert(&mut self, batch: &Batch, batch_type: BatchType) -> EditorResult<Batch> {
        let mut reverting = self.batch(batch_type);
        reverting.description = batch.description.clone();
        let (Some(reverted), Some(reverting_id)) = (batch.id, reverting.id) else {
            return Ok(reverting);
        };

        for (delta_index, delta) in batch.deltas.iter().enumerate().rev() {
            let later = self.operations_after(reverted, delta_index, reverting_id);
            let inverse = delta.inverse();
            let (operations, _) = transform_sets(&inverse.operations, &later, true);
            if operations.is_empty() {
                debug!(batch = reverted.0, delta_index, "Nothing left to revert");
                continue;
            }
            self.apply_delta(&mut reverting, Delta::with_operations(inverse.kind, operations))?;
        }
        Ok(reverting)
    }

    /// Operations other batches applied after `delta` of `batch`.
    fn operations_after(&self, batch: BatchId, delta: usize, reverting: BatchId) -> Vec<Operation> {
        let last = self
            .log
            .iter()
            .rposition(|entry| entry.batch == batch && entry.delta == delta);
        let start = last.map_or(self.log.len(), |index| index + 1);

        self.log[start..]
            .iter()
            .filter(|entry| entry.batch != batch && entry.batch != reverting)
            .filter(|entry| !self.history.is_canceled(entry.batch))
            .map(|entry| entry.operation.clone())
            .collect()
    }

    /// Forget log entries older than anything history can still revert.
    fn trim_log(&mut self) {
        let Some(oldest) = self.history.oldest_batch() else {
            self.log.clear();
            return;
        };
        let keep_from = self
            .log
            .iter()
            .position(|entry| entry.batch >= oldest)
            .unwrap_or(self.log.len());
        if keep_from > 0 {
            self.log.drain(..keep_from);
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("tree", &self.tree)
            .field("selection", &self.selection)
            .field("markers", &self.markers)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_model::SchemaItemDefinition;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn document(markup: &str) -> Document {
        let mut schema = Schema::new();
        schema
            .register("paragraph", SchemaItemDefinition::new().inherit_all_from("$block"))
            .unwrap();
        let mut doc = Document::new(schema);
        doc.create_root("main", "$root").unwrap();
        doc.set_data("main", markup).unwrap();
        doc
    }

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    #[test]
    fn test_set_and_get_data() {
        let doc = document("<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>");
        assert_eq!(
            doc.get_data("main").unwrap(),
            "<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>"
        );
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_failed_delta_rolls_back() {
        let mut doc = document("<paragraph>foo[]</paragraph>");
        let mut batch = doc.batch(BatchType::Default);
        let delta = Delta::with_operations(
            DeltaKind::Insert,
            vec![
                Operation::Insert {
                    position: pos(&[0, 0]),
                    nodes: vec![quire_model::Text::new("x").into()],
                },
                Operation::Remove {
                    position: pos(&[5]),
                    nodes: vec![quire_model::Element::new("paragraph").into()],
                },
            ],
        );

        let result = doc.apply_delta(&mut batch, delta);
        assert!(matches!(result, Err(EditorError::Operation { index: 1, .. })));
        assert_eq!(doc.get_data("main").unwrap(), "<paragraph>foo[]</paragraph>");
        assert!(batch.deltas.is_empty());
    }

    #[test]
    fn test_selection_follows_operations() {
        let mut doc = document("<paragraph>foo[]</paragraph>");
        doc.change(|writer| writer.insert_text("ab", &pos(&[0, 0]), None)).unwrap();
        assert_eq!(doc.get_data("main").unwrap(), "<paragraph>abfoo[]</paragraph>");
    }

    #[test]
    fn test_live_range_follows_operations() {
        let mut doc = document("<paragraph>foo</paragraph>");
        let id = doc.track_range(Range::collapsed(pos(&[0, 3])));
        doc.change(|writer| writer.insert_text("xy", &pos(&[0, 1]), None)).unwrap();
        assert_eq!(doc.live_range(id), Some(&Range::collapsed(pos(&[0, 5]))));
        assert!(doc.untrack_range(id).is_some());
    }

    #[test]
    fn test_change_events_are_namespaced() {
        let mut doc = document("<paragraph>foo</paragraph>");
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        doc.on("change", Priority::Normal, move |info, _doc, _event| {
            log.borrow_mut().push(info.name().to_string());
            Ok(())
        });

        doc.change(|writer| writer.insert_text("x", &pos(&[0, 0]), None)).unwrap();
        assert_eq!(*seen.borrow(), vec!["change:insert".to_string()]);
    }

    #[test]
    fn test_take_changes() {
        let mut doc = document("<paragraph>foo</paragraph>");
        doc.take_changes();
        doc.change(|writer| writer.insert_text("x", &pos(&[0, 0]), None)).unwrap();
        let changes = doc.take_changes();
        assert_eq!(changes.len(), 1);
        assert!(!doc.has_changes());
    }

    #[test]
    fn test_undo_and_redo() {
        let mut doc = document("<paragraph>foo</paragraph>");
        doc.change(|writer| writer.insert_text("bar", &pos(&[0, 3]), None)).unwrap();
        assert_eq!(doc.get_content("main").unwrap(), "<paragraph>foobar</paragraph>");

        assert!(doc.undo().unwrap());
        assert_eq!(doc.get_content("main").unwrap(), "<paragraph>foo</paragraph>");
        assert!(doc.can_redo());

        assert!(doc.redo().unwrap());
        assert_eq!(doc.get_content("main").unwrap(), "<paragraph>foobar</paragraph>");
        assert!(!doc.redo().unwrap());
    }

    #[test]
    fn test_undo_batch_with_several_deltas() {
        let mut doc = document("<paragraph>foo</paragraph>");
        doc.change(|writer| {
            writer.split(&pos(&[0, 1]))?;
            writer.insert_text("Z", &pos(&[1, 0]), None)
        })
        .unwrap();
        assert_eq!(
            doc.get_content("main").unwrap(),
            "<paragraph>f</paragraph><paragraph>Zoo</paragraph>"
        );

        assert!(doc.undo().unwrap());
        assert_eq!(doc.get_content("main").unwrap(), "<paragraph>foo</paragraph>");

        assert!(doc.redo().unwrap());
        assert_eq!(
            doc.get_content("main").unwrap(),
            "<paragraph>f</paragraph><paragraph>Zoo</paragraph>"
        );

        assert!(doc.undo().unwrap());
        assert_eq!(doc.get_content("main").unwrap(), "<paragraph>foo</paragraph>");
    }

    #[test]
    fn test_undo_skips_other_batches_canceled_out() {
        let mut doc = document("<paragraph>foo</paragraph>");
        doc.change(|writer| writer.insert_text("a", &pos(&[0, 3]), None)).unwrap();
        doc.change(|writer| {
            writer.insert_text("b", &pos(&[0, 0]), None)?;
            writer.split(&pos(&[0, 2]))
        })
        .unwrap();

        assert!(doc.undo().unwrap());
        assert_eq!(doc.get_content("main").unwrap(), "<paragraph>fooa</paragraph>");
        assert!(doc.undo().unwrap());
        assert_eq!(doc.get_content("main").unwrap(), "<paragraph>foo</paragraph>");
    }

    #[test]
    fn test_log_is_trimmed_without_history() {
        let mut doc = document("<paragraph>foo</paragraph>");
        for _ in 0..3 {
            let mut batch = doc.batch(BatchType::Transparent);
            doc.change_in(&mut batch, |writer| writer.insert_text("x", &pos(&[0, 0]), None))
                .unwrap();
            doc.commit(batch);
        }
        assert!(doc.log.is_empty());
        assert_eq!(doc.take_changes().len(), 4);

        doc.change(|writer| writer.insert_text("y", &pos(&[0, 0]), None)).unwrap();
        assert_eq!(doc.log.len(), 1);
    }
}
