//! # Composer
//!
//! Selection-aware editing commands. Each command fires an event whose
//! payload carries everything the command needs; the built-in behavior is a
//! default listener, so other listeners can change the payload first,
//! act after it, or call `prevent_default` to replace it.
//!
//! ```rust,ignore
//! let mut composer = Composer::new();
//! composer.on_delete_contents(Priority::High, |_info, _doc, event| {
//!     event.options.merge = true;
//!     Ok(())
//! });
//! composer.delete_selection(&mut doc, DeleteOptions::default())?;
//! ```

mod delete_contents;
mod modify_selection;

use quire_common::{Emitter, EventInfo, ListenerId, Priority};
use quire_model::{Direction, Selection};
use serde::{Deserialize, Serialize};

use crate::batch::{Batch, BatchType};
use crate::config::{EditorConfig, SelectionUnit};
use crate::document::Document;
use crate::errors::{EditorError, EditorResult};

pub const DELETE_CONTENTS: &str = "deleteContents";
pub const MODIFY_SELECTION: &str = "modifySelection";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Merge the elements left at both ends of the deleted range.
    #[serde(default)]
    pub merge: bool,
}

impl DeleteOptions {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            merge: config.merge_blocks_on_delete,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifySelectionOptions {
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub unit: SelectionUnit,
}

impl ModifySelectionOptions {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    pub fn from_config(config: &EditorConfig, direction: Direction) -> Self {
        Self {
            direction,
            unit: config.selection_unit,
        }
    }
}

#[derive(Debug)]
pub struct DeleteContentsEvent {
    pub batch: Batch,
    pub selection: Selection,
    pub options: DeleteOptions,
}

#[derive(Debug)]
pub struct ModifySelectionEvent {
    pub selection: Selection,
    pub options: ModifySelectionOptions,
}

pub struct Composer {
    delete_contents: Emitter<Document, DeleteContentsEvent, EditorError>,
    modify_selection: Emitter<Document, ModifySelectionEvent, EditorError>,
}

impl Composer {
    pub fn new() -> Self {
        let mut deletion = Emitter::new();
        deletion.on_default(DELETE_CONTENTS, Priority::Normal, delete_contents::delete_contents);

        let mut motion = Emitter::new();
        motion.on_default(MODIFY_SELECTION, Priority::Normal, modify_selection::modify_selection);

        Self {
            delete_contents: deletion,
            modify_selection: motion,
        }
    }

    pub fn on_delete_contents<F>(&mut self, priority: Priority, listener: F) -> ListenerId
    where
        F: Fn(&mut EventInfo, &mut Document, &mut DeleteContentsEvent) -> EditorResult<()> + 'static,
    {
        self.delete_contents.on(DELETE_CONTENTS, priority, listener)
    }

    pub fn on_modify_selection<F>(&mut self, priority: Priority, listener: F) -> ListenerId
    where
        F: Fn(&mut EventInfo, &mut Document, &mut ModifySelectionEvent) -> EditorResult<()> + 'static,
    {
        self.modify_selection.on(MODIFY_SELECTION, priority, listener)
    }

    pub fn off_delete_contents(&mut self, id: ListenerId) -> bool {
        self.delete_contents.off(DELETE_CONTENTS, id)
    }

    pub fn off_modify_selection(&mut self, id: ListenerId) -> bool {
        self.modify_selection.off(MODIFY_SELECTION, id)
    }

    /// Delete the content of `selection`, recording into `batch`.
    /// `selection` is updated to where the content was.
    pub fn delete_contents(
        &self,
        doc: &mut Document,
        batch: &mut Batch,
        selection: &mut Selection,
        options: DeleteOptions,
    ) -> EditorResult<EventInfo> {
        let mut event = DeleteContentsEvent {
            batch: std::mem::take(batch),
            selection: selection.clone(),
            options,
        };
        let result = self.delete_contents.fire(DELETE_CONTENTS, doc, &mut event);
        *batch = event.batch;
        *selection = event.selection;
        result
    }

    /// Move the focus of `selection` one unit in the requested direction.
    pub fn modify_selection(
        &self,
        doc: &mut Document,
        selection: &mut Selection,
        options: ModifySelectionOptions,
    ) -> EditorResult<EventInfo> {
        let mut event = ModifySelectionEvent {
            selection: selection.clone(),
            options,
        };
        let result = self.modify_selection.fire(MODIFY_SELECTION, doc, &mut event);
        *selection = event.selection;
        result
    }

    /// Delete the document selection as one undo step.
    pub fn delete_selection(&self, doc: &mut Document, options: DeleteOptions) -> EditorResult<()> {
        let mut batch = doc.batch(BatchType::Default);
        let mut selection = doc.selection().clone();
        let result = self.delete_contents(doc, &mut batch, &mut selection, options);
        doc.commit(batch);
        result?;
        doc.set_selection(selection)
    }

    /// Extend the document selection.
    pub fn modify_document_selection(&self, doc: &mut Document, options: ModifySelectionOptions) -> EditorResult<()> {
        let mut selection = doc.selection().clone();
        self.modify_selection(doc, &mut selection, options)?;
        doc.set_selection(selection)
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}
