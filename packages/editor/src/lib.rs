//! # Quire Editor
//!
//! Editing engine over the `quire-model` tree.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Writer / Composer: intent → deltas          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Document                                    │
//! │  - Apply operations with validation         │
//! │  - Move selection, markers, live ranges     │
//! │  - Record batches for undo/redo             │
//! │  - Fire `change:<kind>` events              │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ conversion: model changes → view            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Operations are the only way in**: every change is an invertible
//!    [`Operation`], grouped into [`Delta`]s and [`Batch`]es
//! 2. **Positions are plain data**: anything that must survive a change is
//!    transformed by the operations that happened after it
//! 3. **Undo is a transformation**: a reverted batch is inverted and
//!    transformed over everything applied since
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quire_editor::{Document, Composer, DeleteOptions};
//!
//! let mut doc = Document::new(schema);
//! doc.create_root("main", "$root")?;
//! doc.set_data("main", "<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>")?;
//!
//! Composer::new().delete_selection(&mut doc, DeleteOptions { merge: true })?;
//! assert_eq!(doc.get_data("main")?, "<paragraph>f[]r</paragraph>");
//!
//! doc.undo()?;
//! ```

mod batch;
mod composer;
mod config;
mod delta;
mod document;
mod errors;
mod history;
mod markers;
mod operation;
mod session;
mod transform;
mod writer;

pub use batch::{Batch, BatchId, BatchType};
pub use composer::{
    Composer, DeleteContentsEvent, DeleteOptions, ModifySelectionEvent, ModifySelectionOptions, DELETE_CONTENTS,
    MODIFY_SELECTION,
};
pub use config::{EditorConfig, SelectionUnit};
pub use delta::{Delta, DeltaKind};
pub use document::{ChangeEvent, Document, LiveRangeId};
pub use errors::{EditorError, EditorResult};
pub use history::History;
pub use markers::MarkerCollection;
pub use operation::{Operation, OperationError};
pub use session::{EditSession, PendingChange};
pub use transform::{transform, transform_sets, transform_through};
pub use writer::Writer;
