//! # Conversion
//!
//! Moves content between the model and views.
//!
//! ```text
//!   data markup ──parse──► ViewDocument ──upcast──► model nodes ──Writer──► Document
//!                                                                              │
//!   editing view ◄──editingDowncast── changed parents ◄──take_changes()────────┤
//!   data markup  ◄──dataDowncast──── whole root ◄──────────────────────────────┘
//! ```
//!
//! Dispatchers fire namespaced events (`element:p`, `insert:paragraph`,
//! `attribute:bold:$text`, `addMarker:comment:1`) to converters kept in
//! priority order. Converters coordinate through a [`Consumable`]: whoever
//! consumes a part first owns it.
//!
//! ```rust,ignore
//! let mut editor = Editor::with_plugins(EditorConfig::default(), &[&Paragraph, &List, &ListSeparator])?;
//! editor.create_root("main")?;
//! editor.set_data("main", "<ol><p>A</p></ol><ol><p>B</p></ol>")?;
//! assert_eq!(editor.get_data("main")?, "<ol><p>A</p></ol><ol><p>B</p></ol>");
//! ```

mod consumable;
mod controller;
mod conversion;
mod downcast;
mod editor;
mod errors;
mod helpers;
mod mapper;
mod upcast;
mod view;

pub mod features;

pub use consumable::Consumable;
pub use controller::{DataController, EditingController, VIEW_ROOT_ELEMENT};
pub use conversion::{Conversion, DowncastHelpers, UpcastHelpers, DATA_DOWNCAST, DOWNCAST, EDITING_DOWNCAST, UPCAST};
pub use downcast::{AttributeValue, DowncastApi, DowncastConverter, DowncastData, DowncastDispatcher, DowncastItem};
pub use editor::{Editor, Plugin, ROOT_ELEMENT};
pub use errors::{ConversionError, ConversionResult};
pub use helpers::{ElementDefinition, ViewCreator, MARKER_ATTRIBUTE};
pub use mapper::Mapper;
pub use upcast::{UpcastApi, UpcastConverter, UpcastData, UpcastDispatcher, FRAGMENT_ROOT};
pub use view::{
    StringifyOptions, ViewData, ViewDocument, ViewElement, ViewElementKind, ViewId, ViewNode, ViewPosition, FRAGMENT_NAME,
    TRANSPARENT_RENDERING,
};
