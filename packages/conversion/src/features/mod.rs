//! Built-in features. Each is a [`Plugin`](crate::Plugin) that registers
//! its schema items and converters.

mod bold;
mod list;
mod list_separator;
mod paragraph;

pub use bold::Bold;
pub use list::{List, BULLETED_LIST, NUMBERED_LIST};
pub use list_separator::{ListSeparator, LIST_SEPARATOR};
pub use paragraph::{Paragraph, PARAGRAPH};
