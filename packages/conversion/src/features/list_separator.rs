//! Keeps two adjacent lists of the same type apart.
//!
//! Loading `<ol>…</ol><ol>…</ol>` would otherwise give two list elements
//! right next to each other that editing may fuse into one. A
//! `listSeparator` block goes between them. It is hidden in the editing
//! view and leaves no trace in the data output.

use quire_common::{EventInfo, Priority};
use quire_model::{Element, Range, SchemaItemDefinition};

use crate::conversion::{DATA_DOWNCAST, EDITING_DOWNCAST, UPCAST};
use crate::editor::{Editor, Plugin};
use crate::errors::ConversionResult;
use crate::helpers::{ElementDefinition, ViewCreator};
use crate::upcast::{UpcastApi, UpcastData};
use crate::view::{ViewElement, TRANSPARENT_RENDERING};

pub const LIST_SEPARATOR: &str = "listSeparator";

/// View element the data pipeline writes and upcast reads back.
const SEPARATOR_ELEMENT: &str = "ck-list-separator";
const SEPARATOR_CLASS: &str = "ck-list-separator";
const HIDDEN_CLASS: &str = "ck-hidden";

pub struct ListSeparator;

impl Plugin for ListSeparator {
    fn name(&self) -> &'static str {
        "ListSeparator"
    }

    fn init(&self, editor: &mut Editor) -> ConversionResult<()> {
        editor.document.schema_mut().register(
            LIST_SEPARATOR,
            SchemaItemDefinition::new().allow_where("$block").block(),
        )?;

        editor
            .conversion
            .for_upcast(UPCAST)?
            .add(|dispatcher| {
                dispatcher.on("element:ol", Priority::Low, separate_lists);
                dispatcher.on("element:ul", Priority::Low, separate_lists);
            })
            .element_to_element(SEPARATOR_ELEMENT, LIST_SEPARATOR);

        editor.conversion.for_downcast(EDITING_DOWNCAST)?.element_to_element(
            LIST_SEPARATOR,
            ElementDefinition::new("div")
                .with_class(SEPARATOR_CLASS)
                .with_class(HIDDEN_CLASS),
        );

        editor.conversion.for_downcast(DATA_DOWNCAST)?.element_to_element(
            LIST_SEPARATOR,
            ViewCreator::callback(|_| {
                let mut element = ViewElement::new(SEPARATOR_ELEMENT);
                element.set_custom_property(TRANSPARENT_RENDERING, true);
                element
            }),
        );
        Ok(())
    }
}

/// Runs after the list itself was converted. Inserts a separator after the
/// list when the next view sibling is a list of the same type.
fn separate_lists(_info: &mut EventInfo, data: &mut UpcastData, api: &mut UpcastApi<'_>) -> ConversionResult<()> {
    let Some(next) = api.view.next_sibling(data.view_item) else {
        return Ok(());
    };
    let same_type = match (api.view.element(data.view_item), api.view.element(next)) {
        (Ok(list), Ok(sibling)) => list.name == sibling.name,
        _ => false,
    };
    if !same_type {
        return Ok(());
    }

    if data.model_range.is_none() {
        let (range, cursor) = api.convert_children(data.view_item, &data.model_cursor)?;
        data.model_range = Some(range);
        data.model_cursor = cursor;
    }

    let separator = Element::new(LIST_SEPARATOR);
    let id = separator.id();
    if !api.safe_insert(separator, &data.model_cursor)? {
        return Ok(());
    }

    let end = api
        .split_parts(id)
        .last()
        .and_then(|part| api.position_after(*part));
    let start = data.model_range.as_ref().map(|range| range.start.clone());
    if let (Some(start), Some(end)) = (start, end) {
        data.model_range = Some(Range::new(start, end)?);
    }
    api.update_conversion_result(id, data)
}
