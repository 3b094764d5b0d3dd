use quire_model::SchemaItemDefinition;

use crate::conversion::{DOWNCAST, UPCAST};
use crate::editor::{Editor, Plugin};
use crate::errors::ConversionResult;

pub const NUMBERED_LIST: &str = "numberedList";
pub const BULLETED_LIST: &str = "bulletedList";

/// Numbered (`<ol>`) and bulleted (`<ul>`) lists holding blocks.
pub struct List;

impl Plugin for List {
    fn name(&self) -> &'static str {
        "List"
    }

    fn init(&self, editor: &mut Editor) -> ConversionResult<()> {
        for (model, view) in [(NUMBERED_LIST, "ol"), (BULLETED_LIST, "ul")] {
            editor.document.schema_mut().register(
                model,
                SchemaItemDefinition::new()
                    .allow_where("$block")
                    .allow_content_of("$root")
                    .block(),
            )?;
            editor.conversion.for_upcast(UPCAST)?.element_to_element(view, model);
            editor.conversion.for_downcast(DOWNCAST)?.element_to_element(model, view);
        }
        Ok(())
    }
}
