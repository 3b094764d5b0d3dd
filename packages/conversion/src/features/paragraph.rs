use quire_model::SchemaItemDefinition;

use crate::conversion::{DOWNCAST, UPCAST};
use crate::editor::{Editor, Plugin};
use crate::errors::ConversionResult;

pub const PARAGRAPH: &str = "paragraph";

/// `paragraph` in the model, `<p>` in the view.
pub struct Paragraph;

impl Plugin for Paragraph {
    fn name(&self) -> &'static str {
        "Paragraph"
    }

    fn init(&self, editor: &mut Editor) -> ConversionResult<()> {
        editor
            .document
            .schema_mut()
            .register(PARAGRAPH, SchemaItemDefinition::new().inherit_all_from("$block"))?;
        editor.conversion.for_upcast(UPCAST)?.element_to_element("p", PARAGRAPH);
        editor.conversion.for_downcast(DOWNCAST)?.element_to_element(PARAGRAPH, "p");
        Ok(())
    }
}
