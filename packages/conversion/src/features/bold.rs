use quire_model::{SchemaItemDefinition, TEXT_NAME};

use crate::conversion::{DOWNCAST, UPCAST};
use crate::editor::{Editor, Plugin};
use crate::errors::ConversionResult;

const BOLD: &str = "bold";

/// The `bold` text attribute, written as `<strong>`. `<b>` is read too.
pub struct Bold;

impl Plugin for Bold {
    fn name(&self) -> &'static str {
        "Bold"
    }

    fn init(&self, editor: &mut Editor) -> ConversionResult<()> {
        editor
            .document
            .schema_mut()
            .extend(TEXT_NAME, SchemaItemDefinition::new().allow_attribute(BOLD));
        editor
            .conversion
            .for_upcast(UPCAST)?
            .attribute_to_element("strong", BOLD)
            .attribute_to_element("b", BOLD);
        editor.conversion.for_downcast(DOWNCAST)?.attribute_to_element(BOLD, "strong");
        Ok(())
    }
}
