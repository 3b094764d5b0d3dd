use anyhow::Result;
use quire_conversion::features::{Bold, List, ListSeparator, Paragraph};
use quire_conversion::{ConversionResult, Editor, Plugin, DOWNCAST, UPCAST};
use quire_model::SchemaItemDefinition;

use crate::config::{Config, ElementMapping};

/// Block elements declared in the config file.
struct ConfiguredElements<'a> {
    mappings: &'a [ElementMapping],
}

impl Plugin for ConfiguredElements<'_> {
    fn name(&self) -> &'static str {
        "ConfiguredElements"
    }

    fn init(&self, editor: &mut Editor) -> ConversionResult<()> {
        for mapping in self.mappings {
            let schema = editor.document.schema_mut();
            if !schema.is_registered(&mapping.model) {
                schema.register(&mapping.model, SchemaItemDefinition::new().inherit_all_from("$block"))?;
            }
            editor
                .conversion
                .for_upcast(UPCAST)?
                .element_to_element(mapping.view.clone(), &mapping.model);
            editor
                .conversion
                .for_downcast(DOWNCAST)?
                .element_to_element(&mapping.model, mapping.view.clone());
        }
        Ok(())
    }
}

/// An editor with the built-in features and everything `config` adds, with
/// one root called `root`.
pub fn build_editor(config: &Config, root: &str) -> Result<Editor> {
    let mut editor = Editor::with_plugins(config.editor.clone(), &[&Paragraph, &Bold, &List])?;
    if config.list_separator {
        editor.add_plugin(&ListSeparator)?;
    }
    editor.add_plugin(&ConfiguredElements {
        mappings: &config.elements,
    })?;
    editor.create_root(root)?;
    Ok(editor)
}
