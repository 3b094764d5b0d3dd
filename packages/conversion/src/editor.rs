//! The editor: a document, its conversion pipelines, the composer and the
//! editing view, wired together. Features are plugins that register schema
//! items and converters.

use quire_editor::{Composer, DeleteOptions, Document, EditorConfig, EditorResult, ModifySelectionOptions, Writer};
use quire_model::{Direction, Schema};
use tracing::{debug, info};

use crate::controller::{DataController, EditingController};
use crate::conversion::Conversion;
use crate::errors::ConversionResult;
use crate::view::ViewId;

/// Element name of every model root the editor creates.
pub const ROOT_ELEMENT: &str = "$root";

pub trait Plugin {
    fn name(&self) -> &'static str;

    fn init(&self, editor: &mut Editor) -> ConversionResult<()>;
}

pub struct Editor {
    pub document: Document,
    pub conversion: Conversion,
    pub composer: Composer,
    pub editing: EditingController,
    plugins: Vec<&'static str>,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            document: Document::with_config(Schema::new(), config),
            conversion: Conversion::new(),
            composer: Composer::new(),
            editing: EditingController::new(),
            plugins: Vec::new(),
        }
    }

    pub fn with_plugins(config: EditorConfig, plugins: &[&dyn Plugin]) -> ConversionResult<Self> {
        let mut editor = Self::new(config);
        for plugin in plugins {
            editor.add_plugin(*plugin)?;
        }
        Ok(editor)
    }

    /// Initialize `plugin` unless one with the same name already was.
    pub fn add_plugin(&mut self, plugin: &dyn Plugin) -> ConversionResult<()> {
        if self.has_plugin(plugin.name()) {
            debug!(plugin = plugin.name(), "plugin already loaded");
            return Ok(());
        }
        plugin.init(self)?;
        self.plugins.push(plugin.name());
        info!(plugin = plugin.name(), "Plugin loaded");
        Ok(())
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|plugin| *plugin == name)
    }

    /// Create a model root and its editing view root.
    pub fn create_root(&mut self, name: &str) -> ConversionResult<ViewId> {
        self.document.create_root(name, ROOT_ELEMENT)?;
        self.editing.attach_root(&self.document, &self.conversion, name)
    }

    pub fn set_data(&mut self, root: &str, markup: &str) -> ConversionResult<()> {
        DataController::set(&mut self.document, &self.conversion, root, markup)?;
        self.sync()?;
        Ok(())
    }

    pub fn get_data(&self, root: &str) -> ConversionResult<String> {
        DataController::get(&self.document, &self.conversion, root)
    }

    /// Current editing view markup of `root`.
    pub fn editing_data(&self, root: &str) -> ConversionResult<String> {
        self.editing.render(root)
    }

    /// Model markup of `root` with the selection.
    pub fn model_data(&self, root: &str) -> ConversionResult<String> {
        Ok(self.document.get_data(root)?)
    }

    /// Run `callback` as one undo step and refresh the view.
    pub fn change<R>(&mut self, callback: impl FnOnce(&mut Writer<'_>) -> EditorResult<R>) -> ConversionResult<R> {
        let result = self.document.change(callback);
        self.sync()?;
        Ok(result?)
    }

    pub fn delete_selection(&mut self) -> ConversionResult<()> {
        let options = DeleteOptions::from_config(self.document.config());
        let result = self.composer.delete_selection(&mut self.document, options);
        self.sync()?;
        Ok(result?)
    }

    pub fn modify_selection(&mut self, direction: Direction) -> ConversionResult<()> {
        let options = ModifySelectionOptions::from_config(self.document.config(), direction);
        Ok(self.composer.modify_document_selection(&mut self.document, options)?)
    }

    pub fn undo(&mut self) -> ConversionResult<bool> {
        let undone = self.document.undo()?;
        self.sync()?;
        Ok(undone)
    }

    pub fn redo(&mut self) -> ConversionResult<bool> {
        let redone = self.document.redo()?;
        self.sync()?;
        Ok(redone)
    }

    /// Refresh the editing view. Returns how many parents were rebuilt.
    pub fn sync(&mut self) -> ConversionResult<usize> {
        self.editing.sync(&mut self.document, &self.conversion)
    }
}
