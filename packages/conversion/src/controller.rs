//! # Controllers
//!
//! [`EditingController`] owns the editing view and keeps it in step with the
//! model. [`DataController`] turns data markup into model content and back
//! without keeping any view around.
//!
//! ## Incremental refresh
//!
//! ```text
//! take_changes() → parents each operation touched → mapped to current paths
//!               → nearest ancestor with a view element → children rebuilt
//!               → marker elements re-rendered
//! ```
//!
//! Only touched parents are rebuilt. Everything else in the view, and its
//! bindings in the mapper, stays as it was.

use quire_editor::{BatchType, Document, Operation};
use quire_model::{ModelError, Node, Position, Range, Schema, Tree};
use tracing::{debug, info, instrument};

use crate::consumable::Consumable;
use crate::conversion::{Conversion, DATA_DOWNCAST, EDITING_DOWNCAST, UPCAST};
use crate::downcast::{DowncastApi, DowncastDispatcher};
use crate::errors::ConversionResult;
use crate::mapper::Mapper;
use crate::view::{StringifyOptions, ViewDocument, ViewId};

/// Element name of view roots.
pub const VIEW_ROOT_ELEMENT: &str = "div";

#[derive(Debug, Default)]
pub struct EditingController {
    pub view: ViewDocument,
    pub mapper: Mapper,
}

impl EditingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the view root for model root `root` and render its content.
    pub fn attach_root(&mut self, doc: &Document, conversion: &Conversion, root: &str) -> ConversionResult<ViewId> {
        let dispatcher = conversion.downcast_dispatcher(EDITING_DOWNCAST)?;
        let view_root = self.view.create_root(root, VIEW_ROOT_ELEMENT)?;
        let model_root = doc.tree().root(root)?;
        self.mapper.bind_elements(model_root.id(), view_root);

        let range = Range::flat(root, &[], 0, model_root.max_offset())?;
        let mut consumable = Consumable::new();
        let mut api = DowncastApi::new(doc.tree(), doc.schema(), &mut self.view, &mut self.mapper, &mut consumable);
        dispatcher.convert_insert(&range, &mut api)?;
        self.render_markers(doc, dispatcher)?;
        Ok(view_root)
    }

    /// Bring the view up to date with every change applied since the last
    /// sync. Returns how many parents were rebuilt.
    #[instrument(skip_all)]
    pub fn sync(&mut self, doc: &mut Document, conversion: &Conversion) -> ConversionResult<usize> {
        let changes = doc.take_changes();
        if changes.is_empty() {
            return Ok(0);
        }
        let dispatcher = conversion.downcast_dispatcher(EDITING_DOWNCAST)?;

        let mut rebuilt = 0;
        for (root, path) in self.dirty_parents(doc.tree(), &changes) {
            let parent = doc.tree().element_at_path(&root, &path)?;
            let Some(view_parent) = self.mapper.to_view_element(parent.id()) else {
                debug!(root = %root, ?path, "no view element for touched parent");
                continue;
            };

            let destroyed = self.view.clear_children(view_parent)?;
            self.mapper.forget(&destroyed);

            let range = Range::flat(root.as_str(), &path, 0, parent.max_offset())?;
            let mut consumable = Consumable::new();
            let mut api = DowncastApi::new(doc.tree(), doc.schema(), &mut self.view, &mut self.mapper, &mut consumable);
            dispatcher.convert_insert(&range, &mut api)?;
            rebuilt += 1;
        }

        self.render_markers(doc, dispatcher)?;
        info!(operations = changes.len(), rebuilt, "View synced");
        Ok(rebuilt)
    }

    /// Parents touched by `changes`, in current coordinates, each the
    /// nearest one that has a view element, without nesting.
    fn dirty_parents(&self, tree: &Tree, changes: &[Operation]) -> Vec<(String, Vec<usize>)> {
        let mut parents: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, operation) in changes.iter().enumerate() {
            for (root, path) in operation.affected_parents() {
                let Some(path) = follow(&root, path, &changes[index..]) else {
                    continue;
                };
                if let Some(bound) = self.bound_ancestor(tree, &root, path) {
                    parents.push((root.clone(), bound));
                }
            }
        }

        parents.sort();
        parents.dedup();
        let nested: Vec<bool> = parents
            .iter()
            .map(|(root, path)| {
                parents
                    .iter()
                    .any(|(other_root, other)| other_root == root && other.len() < path.len() && path.starts_with(other))
            })
            .collect();
        parents
            .into_iter()
            .zip(nested)
            .filter_map(|(parent, nested)| (!nested).then_some(parent))
            .collect()
    }

    fn bound_ancestor(&self, tree: &Tree, root: &str, mut path: Vec<usize>) -> Option<Vec<usize>> {
        loop {
            if let Ok(element) = tree.element_at_path(root, &path) {
                if self.mapper.to_view_element(element.id()).is_some() {
                    return Some(path);
                }
            }
            path.pop()?;
        }
    }

    fn render_markers(&mut self, doc: &Document, dispatcher: &DowncastDispatcher) -> ConversionResult<()> {
        for name in self.mapper.marker_names() {
            for element in self.mapper.take_marker_elements(&name) {
                if self.view.contains(element) {
                    let destroyed = self.view.destroy(element)?;
                    self.mapper.forget(&destroyed);
                }
            }
        }

        let mut consumable = Consumable::new();
        for (name, range) in doc.markers().iter() {
            let root_bound = doc
                .tree()
                .root(range.root())
                .ok()
                .and_then(|root| self.mapper.to_view_element(root.id()))
                .is_some();
            if !root_bound {
                continue;
            }
            let mut api = DowncastApi::new(doc.tree(), doc.schema(), &mut self.view, &mut self.mapper, &mut consumable);
            dispatcher.convert_marker(name, range, &mut api)?;
        }
        Ok(())
    }

    /// Editing view markup of `root`.
    pub fn render(&self, root: &str) -> ConversionResult<String> {
        let id = self
            .view
            .root(root)
            .ok_or_else(|| ModelError::RootNotFound(root.to_string()))?;
        Ok(self.view.stringify(id, StringifyOptions::default()))
    }
}

/// Follow an element through `operations`. The root itself never moves.
fn follow(root: &str, path: Vec<usize>, operations: &[Operation]) -> Option<Vec<usize>> {
    if path.is_empty() {
        return Some(path);
    }
    let mut position = Position::new(root, path);
    for operation in operations {
        position = operation.transform_element(&position)?;
    }
    Some(position.path)
}

/// Stateless conversion between data markup and model content.
pub struct DataController;

impl DataController {
    /// Upcast `markup` into nodes that may be inserted into a `context`
    /// element.
    pub fn to_model(conversion: &Conversion, schema: &Schema, markup: &str, context: &str) -> ConversionResult<Vec<Node>> {
        let mut view = ViewDocument::new();
        let fragment = view.parse_fragment(markup)?;
        conversion
            .upcast_dispatcher(UPCAST)?
            .convert(&view, fragment, schema, context)
    }

    /// Replace the content of `root` with `markup`. Not recorded for undo.
    #[instrument(skip(doc, conversion, markup))]
    pub fn set(doc: &mut Document, conversion: &Conversion, root: &str, markup: &str) -> ConversionResult<()> {
        let context = doc.tree().root(root)?.name().to_string();
        let nodes = Self::to_model(conversion, doc.schema(), markup, &context)?;
        let size = doc.tree().root(root)?.max_offset();

        let mut batch = doc.batch(BatchType::Transparent);
        let result = doc.change_in(&mut batch, |writer| {
            if size > 0 {
                writer.remove(&Range::flat(root, &[], 0, size)?)?;
            }
            if !nodes.is_empty() {
                writer.insert(nodes, &Position::new(root, vec![0]))?;
            }
            Ok(())
        });
        doc.commit(batch);
        result?;
        Ok(())
    }

    /// Data markup of `root`.
    pub fn get(doc: &Document, conversion: &Conversion, root: &str) -> ConversionResult<String> {
        let dispatcher = conversion.downcast_dispatcher(DATA_DOWNCAST)?;
        let mut view = ViewDocument::new();
        let mut mapper = Mapper::new();
        let view_root = view.create_root(root, VIEW_ROOT_ELEMENT)?;
        let model_root = doc.tree().root(root)?;
        mapper.bind_elements(model_root.id(), view_root);

        let range = Range::flat(root, &[], 0, model_root.max_offset())?;
        let mut consumable = Consumable::new();
        let mut api = DowncastApi::new(doc.tree(), doc.schema(), &mut view, &mut mapper, &mut consumable);
        dispatcher.convert_insert(&range, &mut api)?;
        for (name, range) in doc.markers().iter() {
            if range.root() == root {
                dispatcher.convert_marker(name, range, &mut api)?;
            }
        }

        Ok(view.stringify(
            view_root,
            StringifyOptions {
                transparent_rendering: true,
            },
        ))
    }
}
