//! Side tables between model elements and view elements.
//!
//! Neither tree points at the other. Bindings are keyed by
//! [`ElementId`] and [`ViewId`] and are dropped as soon as the view side
//! is destroyed.

use std::collections::{BTreeMap, HashMap};

use quire_model::{ElementId, Position, Tree};

use crate::errors::{ConversionError, ConversionResult};
use crate::view::{ViewData, ViewDocument, ViewElementKind, ViewId, ViewPosition};

#[derive(Debug, Default)]
pub struct Mapper {
    model_to_view: HashMap<ElementId, ViewId>,
    view_to_model: HashMap<ViewId, ElementId>,
    /// UI elements rendered for each marker.
    markers: BTreeMap<String, Vec<ViewId>>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_elements(&mut self, model: ElementId, view: ViewId) {
        if let Some(previous) = self.model_to_view.insert(model, view) {
            self.view_to_model.remove(&previous);
        }
        self.view_to_model.insert(view, model);
    }

    pub fn to_view_element(&self, model: ElementId) -> Option<ViewId> {
        self.model_to_view.get(&model).copied()
    }

    pub fn to_model_element(&self, view: ViewId) -> Option<ElementId> {
        self.view_to_model.get(&view).copied()
    }

    pub fn unbind_view_element(&mut self, view: ViewId) -> Option<ElementId> {
        let model = self.view_to_model.remove(&view)?;
        if self.model_to_view.get(&model) == Some(&view) {
            self.model_to_view.remove(&model);
        }
        Some(model)
    }

    pub fn unbind_model_element(&mut self, model: ElementId) -> Option<ViewId> {
        let view = self.model_to_view.remove(&model)?;
        self.view_to_model.remove(&view);
        Some(view)
    }

    /// Forget everything bound to destroyed view nodes.
    pub fn forget(&mut self, destroyed: &[ViewId]) {
        for id in destroyed {
            self.unbind_view_element(*id);
        }
        for elements in self.markers.values_mut() {
            elements.retain(|id| !destroyed.contains(id));
        }
        self.markers.retain(|_, elements| !elements.is_empty());
    }

    pub fn bind_marker(&mut self, name: &str, view: ViewId) {
        self.markers.entry(name.to_string()).or_default().push(view);
    }

    pub fn marker_elements(&self, name: &str) -> &[ViewId] {
        self.markers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn take_marker_elements(&mut self, name: &str) -> Vec<ViewId> {
        self.markers.remove(name).unwrap_or_default()
    }

    pub fn marker_names(&self) -> Vec<String> {
        self.markers.keys().cloned().collect()
    }

    pub fn clear_bindings(&mut self) {
        self.model_to_view.clear();
        self.view_to_model.clear();
        self.markers.clear();
    }

    /// Offsets the view node takes up in the model.
    pub fn model_length(&self, view: &ViewDocument, id: ViewId) -> usize {
        let Ok(node) = view.node(id) else {
            return 0;
        };
        match &node.data {
            ViewData::Text(text) => text.chars().count(),
            ViewData::Element(element) => match element.kind {
                ViewElementKind::Ui => 0,
                ViewElementKind::Attribute => node
                    .children()
                    .iter()
                    .map(|child| self.model_length(view, *child))
                    .sum(),
                ViewElementKind::Container | ViewElementKind::Root => 1,
            },
        }
    }

    /// Map a model position to the view. The model parent must already be
    /// converted.
    pub fn to_view_position(&self, tree: &Tree, view: &ViewDocument, position: &Position) -> ConversionResult<ViewPosition> {
        let parent = tree.parent_of(position)?;
        let view_parent = self
            .to_view_element(parent.id())
            .ok_or_else(|| ConversionError::UnmappedElement(parent.name().to_string()))?;
        Ok(self.find_view_offset(view, view_parent, position.offset()))
    }

    fn find_view_offset(&self, view: &ViewDocument, parent: ViewId, offset: usize) -> ViewPosition {
        let mut remaining = offset;
        let children = view.children(parent);
        for (index, child) in children.iter().enumerate() {
            if remaining == 0 {
                return ViewPosition::new(parent, index);
            }
            let length = self.model_length(view, *child);
            if remaining < length {
                return match view.node(*child).map(|node| &node.data) {
                    Ok(ViewData::Text(_)) => ViewPosition::new(*child, remaining),
                    _ => self.find_view_offset(view, *child, remaining),
                };
            }
            remaining -= length;
        }
        ViewPosition::new(parent, children.len())
    }
}
