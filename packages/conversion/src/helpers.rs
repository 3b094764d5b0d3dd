//! Ready-made converters for the common one-to-one mappings.
//!
//! Each `upcast_*` / `downcast_*` function registers a converter on a single
//! dispatcher. [`crate::Conversion`] calls them once per dispatcher of a
//! pipeline or group.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use quire_common::{ListenerId, Priority};
use quire_model::{Element, ElementShell, StepKind, Tree, TreeWalker, WalkerOptions, TEXT_NAME};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::downcast::{DowncastDispatcher, DowncastItem};
use crate::errors::ConversionResult;
use crate::upcast::UpcastDispatcher;
use crate::view::{ViewElement, ViewElementKind};

/// Attribute every marker UI element carries with the marker name.
pub const MARKER_ATTRIBUTE: &str = "data-marker";

/// A view element pattern: matched against view input when upcasting and
/// used as a template when downcasting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    pub name: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ElementDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, element: &ViewElement) -> bool {
        element.name == self.name
            && self.classes.iter().all(|class| element.has_class(class))
            && self
                .attributes
                .iter()
                .all(|(key, value)| element.attribute(key) == Some(value.as_str()))
    }

    /// Consumable parts a match takes.
    pub fn parts(&self) -> Vec<String> {
        let mut parts = vec!["name".to_string()];
        parts.extend(self.classes.iter().map(|class| format!("class:{class}")));
        parts.extend(self.attributes.keys().map(|key| format!("attribute:{key}")));
        parts
    }

    pub fn create(&self) -> ViewElement {
        let mut element = ViewElement::new(self.name.clone());
        for class in &self.classes {
            element.add_class(class.clone());
        }
        for (key, value) in &self.attributes {
            element.attributes.insert(key.clone(), value.clone());
        }
        element
    }
}

impl From<&str> for ElementDefinition {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// How a model element turns into a view element.
#[derive(Clone)]
pub enum ViewCreator {
    Definition(ElementDefinition),
    Callback(Rc<dyn Fn(&ElementShell) -> ViewElement>),
}

impl ViewCreator {
    pub fn callback(create: impl Fn(&ElementShell) -> ViewElement + 'static) -> Self {
        ViewCreator::Callback(Rc::new(create))
    }

    pub fn create(&self, element: &ElementShell) -> ViewElement {
        match self {
            ViewCreator::Definition(definition) => definition.create(),
            ViewCreator::Callback(create) => create(element),
        }
    }
}

impl fmt::Debug for ViewCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewCreator::Definition(definition) => f.debug_tuple("Definition").field(definition).finish(),
            ViewCreator::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<ElementDefinition> for ViewCreator {
    fn from(definition: ElementDefinition) -> Self {
        ViewCreator::Definition(definition)
    }
}

impl From<&str> for ViewCreator {
    fn from(name: &str) -> Self {
        ViewCreator::Definition(ElementDefinition::new(name))
    }
}

/// `<view>` becomes a `model` element holding the converted children.
pub fn upcast_element_to_element(
    dispatcher: &mut UpcastDispatcher,
    view: ElementDefinition,
    model: &str,
    priority: Priority,
) -> ListenerId {
    let model = model.to_string();
    let event = format!("element:{}", view.name);
    dispatcher.on(&event, priority, move |_info, data, api| {
        if data.model_range.is_some() {
            return Ok(());
        }
        let matched = api
            .view
            .element(data.view_item)
            .map(|element| view.matches(element))
            .unwrap_or(false);
        let parts = view.parts();
        if !matched
            || !parts
                .iter()
                .all(|part| api.consumable.test(&data.view_item, part) == Some(true))
        {
            return Ok(());
        }

        let element = Element::new(model.clone());
        let id = element.id();
        if !api.safe_insert(element, &data.model_cursor)? {
            return Ok(());
        }
        api.consumable.consume_all(&data.view_item, &parts);

        if let Some(inside) = api.position_inside(id) {
            api.convert_children(data.view_item, &inside)?;
        }
        api.update_conversion_result(id, data)
    })
}

/// View attribute `view_key` on an already converted element becomes
/// model attribute `model_key`, where the schema allows it.
pub fn upcast_attribute_to_attribute(dispatcher: &mut UpcastDispatcher, view_key: &str, model_key: &str) -> ListenerId {
    let view_key = view_key.to_string();
    let model_key = model_key.to_string();
    let part = format!("attribute:{view_key}");
    dispatcher.on("element", Priority::Low, move |_info, data, api| {
        let Some(range) = data.model_range.clone() else {
            return Ok(());
        };
        let Some(value) = api
            .view
            .element(data.view_item)
            .ok()
            .and_then(|element| element.attribute(&view_key))
            .map(str::to_string)
        else {
            return Ok(());
        };
        if api.consumable.test(&data.view_item, &part) != Some(true) {
            return Ok(());
        }

        let mut applied = false;
        for flat in api.tree.flat_ranges(&range)? {
            let parent = api
                .tree
                .element_at_path_mut(&flat.start.root, flat.start.parent_path())?;
            for offset in flat.start.offset()..flat.end.offset() {
                if let Some(element) = parent.element_at_offset_mut(offset) {
                    if api.schema.check_attribute(element.name(), &model_key) {
                        element.set_attribute(model_key.clone(), value.clone());
                        applied = true;
                    }
                }
            }
        }
        if applied {
            api.consumable.consume(&data.view_item, &part);
        }
        Ok(())
    })
}

/// `<view>` around text becomes `model_key="true"` on that text.
pub fn upcast_attribute_to_element(dispatcher: &mut UpcastDispatcher, view: ElementDefinition, model_key: &str) -> ListenerId {
    let model_key = model_key.to_string();
    let event = format!("element:{}", view.name);
    dispatcher.on(&event, Priority::Normal, move |_info, data, api| {
        if data.model_range.is_some() {
            return Ok(());
        }
        let matched = api
            .view
            .element(data.view_item)
            .map(|element| view.matches(element))
            .unwrap_or(false);
        if !matched || !api.consumable.consume_all(&data.view_item, &view.parts()) {
            return Ok(());
        }

        let (range, cursor) = api.convert_children(data.view_item, &data.model_cursor)?;
        if api.schema.check_attribute(TEXT_NAME, &model_key) {
            for (position, length) in text_runs(api.tree, &range)? {
                api.tree.parent_of_mut(&position)?.set_attribute_on_range(
                    position.offset(),
                    position.offset() + length,
                    &model_key,
                    Some("true"),
                )?;
            }
        }
        data.model_range = Some(range);
        data.model_cursor = cursor;
        Ok(())
    })
}

fn text_runs(tree: &Tree, range: &quire_model::Range) -> ConversionResult<Vec<(quire_model::Position, usize)>> {
    if range.is_collapsed() {
        return Ok(Vec::new());
    }
    let walker = TreeWalker::new(tree, WalkerOptions::forward(range.clone()))?;
    Ok(walker
        .filter(|value| value.kind == StepKind::Text)
        .map(|value| (value.previous_position, value.length))
        .collect())
}

/// Model `model` element becomes a view element made by `view`.
pub fn downcast_element_to_element(
    dispatcher: &mut DowncastDispatcher,
    model: &str,
    view: ViewCreator,
    priority: Priority,
) -> ListenerId {
    dispatcher.on(&format!("insert:{model}"), priority, move |_info, data, api| {
        let Some(DowncastItem::Element(element)) = &data.item else {
            return Ok(());
        };
        if !api.consumable.consume(&data.consumable_key(), "insert") {
            return Ok(());
        }
        let position = api.view_position(&data.range.start)?;
        let id = api.view.create_element(view.create(element));
        api.view.insert_at(position, id)?;
        api.mapper.bind_elements(element.id, id);
        data.view_item = Some(id);
        Ok(())
    })
}

/// Model attribute `model_key` becomes view attribute `view_key` on the
/// element the item was converted to.
pub fn downcast_attribute_to_attribute(dispatcher: &mut DowncastDispatcher, model_key: &str, view_key: &str) -> ListenerId {
    let view_key = view_key.to_string();
    let part = format!("attribute:{model_key}");
    dispatcher.on(&format!("attribute:{model_key}"), Priority::Normal, move |_info, data, api| {
        let (Some(view_item), Some(attribute)) = (data.view_item, &data.attribute) else {
            return Ok(());
        };
        let Some(value) = attribute.new_value.clone() else {
            return Ok(());
        };
        if !api.consumable.consume(&data.consumable_key(), &part) {
            return Ok(());
        }
        if let Ok(element) = api.view.element_mut(view_item) {
            element.attributes.insert(view_key.clone(), value);
        }
        Ok(())
    })
}

/// Text carrying `model_key` is wrapped in the `view` element.
pub fn downcast_attribute_to_element(dispatcher: &mut DowncastDispatcher, model_key: &str, view: ElementDefinition) -> ListenerId {
    let part = format!("attribute:{model_key}");
    let event = format!("attribute:{model_key}:{TEXT_NAME}");
    dispatcher.on(&event, Priority::Normal, move |_info, data, api| {
        let Some(view_item) = data.view_item else {
            return Ok(());
        };
        if !api.consumable.consume(&data.consumable_key(), &part) {
            return Ok(());
        }
        let wrapper = view.create().with_kind(ViewElementKind::Attribute);
        data.view_item = Some(api.view.wrap(view_item, wrapper)?);
        Ok(())
    })
}

/// Markers named `group` or `group:*` are shown as a pair of empty UI
/// elements at their boundaries.
pub fn downcast_marker_to_element(dispatcher: &mut DowncastDispatcher, group: &str, view: ElementDefinition) -> ListenerId {
    dispatcher.on(&format!("addMarker:{group}"), Priority::Normal, move |_info, data, api| {
        let Some(name) = data.marker_name.clone() else {
            return Ok(());
        };
        if !api.consumable.consume(&data.consumable_key(), "addMarker") {
            return Ok(());
        }
        let start = api.view_position(&data.range.start)?;
        let end = api.view_position(&data.range.end)?;
        let ui = || {
            view.create()
                .with_kind(ViewElementKind::Ui)
                .with_attribute(MARKER_ATTRIBUTE, name.clone())
        };

        let end_element = api.view.create_element(ui());
        api.view.insert_at(end, end_element)?;
        let start_element = api.view.create_element(ui());
        api.view.insert_at(start, start_element)?;
        api.mapper.bind_marker(&name, start_element);
        api.mapper.bind_marker(&name, end_element);
        trace!(marker = %name, "marker rendered");
        Ok(())
    })
}
