//! # Downcast
//!
//! Model to view. Converting a model range fires, for every item in it:
//!
//! ```text
//! insert:<name>             element or `$text` enters the view
//! attribute:<key>:<name>    once per attribute the item carries
//! ```
//!
//! and converting a marker fires `addMarker:<name>`. Every part is
//! registered in a [`Consumable`] before the first event fires, so
//! converters can tell whether something else already took care of it.

use std::collections::HashMap;

use quire_common::{namespaces, EventInfo, ListenerId, ListenerList, Priority};
use quire_model::{ElementShell, Position, Range, Schema, StepKind, TextProxy, Tree, TreeWalker, WalkerItem, WalkerOptions, TEXT_NAME};
use tracing::{instrument, trace};

use crate::consumable::Consumable;
use crate::errors::ConversionResult;
use crate::mapper::Mapper;
use crate::view::{ViewDocument, ViewId, ViewPosition};

pub type DowncastConverter = Box<dyn Fn(&mut EventInfo, &mut DowncastData, &mut DowncastApi<'_>) -> ConversionResult<()>>;

#[derive(Debug, Clone, PartialEq)]
pub enum DowncastItem {
    Element(ElementShell),
    Text(TextProxy),
}

impl DowncastItem {
    pub fn name(&self) -> &str {
        match self {
            DowncastItem::Element(element) => &element.name,
            DowncastItem::Text(_) => TEXT_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DowncastData {
    /// Item being converted; `None` for marker events.
    pub item: Option<DowncastItem>,
    /// Model range of the item, or of the marker.
    pub range: Range,
    pub attribute: Option<AttributeValue>,
    pub marker_name: Option<String>,
    /// Outermost view node produced for the item so far.
    pub view_item: Option<ViewId>,
}

impl DowncastData {
    /// Key the item's parts are registered under in the consumable.
    pub fn consumable_key(&self) -> String {
        match (&self.item, &self.marker_name) {
            (Some(DowncastItem::Element(element)), _) => element.id.to_string(),
            (_, Some(name)) => format!("marker:{name}"),
            _ => self.range.start.to_string(),
        }
    }
}

pub struct DowncastApi<'a> {
    pub tree: &'a Tree,
    pub schema: &'a Schema,
    pub view: &'a mut ViewDocument,
    pub mapper: &'a mut Mapper,
    pub consumable: &'a mut Consumable<String>,
}

impl<'a> DowncastApi<'a> {
    pub fn new(tree: &'a Tree, schema: &'a Schema, view: &'a mut ViewDocument, mapper: &'a mut Mapper, consumable: &'a mut Consumable<String>) -> Self {
        Self {
            tree,
            schema,
            view,
            mapper,
            consumable,
        }
    }

    pub fn view_position(&self, position: &Position) -> ConversionResult<ViewPosition> {
        self.mapper.to_view_position(self.tree, self.view, position)
    }
}

pub struct DowncastDispatcher {
    events: HashMap<String, ListenerList<DowncastConverter>>,
}

impl DowncastDispatcher {
    /// Dispatcher with the built-in text converter.
    pub fn new() -> Self {
        let mut dispatcher = Self { events: HashMap::new() };
        dispatcher.on("insert:$text", Priority::Normal, insert_text);
        dispatcher
    }

    pub fn on<F>(&mut self, event: &str, priority: Priority, converter: F) -> ListenerId
    where
        F: Fn(&mut EventInfo, &mut DowncastData, &mut DowncastApi<'_>) -> ConversionResult<()> + 'static,
    {
        self.events
            .entry(event.to_string())
            .or_default()
            .add(Box::new(converter), priority)
    }

    pub fn off(&mut self, event: &str, id: ListenerId) -> bool {
        self.events
            .get_mut(event)
            .map(|list| list.remove(id))
            .unwrap_or(false)
    }

    fn fire(&self, event: &str, data: &mut DowncastData, api: &mut DowncastApi<'_>) -> ConversionResult<EventInfo> {
        let mut info = EventInfo::new(event);
        let lists: Vec<_> = namespaces(event)
            .into_iter()
            .filter_map(|name| self.events.get(name))
            .collect();
        if lists.is_empty() {
            trace!(event, "no converters");
        }
        for (converter, _) in ListenerList::merged(&lists) {
            if info.is_stopped() {
                break;
            }
            converter(&mut info, data, api)?;
        }
        Ok(info)
    }

    /// Convert everything inside `range` into the view. The parent of the
    /// range must already be bound in the mapper.
    #[instrument(skip(self, api), fields(root = range.root()))]
    pub fn convert_insert(&self, range: &Range, api: &mut DowncastApi<'_>) -> ConversionResult<()> {
        let tree = api.tree;
        let walker = TreeWalker::new(
            tree,
            WalkerOptions {
                ignore_element_end: true,
                ..WalkerOptions::forward(range.clone())
            },
        )?;

        let mut items = Vec::new();
        for value in walker {
            let range = match value.kind {
                StepKind::ElementStart => {
                    let start = value.previous_position.clone();
                    let end = start.with_offset(start.offset() + 1);
                    Range::new(start, end)?
                }
                _ => Range::new(value.previous_position.clone(), value.next_position.clone())?,
            };
            let item = match value.item {
                WalkerItem::Element(element) => DowncastItem::Element(element),
                WalkerItem::Text(text) => DowncastItem::Text(text),
            };
            items.push(DowncastData {
                item: Some(item),
                range,
                attribute: None,
                marker_name: None,
                view_item: None,
            });
        }

        for data in &items {
            let key = data.consumable_key();
            api.consumable.add(key.clone(), "insert");
            for attribute in item_attributes(data) {
                api.consumable.add(key.clone(), format!("attribute:{attribute}"));
            }
        }

        for mut data in items {
            let name = data.item.as_ref().map(DowncastItem::name).unwrap_or_default().to_string();
            self.fire(&format!("insert:{name}"), &mut data, api)?;

            let attributes: Vec<(String, String)> = match &data.item {
                Some(DowncastItem::Element(element)) => element.attributes.clone().into_iter().collect(),
                Some(DowncastItem::Text(text)) => text.attributes.clone().into_iter().collect(),
                None => Vec::new(),
            };
            for (key, value) in attributes {
                data.attribute = Some(AttributeValue {
                    key: key.clone(),
                    old_value: None,
                    new_value: Some(value),
                });
                self.fire(&format!("attribute:{key}:{name}"), &mut data, api)?;
            }
        }
        Ok(())
    }

    /// Render marker `name` spanning `range`.
    pub fn convert_marker(&self, name: &str, range: &Range, api: &mut DowncastApi<'_>) -> ConversionResult<()> {
        let mut data = DowncastData {
            item: None,
            range: range.clone(),
            attribute: None,
            marker_name: Some(name.to_string()),
            view_item: None,
        };
        api.consumable.add(data.consumable_key(), "addMarker");
        self.fire(&format!("addMarker:{name}"), &mut data, api)?;
        Ok(())
    }
}

impl Default for DowncastDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn item_attributes(data: &DowncastData) -> Vec<String> {
    match &data.item {
        Some(DowncastItem::Element(element)) => element.attributes.keys().cloned().collect(),
        Some(DowncastItem::Text(text)) => text.attributes.keys().cloned().collect(),
        None => Vec::new(),
    }
}

fn insert_text(_info: &mut EventInfo, data: &mut DowncastData, api: &mut DowncastApi<'_>) -> ConversionResult<()> {
    let Some(DowncastItem::Text(text)) = &data.item else {
        return Ok(());
    };
    if !api.consumable.consume(&data.consumable_key(), "insert") {
        return Ok(());
    }
    let position = api.view_position(&data.range.start)?;
    let id = api.view.create_text(text.data.clone());
    api.view.insert_at(position, id)?;
    data.view_item = Some(id);
    Ok(())
}
