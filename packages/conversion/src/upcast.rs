//! # Upcast
//!
//! View to model. Every view node fires an event (`element:<name>` or
//! `text`) and converters build model nodes into a scratch tree whose root
//! stands in for the element the result will be inserted into.
//!
//! Converters share two pieces of state through [`UpcastData`]:
//! `model_cursor`, where the next sibling goes, and `model_range`, what
//! this view node turned into. A converter that finds `model_range`
//! already set knows an earlier converter handled the node.
//!
//! Structural conflicts never fail the whole conversion. An element that
//! has no allowed place is skipped and its siblings are still converted.

use std::collections::HashMap;

use quire_common::{namespaces, EventInfo, ListenerId, ListenerList, Priority};
use quire_model::{Element, ElementId, Node, Position, Range, Schema, Text, Tree, TEXT_NAME};
use tracing::{debug, instrument};

use crate::consumable::Consumable;
use crate::errors::ConversionResult;
use crate::view::{ViewData, ViewDocument, ViewId};

/// Root name of the scratch tree conversion writes into.
pub const FRAGMENT_ROOT: &str = "$conversion";

pub type UpcastConverter = Box<dyn Fn(&mut EventInfo, &mut UpcastData, &mut UpcastApi<'_>) -> ConversionResult<()>>;

#[derive(Debug, Clone, PartialEq)]
pub struct UpcastData {
    pub view_item: ViewId,
    pub model_cursor: Position,
    pub model_range: Option<Range>,
}

/// Elements cut in two while making room for an insertion.
#[derive(Debug, Default)]
struct SplitRecord {
    parts: HashMap<ElementId, Vec<ElementId>>,
    original: HashMap<ElementId, ElementId>,
    /// Where conversion continues after an element that split its
    /// ancestors: the first of the split-off parts.
    cursor_parents: HashMap<ElementId, ElementId>,
}

pub struct UpcastApi<'a> {
    dispatcher: &'a UpcastDispatcher,
    pub view: &'a ViewDocument,
    pub tree: &'a mut Tree,
    pub schema: &'a Schema,
    pub consumable: &'a mut Consumable<ViewId>,
    splits: &'a mut SplitRecord,
}

impl<'a> UpcastApi<'a> {
    /// Convert one view node with the model cursor at `cursor`.
    pub fn convert_item(&mut self, view_item: ViewId, cursor: &Position) -> ConversionResult<(Option<Range>, Position)> {
        let event = match &self.view.node(view_item)?.data {
            ViewData::Text(_) => "text".to_string(),
            ViewData::Element(element) => format!("element:{}", element.name),
        };
        let mut data = UpcastData {
            view_item,
            model_cursor: cursor.clone(),
            model_range: None,
        };
        let dispatcher = self.dispatcher;
        dispatcher.fire(&event, &mut data, self)?;
        Ok((data.model_range, data.model_cursor))
    }

    /// Convert the children of `view_item` one after another, starting at
    /// `cursor`. Returns the covered model range and the final cursor.
    pub fn convert_children(&mut self, view_item: ViewId, cursor: &Position) -> ConversionResult<(Range, Position)> {
        let mut current = cursor.clone();
        for child in self.view.children(view_item).to_vec() {
            let (_, next) = self.convert_item(child, &current)?;
            current = next;
        }
        Ok((Range::new(cursor.clone(), current.clone())?, current))
    }

    /// Insert `element` at `position`, or as close above it as the schema
    /// allows by splitting ancestors. Returns `false` and leaves the tree
    /// alone when no ancestor accepts it.
    pub fn safe_insert(&mut self, element: Element, position: &Position) -> ConversionResult<bool> {
        let ancestors: Vec<String> = self
            .tree
            .ancestor_names(position)?
            .into_iter()
            .map(str::to_string)
            .collect();
        let names: Vec<&str> = ancestors.iter().map(String::as_str).collect();

        let Some(allowed) = self.schema.find_allowed_parent(&names, element.name()) else {
            debug!(element = element.name(), %position, "no allowed parent, skipping");
            return Ok(false);
        };

        let mut insert_at = position.clone();
        let mut first_split = None;
        for _ in allowed + 1..names.len() {
            let (at, part) = self.split_parent(&insert_at)?;
            first_split.get_or_insert(part);
            insert_at = at;
        }

        let id = element.id();
        self.tree
            .parent_of_mut(&insert_at)?
            .insert_at(insert_at.offset(), vec![Node::Element(element)])?;
        if let Some(part) = first_split {
            self.splits.cursor_parents.insert(id, part);
        }
        Ok(true)
    }

    /// Split the parent of `position` in two. Returns the position between
    /// the halves and the id of the new second half.
    fn split_parent(&mut self, position: &Position) -> ConversionResult<(Position, ElementId)> {
        let parent_path = position.parent_path().to_vec();
        let parent = self.tree.element_at_path_mut(&position.root, &parent_path)?;
        let tail = parent.split_off(position.offset())?;
        let mut part = parent.shell();
        part.append(tail);

        let original = self
            .splits
            .original
            .get(&parent.id())
            .copied()
            .unwrap_or_else(|| parent.id());
        let part_id = part.id();
        self.splits
            .parts
            .entry(original)
            .or_insert_with(|| vec![original])
            .push(part_id);
        self.splits.original.insert(part_id, original);

        let (offset, grandparent) = parent_path
            .split_last()
            .map(|(offset, rest)| (*offset, rest.to_vec()))
            .unwrap_or((0, Vec::new()));
        let between = Position::in_parent(position.root.clone(), &grandparent, offset + 1);
        self.tree
            .parent_of_mut(&between)?
            .insert_at(between.offset(), vec![Node::Element(part)])?;
        debug!(element = %original, "split while upcasting");
        Ok((between, part_id))
    }

    /// All parts `element` was split into, in document order.
    pub fn split_parts(&self, element: ElementId) -> Vec<ElementId> {
        let original = self.splits.original.get(&element).copied().unwrap_or(element);
        self.splits
            .parts
            .get(&original)
            .cloned()
            .unwrap_or_else(|| vec![original])
    }

    pub fn position_before(&self, element: ElementId) -> Option<Position> {
        let (root, path) = self.tree.find_element(element)?;
        (!path.is_empty()).then(|| Position::new(root, path))
    }

    /// Position at the start of `element`'s content.
    pub fn position_inside(&self, element: ElementId) -> Option<Position> {
        let (root, mut path) = self.tree.find_element(element)?;
        path.push(0);
        Some(Position::new(root, path))
    }

    pub fn position_after(&self, element: ElementId) -> Option<Position> {
        let before = self.position_before(element)?;
        Some(before.with_offset(before.offset() + 1))
    }

    /// Record `element` (with all its split parts) as the result of `data`
    /// and move the cursor past it.
    pub fn update_conversion_result(&self, element: ElementId, data: &mut UpcastData) -> ConversionResult<()> {
        if data.model_range.is_none() {
            let parts = self.split_parts(element);
            let start = self.position_before(parts[0]);
            let end = parts.last().and_then(|last| self.position_after(*last));
            if let (Some(start), Some(end)) = (start, end) {
                data.model_range = Some(Range::new(start, end)?);
            }
        }

        let cursor_parent = self
            .splits
            .cursor_parents
            .get(&element)
            .and_then(|part| self.tree.find_element(*part));
        if let Some((root, mut path)) = cursor_parent {
            path.push(0);
            data.model_cursor = Position::new(root, path);
        } else if let Some(range) = &data.model_range {
            data.model_cursor = range.end.clone();
        }
        Ok(())
    }
}

pub struct UpcastDispatcher {
    events: HashMap<String, ListenerList<UpcastConverter>>,
}

impl UpcastDispatcher {
    /// Dispatcher with the built-in text converter and the fallback that
    /// converts children of unknown elements in place.
    pub fn new() -> Self {
        let mut dispatcher = Self { events: HashMap::new() };
        dispatcher.on("text", Priority::Normal, convert_text);
        dispatcher.on("element", Priority::Lowest, convert_unknown_element);
        dispatcher
    }

    pub fn on<F>(&mut self, event: &str, priority: Priority, converter: F) -> ListenerId
    where
        F: Fn(&mut EventInfo, &mut UpcastData, &mut UpcastApi<'_>) -> ConversionResult<()> + 'static,
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

    fn fire(&self, event: &str, data: &mut UpcastData, api: &mut UpcastApi<'_>) -> ConversionResult<EventInfo> {
        let mut info = EventInfo::new(event);
        let lists: Vec<_> = namespaces(event)
            .into_iter()
            .filter_map(|name| self.events.get(name))
            .collect();
        for (converter, _) in ListenerList::merged(&lists) {
            if info.is_stopped() {
                break;
            }
            converter(&mut info, data, api)?;
        }
        Ok(info)
    }

    /// Convert the children of `fragment` into model nodes that may be
    /// inserted into an element named `context`.
    #[instrument(skip(self, view, schema))]
    pub fn convert(&self, view: &ViewDocument, fragment: ViewId, schema: &Schema, context: &str) -> ConversionResult<Vec<Node>> {
        let mut tree = Tree::new();
        tree.create_root(FRAGMENT_ROOT, context)?;
        let mut consumable = Consumable::from_view(view, fragment);
        let mut splits = SplitRecord::default();

        {
            let mut api = UpcastApi {
                dispatcher: self,
                view,
                tree: &mut tree,
                schema,
                consumable: &mut consumable,
                splits: &mut splits,
            };
            api.convert_children(fragment, &Position::new(FRAGMENT_ROOT, vec![0]))?;
        }

        remove_empty_parts(&mut tree, &splits)?;
        Ok(tree.root_mut(FRAGMENT_ROOT)?.take_children())
    }
}

impl Default for UpcastDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Split-off halves that received no content are leftovers.
fn remove_empty_parts(tree: &mut Tree, splits: &SplitRecord) -> ConversionResult<()> {
    for part in splits.original.keys() {
        let Some((root, path)) = tree.find_element(*part) else {
            continue;
        };
        let is_empty = tree.element_at_path(&root, &path)?.is_empty();
        if let (true, Some((offset, parent))) = (is_empty, path.split_last()) {
            tree.element_at_path_mut(&root, parent)?.remove_at(*offset, 1)?;
        }
    }
    Ok(())
}

fn convert_text(_info: &mut EventInfo, data: &mut UpcastData, api: &mut UpcastApi<'_>) -> ConversionResult<()> {
    if data.model_range.is_some() || !api.consumable.consume(&data.view_item, "name") {
        return Ok(());
    }
    let Some(text) = api.view.text(data.view_item) else {
        return Ok(());
    };

    let parent = api.tree.parent_of(&data.model_cursor)?;
    if !api.schema.check_child(parent.name(), TEXT_NAME) {
        if !text.trim().is_empty() {
            debug!(parent = parent.name(), "text not allowed here, skipping");
        }
        return Ok(());
    }

    let length = text.chars().count();
    let node = Node::Text(Text::new(text));
    api.tree
        .parent_of_mut(&data.model_cursor)?
        .insert_at(data.model_cursor.offset(), vec![node])?;

    let end = data.model_cursor.with_offset(data.model_cursor.offset() + length);
    data.model_range = Some(Range::new(data.model_cursor.clone(), end.clone())?);
    data.model_cursor = end;
    Ok(())
}

fn convert_unknown_element(_info: &mut EventInfo, data: &mut UpcastData, api: &mut UpcastApi<'_>) -> ConversionResult<()> {
    if data.model_range.is_some() || !api.consumable.consume(&data.view_item, "name") {
        return Ok(());
    }
    let (range, cursor) = api.convert_children(data.view_item, &data.model_cursor)?;
    data.model_range = Some(range);
    data.model_cursor = cursor;
    Ok(())
}
