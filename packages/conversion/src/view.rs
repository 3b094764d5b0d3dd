//! # View tree
//!
//! The renderable side of the editor. Nodes live in an arena and are
//! addressed by [`ViewId`], so the mapper can keep plain id side tables
//! instead of references into the tree.
//!
//! Elements come in four kinds:
//!
//! - `Container`: block-level structure bound to a model element
//! - `Attribute`: inline wrappers produced from text attributes (`<strong>`)
//! - `Ui`: editing affordances that take no model space (marker boundaries)
//! - `Root`: view roots and parsed fragments

use std::collections::BTreeMap;
use std::fmt;

use quire_markup::{parse_with, serialize_with, MarkupElement, MarkupNode, ParseOptions, SerializeOptions};
use quire_model::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ConversionError, ConversionResult};

/// Custom property marking an element that the data pipeline renders as
/// its children only.
pub const TRANSPARENT_RENDERING: &str = "dataPipeline:transparentRendering";

/// Name of the detached element holding parsed view markup.
pub const FRAGMENT_NAME: &str = "$fragment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(usize);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewElementKind {
    #[default]
    Container,
    Attribute,
    Ui,
    Root,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewElement {
    pub name: String,
    #[serde(default)]
    pub kind: ViewElementKind,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Class names in insertion order, without duplicates.
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub custom_properties: BTreeMap<String, Value>,
}

impl ViewElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: ViewElementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|own| own == class)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_custom_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.custom_properties.insert(key.into(), value.into());
    }

    pub fn custom_property(&self, key: &str) -> Option<&Value> {
        self.custom_properties.get(key)
    }

    pub fn is_transparent(&self) -> bool {
        self.custom_property(TRANSPARENT_RENDERING)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewData {
    Element(ViewElement),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct ViewNode {
    pub data: ViewData,
    parent: Option<ViewId>,
    children: Vec<ViewId>,
}

impl ViewNode {
    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn children(&self) -> &[ViewId] {
        &self.children
    }

    pub fn as_element(&self) -> Option<&ViewElement> {
        match &self.data {
            ViewData::Element(element) => Some(element),
            ViewData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            ViewData::Text(text) => Some(text),
            ViewData::Element(_) => None,
        }
    }
}

/// A place in the view: a child index inside an element, or a character
/// offset inside a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewPosition {
    pub parent: ViewId,
    pub offset: usize,
}

impl ViewPosition {
    pub fn new(parent: ViewId, offset: usize) -> Self {
        Self { parent, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringifyOptions {
    /// Render elements marked with [`TRANSPARENT_RENDERING`] as their
    /// children only.
    pub transparent_rendering: bool,
}

#[derive(Debug, Default)]
pub struct ViewDocument {
    nodes: Vec<Option<ViewNode>>,
    roots: BTreeMap<String, ViewId>,
}

impl ViewDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_root(&mut self, name: &str, element_name: &str) -> ConversionResult<ViewId> {
        if self.roots.contains_key(name) {
            return Err(ModelError::DuplicateRoot(name.to_string()).into());
        }
        let id = self.create_element(ViewElement::new(element_name).with_kind(ViewElementKind::Root));
        self.roots.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn root(&self, name: &str) -> Option<ViewId> {
        self.roots.get(name).copied()
    }

    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn create_element(&mut self, element: ViewElement) -> ViewId {
        self.alloc(ViewData::Element(element))
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> ViewId {
        self.alloc(ViewData::Text(data.into()))
    }

    fn alloc(&mut self, data: ViewData) -> ViewId {
        let id = ViewId(self.nodes.len());
        self.nodes.push(Some(ViewNode {
            data,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    pub fn contains(&self, id: ViewId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    pub fn node(&self, id: ViewId) -> ConversionResult<&ViewNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(ConversionError::ViewNodeNotFound(id))
    }

    fn node_mut(&mut self, id: ViewId) -> ConversionResult<&mut ViewNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(ConversionError::ViewNodeNotFound(id))
    }

    pub fn element(&self, id: ViewId) -> ConversionResult<&ViewElement> {
        self.node(id)?
            .as_element()
            .ok_or(ConversionError::NotAViewElement(id))
    }

    pub fn element_mut(&mut self, id: ViewId) -> ConversionResult<&mut ViewElement> {
        match &mut self.node_mut(id)?.data {
            ViewData::Element(element) => Ok(element),
            ViewData::Text(_) => Err(ConversionError::NotAViewElement(id)),
        }
    }

    pub fn text(&self, id: ViewId) -> Option<&str> {
        self.node(id).ok().and_then(ViewNode::as_text)
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.node(id).ok().and_then(ViewNode::parent)
    }

    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.node(id).map(ViewNode::children).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: ViewId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: ViewId) -> Option<ViewId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: ViewId) -> Option<ViewId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).and_then(|before| self.children(parent).get(before).copied())
    }

    /// Insert `child` at `index` of `parent`, detaching it from wherever it
    /// was first.
    pub fn insert_child(&mut self, parent: ViewId, index: usize, child: ViewId) -> ConversionResult<()> {
        self.element(parent)?;
        self.detach(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        if index > siblings.len() {
            return Err(ModelError::OffsetOutOfBounds {
                offset: index,
                max: siblings.len(),
            }
            .into());
        }
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: ViewId, child: ViewId) -> ConversionResult<()> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    pub fn detach(&mut self, id: ViewId) -> ConversionResult<()> {
        let Some(parent) = self.node(id)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|child| *child != id);
        self.node_mut(id)?.parent = None;
        Ok(())
    }

    /// Detach `id` and free it with all its descendants. Returns every
    /// freed id so side tables can drop them.
    pub fn destroy(&mut self, id: ViewId) -> ConversionResult<Vec<ViewId>> {
        self.detach(id)?;
        let mut freed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children);
                freed.push(current);
            }
        }
        Ok(freed)
    }

    /// Destroy all children of `id`.
    pub fn clear_children(&mut self, id: ViewId) -> ConversionResult<Vec<ViewId>> {
        let children = self.children(id).to_vec();
        let mut freed = Vec::new();
        for child in children {
            freed.extend(self.destroy(child)?);
        }
        Ok(freed)
    }

    /// Split a text node so `position` falls between two children.
    pub fn break_text(&mut self, position: ViewPosition) -> ConversionResult<ViewPosition> {
        let Some(text) = self.text(position.parent) else {
            return Ok(position);
        };
        let length = text.chars().count();
        let parent = self
            .parent(position.parent)
            .ok_or(ConversionError::ViewNodeNotFound(position.parent))?;
        let index = self
            .index_in_parent(position.parent)
            .ok_or(ConversionError::ViewNodeNotFound(position.parent))?;

        if position.offset == 0 {
            return Ok(ViewPosition::new(parent, index));
        }
        if position.offset >= length {
            return Ok(ViewPosition::new(parent, index + 1));
        }

        let split_at = text
            .char_indices()
            .nth(position.offset)
            .map_or(text.len(), |(byte, _)| byte);
        let tail = text[split_at..].to_string();
        if let ViewData::Text(data) = &mut self.node_mut(position.parent)?.data {
            data.truncate(split_at);
        }
        let tail = self.create_text(tail);
        self.insert_child(parent, index + 1, tail)?;
        Ok(ViewPosition::new(parent, index + 1))
    }

    /// Insert `child` at `position`, splitting text if needed. Returns the
    /// position right after the inserted node.
    pub fn insert_at(&mut self, position: ViewPosition, child: ViewId) -> ConversionResult<ViewPosition> {
        let position = self.break_text(position)?;
        self.insert_child(position.parent, position.offset, child)?;
        Ok(ViewPosition::new(position.parent, position.offset + 1))
    }

    /// Put `id` inside a new `wrapper` element standing where `id` was.
    pub fn wrap(&mut self, id: ViewId, wrapper: ViewElement) -> ConversionResult<ViewId> {
        let parent = self.parent(id).ok_or(ConversionError::ViewNodeNotFound(id))?;
        let index = self
            .index_in_parent(id)
            .ok_or(ConversionError::ViewNodeNotFound(id))?;
        let wrapper = self.create_element(wrapper);
        self.insert_child(parent, index, wrapper)?;
        self.append_child(wrapper, id)?;
        Ok(wrapper)
    }

    /// Parse markup into a detached fragment element.
    pub fn parse_fragment(&mut self, markup: &str) -> ConversionResult<ViewId> {
        let nodes = parse_with(
            markup,
            ParseOptions {
                selection_markers: false,
                keep_whitespace_text: true,
            },
        )?;
        let fragment = self.create_element(ViewElement::new(FRAGMENT_NAME).with_kind(ViewElementKind::Root));
        self.build(fragment, &nodes)?;
        Ok(fragment)
    }

    fn build(&mut self, parent: ViewId, nodes: &[MarkupNode]) -> ConversionResult<()> {
        for (index, node) in nodes.iter().enumerate() {
            match node {
                MarkupNode::Element(markup) => {
                    let mut element = ViewElement::new(markup.name.clone());
                    for (key, value) in &markup.attributes {
                        if key == "class" {
                            value.split_whitespace().for_each(|class| element.add_class(class));
                        } else {
                            element.attributes.insert(key.clone(), value.clone());
                        }
                    }
                    let id = self.create_element(element);
                    self.append_child(parent, id)?;
                    self.build(id, &markup.children)?;
                }
                MarkupNode::Text { value } if value.trim().is_empty() && !between_inline(nodes, index) => {}
                MarkupNode::Text { value } => {
                    let id = self.create_text(value.clone());
                    self.append_child(parent, id)?;
                }
                MarkupNode::SelectionStart | MarkupNode::SelectionEnd => {}
            }
        }
        Ok(())
    }

    /// Children of `id` as markup nodes.
    pub fn to_markup(&self, id: ViewId, options: StringifyOptions) -> Vec<MarkupNode> {
        let mut out = Vec::new();
        for child in self.children(id) {
            self.write_node(*child, options, &mut out);
        }
        out
    }

    fn write_node(&self, id: ViewId, options: StringifyOptions, out: &mut Vec<MarkupNode>) {
        let Ok(node) = self.node(id) else {
            return;
        };
        match &node.data {
            ViewData::Text(text) => out.push(MarkupNode::text(text.clone())),
            ViewData::Element(element) if options.transparent_rendering && element.is_transparent() => {
                for child in &node.children {
                    self.write_node(*child, options, out);
                }
            }
            ViewData::Element(element) => {
                let mut markup = MarkupElement::new(element.name.clone());
                if !element.classes.is_empty() {
                    markup.attributes.push(("class".to_string(), element.classes.join(" ")));
                }
                markup
                    .attributes
                    .extend(element.attributes.iter().map(|(key, value)| (key.clone(), value.clone())));
                markup.children = self.to_markup(id, options);
                out.push(markup.into());
            }
        }
    }

    /// Serialize the children of `id`.
    pub fn stringify(&self, id: ViewId, options: StringifyOptions) -> String {
        serialize_with(
            &self.to_markup(id, options),
            SerializeOptions {
                selection_markers: false,
            },
        )
    }
}

/// Elements that flow inside text. Whitespace between two of them is
/// content; anywhere else it is formatting.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "code", "em", "i", "kbd", "mark", "s", "small", "span", "strong", "sub", "sup", "u",
];

fn between_inline(nodes: &[MarkupNode], index: usize) -> bool {
    let is_inline = |node: Option<&MarkupNode>| match node {
        Some(MarkupNode::Element(element)) => INLINE_ELEMENTS.contains(&element.name.as_str()),
        Some(MarkupNode::Text { .. }) => true,
        _ => false,
    };
    index > 0 && is_inline(nodes.get(index - 1)) && is_inline(nodes.get(index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_kept_only_between_inline_elements() {
        let mut view = ViewDocument::new();
        let fragment = view
            .parse_fragment("<ul>\n  <li><strong>a</strong> <em>b</em> </li>\n</ul>\n")
            .unwrap();

        assert_eq!(
            view.stringify(fragment, StringifyOptions::default()),
            "<ul><li><strong>a</strong> <em>b</em></li></ul>"
        );
    }

    #[test]
    fn test_parse_and_stringify_fragment() {
        let mut view = ViewDocument::new();
        let fragment = view
            .parse_fragment(r#"<p class="a b" id="x">foo<strong>bar</strong></p>"#)
            .unwrap();

        let p = view.children(fragment)[0];
        let element = view.element(p).unwrap();
        assert_eq!(element.classes, vec!["a", "b"]);
        assert_eq!(element.attribute("id"), Some("x"));
        assert_eq!(
            view.stringify(fragment, StringifyOptions::default()),
            r#"<p class="a b" id="x">foo<strong>bar</strong></p>"#
        );
    }

    #[test]
    fn test_transparent_elements_render_children_only() {
        let mut view = ViewDocument::new();
        let root = view.create_root("main", "div").unwrap();
        let mut hidden = ViewElement::new("ck-list-separator");
        hidden.set_custom_property(TRANSPARENT_RENDERING, true);
        let hidden = view.create_element(hidden);
        view.append_child(root, hidden).unwrap();
        let text = view.create_text("x");
        view.append_child(hidden, text).unwrap();

        assert_eq!(
            view.stringify(root, StringifyOptions::default()),
            "<ck-list-separator>x</ck-list-separator>"
        );
        assert_eq!(
            view.stringify(root, StringifyOptions { transparent_rendering: true }),
            "x"
        );
    }

    #[test]
    fn test_insert_inside_text_splits_it() {
        let mut view = ViewDocument::new();
        let root = view.create_root("main", "div").unwrap();
        let text = view.create_text("foobar");
        view.append_child(root, text).unwrap();

        let marker = view.create_element(ViewElement::new("span").with_kind(ViewElementKind::Ui));
        let after = view.insert_at(ViewPosition::new(text, 3), marker).unwrap();

        assert_eq!(after, ViewPosition::new(root, 2));
        assert_eq!(view.stringify(root, StringifyOptions::default()), "foo<span></span>bar");
    }

    #[test]
    fn test_wrap_and_destroy() {
        let mut view = ViewDocument::new();
        let root = view.create_root("main", "div").unwrap();
        let text = view.create_text("foo");
        view.append_child(root, text).unwrap();

        let strong = view
            .wrap(text, ViewElement::new("strong").with_kind(ViewElementKind::Attribute))
            .unwrap();
        assert_eq!(view.parent(text), Some(strong));
        assert_eq!(view.stringify(root, StringifyOptions::default()), "<strong>foo</strong>");

        let freed = view.destroy(strong).unwrap();
        assert_eq!(freed.len(), 2);
        assert!(!view.contains(text));
        assert!(view.children(root).is_empty());
    }

    #[test]
    fn test_duplicate_root_fails() {
        let mut view = ViewDocument::new();
        view.create_root("main", "div").unwrap();
        assert!(view.create_root("main", "div").is_err());
    }
}
