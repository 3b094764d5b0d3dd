//! Model nodes: elements with ordered children, and attributed text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::children::{self, ChildNode};
use crate::error::{ModelError, ModelResult};
use crate::id::ElementId;

pub type Attributes = BTreeMap<String, String>;

/// Schema name used for text nodes.
pub const TEXT_NAME: &str = "$text";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Element(Element),
    Text(Text),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    #[serde(skip, default = "ElementId::next")]
    id: ElementId,
    name: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    data: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    attributes: Attributes,
}

/// Ids are identity, not content.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl Node {
    /// Offsets occupied by this node inside its parent.
    pub fn size(&self) -> usize {
        match self {
            Node::Element(_) => 1,
            Node::Text(text) => text.len(),
        }
    }

    /// Name used for schema checks.
    pub fn schema_name(&self) -> &str {
        match self {
            Node::Element(element) => element.name(),
            Node::Text(_) => TEXT_NAME,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Element(element) => element.attributes(),
            Node::Text(text) => text.attributes(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes().get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: &str, value: Option<&str>) {
        let attributes = match self {
            Node::Element(element) => &mut element.attributes,
            Node::Text(text) => &mut text.attributes,
        };
        match value {
            Some(value) => {
                attributes.insert(key.to_string(), value.to_string());
            }
            None => {
                attributes.remove(key);
            }
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    /// Deep copy with freshly allocated element ids.
    pub fn fresh_copy(&self) -> Node {
        match self {
            Node::Element(element) => Node::Element(element.fresh_copy()),
            Node::Text(text) => Node::Text(text.clone()),
        }
    }
}

impl ChildNode for Node {
    fn offset_size(&self) -> usize {
        self.size()
    }

    fn split_text(&mut self, at: usize) -> Option<Self> {
        match self {
            Node::Text(text) => Some(Node::Text(text.split_off(at))),
            Node::Element(_) => None,
        }
    }

    fn try_merge(&mut self, next: Self) -> Result<(), Self> {
        match (self, next) {
            (Node::Text(text), Node::Text(more)) if text.attributes == more.attributes => {
                text.data.push_str(&more.data);
                Ok(())
            }
            (_, next) => Err(next),
        }
    }

    fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

/// Sum of [`Node::size`] over a node list.
pub fn nodes_size(nodes: &[Node]) -> usize {
    children::max_offset(nodes)
}

/// Merge adjacent text with equal attributes and drop empty text.
pub fn normalize_nodes(mut nodes: Vec<Node>) -> Vec<Node> {
    children::normalize(&mut nodes);
    nodes
}

/// Split a node list at an offset. Text straddling the offset is cut.
pub fn split_nodes(nodes: &[Node], offset: usize) -> (Vec<Node>, Vec<Node>) {
    let size = nodes_size(nodes);
    let offset = offset.min(size);
    let head = children::slice(nodes, 0, offset).unwrap_or_default();
    let tail = children::slice(nodes, offset, size - offset).unwrap_or_default();
    (head, tail)
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ElementId::next(),
            name: name.into(),
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        children::normalize(&mut self.children);
        self
    }

    pub fn with_children(mut self, nodes: Vec<Node>) -> Self {
        self.children.extend(nodes);
        children::normalize(&mut self.children);
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        self.attributes.remove(key)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Offset just past the last child.
    pub fn max_offset(&self) -> usize {
        children::max_offset(&self.children)
    }

    pub fn offset_of_index(&self, index: usize) -> usize {
        children::start_offset(&self.children, index)
    }

    /// Child covering `offset`, with the offset inside it.
    pub fn child_at_offset(&self, offset: usize) -> Option<(&Node, usize)> {
        children::locate(&self.children, offset).map(|(index, inner)| (&self.children[index], inner))
    }

    /// Element starting exactly at `offset`.
    pub fn element_at_offset(&self, offset: usize) -> Option<&Element> {
        match self.child_at_offset(offset) {
            Some((Node::Element(element), 0)) => Some(element),
            _ => None,
        }
    }

    pub fn element_at_offset_mut(&mut self, offset: usize) -> Option<&mut Element> {
        let (index, inner) = children::locate(&self.children, offset)?;
        match (&mut self.children[index], inner) {
            (Node::Element(element), 0) => Some(element),
            _ => None,
        }
    }

    /// Node ending exactly at `offset`, if the boundary is not inside text.
    pub fn node_before_offset(&self, offset: usize) -> Option<&Node> {
        if offset == 0 {
            return None;
        }
        match self.child_at_offset(offset - 1) {
            Some((node, inner)) if inner + 1 == node.size() => Some(node),
            _ => None,
        }
    }

    /// Node starting exactly at `offset`.
    pub fn node_after_offset(&self, offset: usize) -> Option<&Node> {
        match self.child_at_offset(offset) {
            Some((node, 0)) => Some(node),
            _ => None,
        }
    }

    /// Direct child access by index.
    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// Insert `node` before the child at `index`.
    pub fn insert_child(&mut self, index: usize, node: Node) -> ModelResult<()> {
        if index > self.children.len() {
            return Err(ModelError::OffsetOutOfBounds {
                offset: index,
                max: self.children.len(),
            });
        }
        self.children.insert(index, node);
        children::normalize(&mut self.children);
        Ok(())
    }

    /// Remove `how_many` children starting at `index`.
    pub fn remove_children(&mut self, index: usize, how_many: usize) -> ModelResult<Vec<Node>> {
        if index + how_many > self.children.len() {
            return Err(ModelError::OffsetOutOfBounds {
                offset: index + how_many,
                max: self.children.len(),
            });
        }
        let removed: Vec<Node> = self.children.drain(index..index + how_many).collect();
        children::normalize(&mut self.children);
        Ok(removed)
    }

    pub fn insert_at(&mut self, offset: usize, nodes: Vec<Node>) -> ModelResult<()> {
        children::insert_at(&mut self.children, offset, nodes)
    }

    pub fn remove_at(&mut self, offset: usize, size: usize) -> ModelResult<Vec<Node>> {
        children::remove_range(&mut self.children, offset, size)
    }

    pub fn slice(&self, offset: usize, size: usize) -> ModelResult<Vec<Node>> {
        children::slice(&self.children, offset, size)
    }

    /// Detach every child from `offset` on.
    pub fn split_off(&mut self, offset: usize) -> ModelResult<Vec<Node>> {
        let index = children::split_at(&mut self.children, offset)?;
        let tail = self.children.split_off(index);
        Ok(tail)
    }

    pub fn take_children(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.children)
    }

    pub fn append(&mut self, nodes: Vec<Node>) {
        self.children.extend(nodes);
        children::normalize(&mut self.children);
    }

    /// Set or clear `key` on every node in `start..end`.
    pub fn set_attribute_on_range(
        &mut self,
        start: usize,
        end: usize,
        key: &str,
        value: Option<&str>,
    ) -> ModelResult<()> {
        let first = children::split_at(&mut self.children, start)?;
        let last = children::split_at(&mut self.children, end)?;
        for node in &mut self.children[first..last] {
            node.set_attribute(key, value);
        }
        children::normalize(&mut self.children);
        Ok(())
    }

    pub fn normalize(&mut self) {
        children::normalize(&mut self.children);
    }

    /// Empty copy with a new id and the same name and attributes.
    pub fn shell(&self) -> Element {
        Element::new(self.name.clone()).with_attributes(self.attributes.clone())
    }

    pub fn fresh_copy(&self) -> Element {
        let mut copy = self.shell();
        copy.children = self.children.iter().map(Node::fresh_copy).collect();
        copy
    }

    /// Text content of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text.data()),
                Node::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }

    /// Depth-first search for a descendant with `id`; returns its offset path.
    pub fn path_of(&self, id: ElementId) -> Option<Vec<usize>> {
        let mut offset = 0;
        for child in &self.children {
            if let Node::Element(element) = child {
                if element.id == id {
                    return Some(vec![offset]);
                }
                if let Some(mut rest) = element.path_of(id) {
                    rest.insert(0, offset);
                    return Some(rest);
                }
            }
            offset += child.size();
        }
        None
    }
}

impl Text {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.data.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Keep the first `at` characters and return the rest as a new node.
    pub fn split_off(&mut self, at: usize) -> Text {
        let byte = char_to_byte(&self.data, at);
        let tail = self.data.split_off(byte);
        Text {
            data: tail,
            attributes: self.attributes.clone(),
        }
    }
}

pub(crate) fn char_to_byte(data: &str, at: usize) -> usize {
    data.char_indices()
        .nth(at)
        .map(|(index, _)| index)
        .unwrap_or(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(text: &str) -> Element {
        Element::new("paragraph").with_child(Text::new(text))
    }

    #[test]
    fn test_equality_ignores_ids() {
        let a = paragraph("foo");
        let b = paragraph("foo");
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
        assert_ne!(a, paragraph("bar"));
    }

    #[test]
    fn test_sizes_and_offsets() {
        let element = Element::new("p")
            .with_child(Text::new("ab"))
            .with_child(Element::new("img"))
            .with_child(Text::new("cd"));
        assert_eq!(element.max_offset(), 5);
        assert_eq!(element.offset_of_index(2), 3);
        assert_eq!(element.element_at_offset(2).map(Element::name), Some("img"));
        assert!(element.element_at_offset(1).is_none());
        assert!(matches!(element.node_before_offset(2), Some(Node::Text(_))));
        assert!(element.node_before_offset(1).is_none());
    }

    #[test]
    fn test_adjacent_text_with_equal_attributes_merges() {
        let element = Element::new("p")
            .with_child(Text::new("a"))
            .with_child(Text::new("b"))
            .with_child(Text::new("c").with_attribute("bold", "true"));
        assert_eq!(element.child_count(), 2);
        assert_eq!(element.text_content(), "abc");
    }

    #[test]
    fn test_set_attribute_on_range_splits_text() {
        let mut element = paragraph("foobar");
        element.set_attribute_on_range(1, 3, "bold", Some("true")).unwrap();
        assert_eq!(element.child_count(), 3);
        assert_eq!(element.children()[1].attribute("bold"), Some("true"));

        element.set_attribute_on_range(0, 6, "bold", None).unwrap();
        assert_eq!(element, paragraph("foobar"));
    }

    #[test]
    fn test_split_off_and_append() {
        let mut element = paragraph("foobar");
        let tail = element.split_off(3).unwrap();
        assert_eq!(element, paragraph("foo"));
        element.append(tail);
        assert_eq!(element, paragraph("foobar"));
    }

    #[test]
    fn test_split_nodes() {
        let nodes = vec![Node::Text(Text::new("abc")), Node::Element(Element::new("img"))];
        let (head, tail) = split_nodes(&nodes, 2);
        assert_eq!(head, vec![Node::Text(Text::new("ab"))]);
        assert_eq!(
            tail,
            vec![Node::Text(Text::new("c")), Node::Element(Element::new("img"))]
        );
    }

    #[test]
    fn test_path_of_finds_nested_element() {
        let inner = Element::new("img");
        let id = inner.id();
        let root = Element::new("$root")
            .with_child(paragraph("x"))
            .with_child(Element::new("quote").with_child(Text::new("ab")).with_child(inner));
        assert_eq!(root.path_of(id), Some(vec![1, 2]));
    }

    #[test]
    fn test_serde_skips_ids() {
        let element = paragraph("hi").with_attribute("align", "left");
        let json = serde_json::to_string(&Node::Element(element.clone())).unwrap();
        assert!(!json.contains("\"id\""));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Node::Element(element));
    }

    #[test]
    fn test_multibyte_text_split() {
        let mut text = Text::new("żółw");
        let tail = text.split_off(2);
        assert_eq!(text.data(), "żó");
        assert_eq!(tail.data(), "łw");
    }
}
