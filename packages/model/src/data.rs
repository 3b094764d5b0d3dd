//! Model data as tag markup.
//!
//! Elements are written by name, text attributes through a `<$text>`
//! wrapper, and the selection with `[` and `]`:
//!
//! ```text
//! <paragraph>f[oo</paragraph><paragraph><$text bold="true">ba]r</$text></paragraph>
//! ```

use quire_markup::{MarkupElement, MarkupNode};

use crate::error::{ModelError, ModelResult};
use crate::node::{nodes_size, Attributes, Element, Node, Text, TEXT_NAME};
use crate::position::Position;
use crate::range::Range;
use crate::selection::Selection;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub nodes: Vec<Node>,
    /// Present when the markup contained `[` and `]`.
    pub selection: Option<Selection>,
}

#[derive(Default)]
struct Markers {
    start: Option<Position>,
    end: Option<Position>,
}

/// Parse markup into root children. Marker positions are computed for a
/// root called `root`.
pub fn parse(markup: &str, root: &str) -> ModelResult<ModelData> {
    let markup_nodes = quire_markup::parse(markup)?;
    let mut markers = Markers::default();
    let mut nodes = Vec::new();
    collect(&markup_nodes, root, &[], &mut nodes, &mut markers, None)?;

    let selection = match (markers.start, markers.end) {
        (None, None) => None,
        (Some(start), Some(end)) => Some(Selection::from_range(Range::new(start, end)?, false)),
        _ => {
            return Err(ModelError::InvalidData(
                "selection needs both `[` and `]`".into(),
            ))
        }
    };

    Ok(ModelData { nodes, selection })
}

fn collect(
    markup: &[MarkupNode],
    root: &str,
    parent_path: &[usize],
    out: &mut Vec<Node>,
    markers: &mut Markers,
    text_attributes: Option<&Attributes>,
) -> ModelResult<()> {
    for node in markup {
        match node {
            MarkupNode::Text { value } => {
                let text = Text::new(value.clone())
                    .with_attributes(text_attributes.cloned().unwrap_or_default());
                out.push(Node::Text(text));
            }
            MarkupNode::SelectionStart | MarkupNode::SelectionEnd => {
                let slot = if matches!(node, MarkupNode::SelectionStart) {
                    &mut markers.start
                } else {
                    &mut markers.end
                };
                if slot.is_some() {
                    return Err(ModelError::InvalidData(
                        "only one selection range is supported".into(),
                    ));
                }
                *slot = Some(Position::in_parent(root, parent_path, nodes_size(out)));
            }
            MarkupNode::Element(element) if element.name == TEXT_NAME => {
                if text_attributes.is_some() {
                    return Err(ModelError::InvalidData("`<$text>` cannot be nested".into()));
                }
                let attributes: Attributes = element.attributes.iter().cloned().collect();
                collect(&element.children, root, parent_path, out, markers, Some(&attributes))?;
            }
            MarkupNode::Element(element) => {
                if text_attributes.is_some() {
                    return Err(ModelError::InvalidData(format!(
                        "`<{}>` is not allowed inside `<$text>`",
                        element.name
                    )));
                }
                let mut child_path = parent_path.to_vec();
                child_path.push(nodes_size(out));

                let mut children = Vec::new();
                collect(&element.children, root, &child_path, &mut children, markers, None)?;

                let model = Element::new(element.name.clone())
                    .with_attributes(element.attributes.iter().cloned().collect())
                    .with_children(children);
                out.push(Node::Element(model));
            }
        }
    }
    Ok(())
}

/// Write the children of `element` (the root `root`, or an element inside
/// it at `path`) as markup, with selection markers where ranges start and end.
pub fn stringify(element: &Element, root: &str, selection: Option<&Selection>) -> String {
    stringify_at(element, root, &[], selection)
}

pub fn stringify_at(element: &Element, root: &str, path: &[usize], selection: Option<&Selection>) -> String {
    let mut boundaries: Vec<(Vec<usize>, bool)> = Vec::new();
    if let Some(selection) = selection {
        for range in selection.ranges().filter(|range| range.root() == root) {
            boundaries.push((range.start.path.clone(), true));
            boundaries.push((range.end.path.clone(), false));
        }
    }
    quire_markup::serialize(&build(element, path, &boundaries))
}

/// Serialize a node list outside of any tree.
pub fn stringify_nodes(nodes: &[Node]) -> String {
    let holder = Element::new("$documentFragment").with_children(nodes.to_vec());
    stringify(&holder, "", None)
}

fn build(element: &Element, path: &[usize], boundaries: &[(Vec<usize>, bool)]) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    let mut offset = 0;

    for child in element.children() {
        push_markers(&mut out, path, offset, boundaries);
        match child {
            Node::Element(child_element) => {
                let mut child_path = path.to_vec();
                child_path.push(offset);
                let mut markup = MarkupElement::new(child_element.name());
                markup.attributes = child_element
                    .attributes()
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                markup.children = build(child_element, &child_path, boundaries);
                out.push(MarkupNode::Element(markup));
            }
            Node::Text(text) => {
                let pieces = text_pieces(text, path, offset, boundaries);
                if text.attributes().is_empty() {
                    out.extend(pieces);
                } else {
                    let mut wrapper = MarkupElement::new(TEXT_NAME);
                    wrapper.attributes = text
                        .attributes()
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    wrapper.children = pieces;
                    out.push(MarkupNode::Element(wrapper));
                }
            }
        }
        offset += child.size();
    }

    push_markers(&mut out, path, offset, boundaries);
    out
}

/// Text content split wherever a marker falls strictly inside it.
fn text_pieces(text: &Text, path: &[usize], start: usize, boundaries: &[(Vec<usize>, bool)]) -> Vec<MarkupNode> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for (index, ch) in text.data().chars().enumerate() {
        if index > 0 && has_marker(path, start + index, boundaries) {
            if !current.is_empty() {
                pieces.push(MarkupNode::text(std::mem::take(&mut current)));
            }
            push_markers(&mut pieces, path, start + index, boundaries);
        }
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(MarkupNode::text(current));
    }
    pieces
}

fn has_marker(path: &[usize], offset: usize, boundaries: &[(Vec<usize>, bool)]) -> bool {
    boundaries.iter().any(|(at, _)| is_at(at, path, offset))
}

fn is_at(at: &[usize], path: &[usize], offset: usize) -> bool {
    at.len() == path.len() + 1 && at[..path.len()] == *path && at[path.len()] == offset
}

fn push_markers(out: &mut Vec<MarkupNode>, path: &[usize], offset: usize, boundaries: &[(Vec<usize>, bool)]) {
    for (at, is_start) in boundaries {
        if *is_start && is_at(at, path, offset) {
            out.push(MarkupNode::SelectionStart);
        }
    }
    for (at, is_start) in boundaries {
        if !*is_start && is_at(at, path, offset) {
            out.push(MarkupNode::SelectionEnd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    #[test]
    fn test_parse_with_selection() {
        let data = parse("<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>", "main").unwrap();
        assert_eq!(data.nodes.len(), 2);
        let selection = data.selection.unwrap();
        let range = selection.first_range().unwrap();
        assert_eq!(range.start, pos(&[0, 1]));
        assert_eq!(range.end, pos(&[1, 2]));
    }

    #[test]
    fn test_text_attributes() {
        let data = parse("<paragraph>a<$text bold=\"true\">b</$text></paragraph>", "main").unwrap();
        let Node::Element(paragraph) = &data.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(paragraph.child_count(), 2);
        assert_eq!(paragraph.children()[1].attribute("bold"), Some("true"));
    }

    #[test]
    fn test_round_trip_with_selection() {
        for source in [
            "<paragraph>f[oo</paragraph><paragraph>ba]r</paragraph>",
            "<paragraph>foo[]bar</paragraph>",
            "[<image src=\"a.png\"></image>]",
            "<paragraph><$text bold=\"true\">f[o</$text>o]</paragraph>",
            "<paragraph></paragraph>",
        ] {
            let data = parse(source, "main").unwrap();
            let root = Element::new("$root").with_children(data.nodes);
            assert_eq!(stringify(&root, "main", data.selection.as_ref()), source);
        }
    }

    #[test]
    fn test_marker_errors() {
        assert!(parse("<paragraph>f[oo</paragraph>", "main").is_err());
        assert!(parse("[a][b]", "main").is_err());
        assert!(parse("<$text bold=\"true\"><paragraph></paragraph></$text>", "main").is_err());
    }

    #[test]
    fn test_brackets_in_text_are_escaped() {
        let root = Element::new("$root").with_child(Element::new("paragraph").with_child(Text::new("[x]")));
        let markup = stringify(&root, "main", None);
        assert_eq!(markup, "<paragraph>&#91;x&#93;</paragraph>");
        let data = parse(&markup, "main").unwrap();
        assert!(data.selection.is_none());
        assert_eq!(Element::new("$root").with_children(data.nodes), root);
    }
}
