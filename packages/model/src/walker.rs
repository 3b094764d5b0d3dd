//! Step through a tree in document order, forward or backward.
//!
//! Each step reports what was crossed (entering an element, leaving one,
//! or a run of text) together with the positions before and after the
//! step. The walker reads the tree lazily; it stops at the boundaries or
//! at the edge of the root.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::id::ElementId;
use crate::node::{Attributes, Element, Node};
use crate::position::Position;
use crate::range::Range;
use crate::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

/// An element without its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementShell {
    pub id: ElementId,
    pub name: String,
    pub attributes: Attributes,
}

impl From<&Element> for ElementShell {
    fn from(element: &Element) -> Self {
        Self {
            id: element.id(),
            name: element.name().to_string(),
            attributes: element.attributes().clone(),
        }
    }
}

/// A run of characters from one text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextProxy {
    pub data: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkerItem {
    Element(ElementShell),
    Text(TextProxy),
}

impl WalkerItem {
    pub fn attributes(&self) -> &Attributes {
        match self {
            WalkerItem::Element(element) => &element.attributes,
            WalkerItem::Text(text) => &text.attributes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    ElementStart,
    ElementEnd,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkerValue {
    pub kind: StepKind,
    pub item: WalkerItem,
    pub previous_position: Position,
    pub next_position: Position,
    /// Offsets crossed: characters for text, 1 for elements.
    pub length: usize,
}

#[derive(Debug, Clone, Default)]
pub struct WalkerOptions {
    pub direction: Direction,
    pub boundaries: Option<Range>,
    /// Defaults to the boundary the walk starts from.
    pub start_position: Option<Position>,
    /// Report text one character at a time.
    pub single_characters: bool,
    /// Step over elements instead of entering them.
    pub shallow: bool,
    pub ignore_element_end: bool,
}

impl WalkerOptions {
    pub fn forward(boundaries: Range) -> Self {
        Self {
            boundaries: Some(boundaries),
            ..Self::default()
        }
    }

    pub fn backward(boundaries: Range) -> Self {
        Self {
            direction: Direction::Backward,
            boundaries: Some(boundaries),
            ..Self::default()
        }
    }
}

pub struct TreeWalker<'a> {
    tree: &'a Tree,
    position: Position,
    options: WalkerOptions,
}

impl<'a> TreeWalker<'a> {
    pub fn new(tree: &'a Tree, options: WalkerOptions) -> ModelResult<Self> {
        let position = match (&options.start_position, &options.boundaries, options.direction) {
            (Some(position), _, _) => position.clone(),
            (None, Some(boundaries), Direction::Forward) => boundaries.start.clone(),
            (None, Some(boundaries), Direction::Backward) => boundaries.end.clone(),
            (None, None, _) => {
                return Err(ModelError::invalid_range(
                    "walker needs a start position or boundaries",
                ))
            }
        };
        tree.validate(&position)?;
        if let Some(boundaries) = &options.boundaries {
            tree.validate_range(boundaries)?;
        }
        Ok(Self {
            tree,
            position,
            options,
        })
    }

    /// Where the walker currently stands.
    pub fn position(&self) -> &Position {
        &self.position
    }

    fn step_forward(&mut self) -> Option<WalkerValue> {
        loop {
            let position = self.position.clone();
            if let Some(boundaries) = &self.options.boundaries {
                if !position.is_before(&boundaries.end) {
                    return None;
                }
            }

            let parent = self
                .tree
                .element_at_path(&position.root, position.parent_path())
                .ok()?;
            let offset = position.offset();

            if offset >= parent.max_offset() {
                if position.path.len() == 1 {
                    return None;
                }
                let parent_path = position.parent_path();
                let after = Position::new(position.root.clone(), parent_path.to_vec())
                    .with_offset(parent_path[parent_path.len() - 1] + 1);
                self.position = after.clone();
                if self.options.ignore_element_end {
                    continue;
                }
                return Some(WalkerValue {
                    kind: StepKind::ElementEnd,
                    item: WalkerItem::Element(parent.into()),
                    previous_position: position,
                    next_position: after,
                    length: 1,
                });
            }

            let (node, inner) = parent.child_at_offset(offset)?;
            let value = match node {
                Node::Text(text) => {
                    let mut length = if self.options.single_characters {
                        1
                    } else {
                        text.len() - inner
                    };
                    if let Some(boundaries) = &self.options.boundaries {
                        if boundaries.end.has_same_parent_as(&position) {
                            length = length.min(boundaries.end.offset() - offset);
                        }
                    }
                    let data: String = text.data().chars().skip(inner).take(length).collect();
                    let next = position.with_offset(offset + length);
                    WalkerValue {
                        kind: StepKind::Text,
                        item: WalkerItem::Text(TextProxy {
                            data,
                            attributes: text.attributes().clone(),
                        }),
                        previous_position: position,
                        next_position: next,
                        length,
                    }
                }
                Node::Element(element) => {
                    let next = if self.options.shallow {
                        position.with_offset(offset + 1)
                    } else {
                        let mut path = position.path.clone();
                        path.push(0);
                        Position::new(position.root.clone(), path)
                    };
                    WalkerValue {
                        kind: StepKind::ElementStart,
                        item: WalkerItem::Element(element.into()),
                        previous_position: position,
                        next_position: next,
                        length: 1,
                    }
                }
            };
            self.position = value.next_position.clone();
            return Some(value);
        }
    }

    fn step_backward(&mut self) -> Option<WalkerValue> {
        loop {
            let position = self.position.clone();
            if let Some(boundaries) = &self.options.boundaries {
                if !position.is_after(&boundaries.start) {
                    return None;
                }
            }

            let parent = self
                .tree
                .element_at_path(&position.root, position.parent_path())
                .ok()?;
            let offset = position.offset();

            if offset == 0 {
                if position.path.len() == 1 {
                    return None;
                }
                let before = Position::new(position.root.clone(), position.parent_path().to_vec());
                self.position = before.clone();
                return Some(WalkerValue {
                    kind: StepKind::ElementStart,
                    item: WalkerItem::Element(parent.into()),
                    previous_position: position,
                    next_position: before,
                    length: 1,
                });
            }

            let (node, inner) = parent.child_at_offset(offset - 1)?;
            let value = match node {
                Node::Text(text) => {
                    let mut length = if self.options.single_characters { 1 } else { inner + 1 };
                    if let Some(boundaries) = &self.options.boundaries {
                        if boundaries.start.has_same_parent_as(&position) {
                            length = length.min(offset - boundaries.start.offset());
                        }
                    }
                    let data: String = text
                        .data()
                        .chars()
                        .skip(inner + 1 - length)
                        .take(length)
                        .collect();
                    WalkerValue {
                        kind: StepKind::Text,
                        item: WalkerItem::Text(TextProxy {
                            data,
                            attributes: text.attributes().clone(),
                        }),
                        next_position: position.with_offset(offset - length),
                        previous_position: position,
                        length,
                    }
                }
                Node::Element(element) => {
                    if self.options.shallow {
                        WalkerValue {
                            kind: StepKind::ElementStart,
                            item: WalkerItem::Element(element.into()),
                            next_position: position.with_offset(offset - 1),
                            previous_position: position,
                            length: 1,
                        }
                    } else {
                        let mut path = position.with_offset(offset - 1).path;
                        path.push(element.max_offset());
                        let inside = Position::new(position.root.clone(), path);
                        if self.options.ignore_element_end {
                            self.position = inside;
                            continue;
                        }
                        WalkerValue {
                            kind: StepKind::ElementEnd,
                            item: WalkerItem::Element(element.into()),
                            previous_position: position,
                            next_position: inside,
                            length: 1,
                        }
                    }
                }
            };
            self.position = value.next_position.clone();
            return Some(value);
        }
    }
}

impl Iterator for TreeWalker<'_> {
    type Item = WalkerValue;

    fn next(&mut self) -> Option<WalkerValue> {
        match self.options.direction {
            Direction::Forward => self.step_forward(),
            Direction::Backward => self.step_backward(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Text;

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    fn tree() -> Tree {
        let mut tree = Tree::new();
        tree.create_root("main", "$root").unwrap().append(vec![
            Element::new("paragraph")
                .with_child(Text::new("ab"))
                .with_child(Text::new("c").with_attribute("bold", "true"))
                .into(),
            Element::new("image").into(),
        ]);
        tree
    }

    fn describe(value: &WalkerValue) -> String {
        match (&value.kind, &value.item) {
            (StepKind::ElementStart, WalkerItem::Element(e)) => format!("<{}>", e.name),
            (StepKind::ElementEnd, WalkerItem::Element(e)) => format!("</{}>", e.name),
            (_, WalkerItem::Text(t)) => t.data.clone(),
            _ => unreachable!(),
        }
    }

    fn whole(tree: &Tree) -> Range {
        Range::new(pos(&[0]), tree.root_end("main").unwrap()).unwrap()
    }

    #[test]
    fn test_forward_walk() {
        let tree = tree();
        let steps: Vec<_> = TreeWalker::new(&tree, WalkerOptions::forward(whole(&tree)))
            .unwrap()
            .map(|value| describe(&value))
            .collect();
        assert_eq!(steps, vec!["<paragraph>", "ab", "c", "</paragraph>", "<image>", "</image>"]);
    }

    #[test]
    fn test_backward_walk() {
        let tree = tree();
        let steps: Vec<_> = TreeWalker::new(&tree, WalkerOptions::backward(whole(&tree)))
            .unwrap()
            .map(|value| describe(&value))
            .collect();
        assert_eq!(steps, vec!["</image>", "<image>", "</paragraph>", "c", "ab", "<paragraph>"]);
    }

    #[test]
    fn test_single_characters_and_positions() {
        let tree = tree();
        let options = WalkerOptions {
            single_characters: true,
            ..WalkerOptions::forward(Range::new(pos(&[0, 0]), pos(&[0, 2])).unwrap())
        };
        let steps: Vec<_> = TreeWalker::new(&tree, options).unwrap().collect();
        assert_eq!(steps.len(), 2);
        assert_eq!(describe(&steps[1]), "b");
        assert_eq!(steps[1].previous_position, pos(&[0, 1]));
        assert_eq!(steps[1].next_position, pos(&[0, 2]));
    }

    #[test]
    fn test_shallow_and_ignore_element_end() {
        let tree = tree();
        let shallow = WalkerOptions {
            shallow: true,
            ..WalkerOptions::forward(whole(&tree))
        };
        let steps: Vec<_> = TreeWalker::new(&tree, shallow)
            .unwrap()
            .map(|value| describe(&value))
            .collect();
        assert_eq!(steps, vec!["<paragraph>", "<image>"]);

        let no_ends = WalkerOptions {
            ignore_element_end: true,
            ..WalkerOptions::forward(whole(&tree))
        };
        let steps: Vec<_> = TreeWalker::new(&tree, no_ends)
            .unwrap()
            .map(|value| describe(&value))
            .collect();
        assert_eq!(steps, vec!["<paragraph>", "ab", "c", "<image>"]);
    }

    #[test]
    fn test_text_clamped_to_boundaries() {
        let tree = tree();
        let range = Range::new(pos(&[0, 1]), pos(&[0, 2])).unwrap();
        let steps: Vec<_> = TreeWalker::new(&tree, WalkerOptions::forward(range.clone()))
            .unwrap()
            .map(|value| describe(&value))
            .collect();
        assert_eq!(steps, vec!["b"]);

        let steps: Vec<_> = TreeWalker::new(&tree, WalkerOptions::backward(range))
            .unwrap()
            .map(|value| describe(&value))
            .collect();
        assert_eq!(steps, vec!["b"]);
    }

    #[test]
    fn test_walker_without_start_fails() {
        let tree = tree();
        assert!(TreeWalker::new(&tree, WalkerOptions::default()).is_err());
    }
}
