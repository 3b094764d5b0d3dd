//! # Operations
//!
//! The atomic, invertible changes to the model. Every change to a document
//! is one of these; higher-level edits are [`Delta`](crate::Delta)s that
//! group several operations.
//!
//! ## Semantics
//!
//! - `Insert` / `Remove` carry the nodes, so each is the other's inverse
//! - `Move` addresses its `target` in coordinates from before the move
//! - `AttributeChange` works on a flat range whose nodes all hold `old_value`
//! - `Split` cuts the parent of `position` in two; the new sibling gets the
//!   given name and attributes
//! - `Merge` joins the element after `position` into the one before it;
//!   `offset` is the size of the element before

use quire_model::{nodes_size, Attributes, Element, ModelError, Node, Position, Range, Tree};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::markers::MarkerCollection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Operation {
    Insert {
        position: Position,
        nodes: Vec<Node>,
    },

    Remove {
        position: Position,
        nodes: Vec<Node>,
    },

    #[serde(rename_all = "camelCase")]
    Move {
        source: Position,
        how_many: usize,
        target: Position,
    },

    #[serde(rename_all = "camelCase")]
    Rename {
        position: Position,
        old_name: String,
        new_name: String,
    },

    #[serde(rename_all = "camelCase")]
    AttributeChange {
        range: Range,
        key: String,
        old_value: Option<String>,
        new_value: Option<String>,
    },

    Split {
        position: Position,
        name: String,
        #[serde(default)]
        attributes: Attributes,
    },

    Merge {
        position: Position,
        offset: usize,
        name: String,
        #[serde(default)]
        attributes: Attributes,
    },

    #[serde(rename_all = "camelCase")]
    MarkerChange {
        name: String,
        old_range: Option<Range>,
        new_range: Option<Range>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("Cannot move a range into itself (target {0})")]
    MoveIntoItself(Position),

    #[error("Expected element `{expected}` at {position}, found {found}")]
    ElementMismatch {
        position: Position,
        expected: String,
        found: String,
    },

    #[error("Attribute `{key}` at {position} is {found:?}, expected {expected:?}")]
    AttributeMismatch {
        key: String,
        position: Position,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Marker `{name}` does not hold the expected range")]
    MarkerMismatch { name: String },
}

impl Operation {
    /// Short name used in logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Remove { .. } => "remove",
            Operation::Move { .. } => "move",
            Operation::Rename { .. } => "rename",
            Operation::AttributeChange { .. } => "attribute",
            Operation::Split { .. } => "split",
            Operation::Merge { .. } => "merge",
            Operation::MarkerChange { .. } => "marker",
        }
    }

    /// Apply to the tree after validating preconditions.
    ///
    /// Returns the operation as actually applied. For `Remove` this carries
    /// the nodes that were really taken out, so the inverse restores them
    /// exactly.
    pub fn apply(&self, tree: &mut Tree, markers: &mut MarkerCollection) -> Result<Operation, OperationError> {
        self.validate(tree, markers)?;

        match self {
            Operation::Insert { position, nodes } => {
                Self::apply_insert(tree, position, nodes)?;
                Ok(self.clone())
            }

            Operation::Remove { position, nodes } => {
                let removed = Self::apply_remove(tree, position, nodes_size(nodes))?;
                Ok(Operation::Remove {
                    position: position.clone(),
                    nodes: removed,
                })
            }

            Operation::Move { source, how_many, target } => {
                Self::apply_move(tree, source, *how_many, target)?;
                Ok(self.clone())
            }

            Operation::Rename { position, new_name, .. } => {
                tree.element_at_path_mut(&position.root, &position.path)?
                    .set_name(new_name.clone());
                Ok(self.clone())
            }

            Operation::AttributeChange { range, key, new_value, .. } => {
                tree.parent_of_mut(&range.start)?.set_attribute_on_range(
                    range.start.offset(),
                    range.end.offset(),
                    key,
                    new_value.as_deref(),
                )?;
                Ok(self.clone())
            }

            Operation::Split { position, name, attributes } => {
                Self::apply_split(tree, position, name, attributes)?;
                Ok(self.clone())
            }

            Operation::Merge { position, .. } => {
                Self::apply_merge(tree, position)?;
                Ok(self.clone())
            }

            Operation::MarkerChange { name, new_range, .. } => {
                match new_range {
                    Some(range) => {
                        markers.set(name.clone(), range.clone());
                    }
                    None => {
                        markers.remove(name);
                    }
                }
                Ok(self.clone())
            }
        }
    }

    /// Check preconditions without mutating anything.
    pub fn validate(&self, tree: &Tree, markers: &MarkerCollection) -> Result<(), OperationError> {
        match self {
            Operation::Insert { position, .. } => {
                tree.validate(position)?;
            }

            Operation::Remove { position, nodes } => {
                tree.parent_of(position)?
                    .slice(position.offset(), nodes_size(nodes))?;
            }

            Operation::Move { source, how_many, target } => {
                tree.parent_of(source)?
                    .slice(source.offset(), *how_many)?;
                tree.validate(target)?;
                if Self::is_inside_moved_range(source, *how_many, target) {
                    return Err(OperationError::MoveIntoItself(target.clone()));
                }
            }

            Operation::Rename { position, old_name, .. } => {
                let found = tree.node_after(position)?;
                match found {
                    Some(Node::Element(element)) if element.name() == old_name => {}
                    other => {
                        return Err(OperationError::ElementMismatch {
                            position: position.clone(),
                            expected: old_name.clone(),
                            found: describe(other),
                        })
                    }
                }
            }

            Operation::AttributeChange { range, key, old_value, .. } => {
                if !range.is_flat() {
                    return Err(ModelError::invalid_range("attribute changes need a flat range").into());
                }
                let nodes = tree.slice(range)?;
                let mut offset = range.start.offset();
                for node in &nodes {
                    let found = node.attribute(key);
                    if found != old_value.as_deref() {
                        return Err(OperationError::AttributeMismatch {
                            key: key.clone(),
                            position: range.start.with_offset(offset),
                            expected: old_value.clone(),
                            found: found.map(str::to_string),
                        });
                    }
                    offset += node.size();
                }
            }

            Operation::Split { position, .. } => {
                tree.validate(position)?;
                if position.path.len() < 2 {
                    return Err(OperationError::InvalidStructure(format!(
                        "cannot split the root at {}",
                        position
                    )));
                }
            }

            Operation::Merge { position, offset, name, attributes } => {
                let parent = tree.parent_of(position)?;
                let at = position.offset();
                let before = if at == 0 { None } else { parent.element_at_offset(at - 1) };
                let after = parent.element_at_offset(at);
                match (before, after) {
                    (Some(before), Some(after)) => {
                        if before.max_offset() != *offset {
                            return Err(OperationError::InvalidStructure(format!(
                                "element before {} has size {}, expected {}",
                                position,
                                before.max_offset(),
                                offset
                            )));
                        }
                        if after.name() != name || after.attributes() != attributes {
                            return Err(OperationError::ElementMismatch {
                                position: position.clone(),
                                expected: name.clone(),
                                found: after.name().to_string(),
                            });
                        }
                    }
                    _ => {
                        return Err(OperationError::InvalidStructure(format!(
                            "{} is not between two elements",
                            position
                        )))
                    }
                }
            }

            Operation::MarkerChange { name, old_range, new_range } => {
                if markers.get(name) != old_range.as_ref() {
                    return Err(OperationError::MarkerMismatch { name: name.clone() });
                }
                if let Some(range) = new_range {
                    tree.validate_range(range)?;
                }
            }
        }
        Ok(())
    }

    /// The operation that undoes this one.
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::Insert { position, nodes } => Operation::Remove {
                position: position.clone(),
                nodes: nodes.clone(),
            },

            Operation::Remove { position, nodes } => Operation::Insert {
                position: position.clone(),
                nodes: nodes.clone(),
            },

            Operation::Move { source, how_many, target } => {
                let moved_to = target
                    .transformed_by_deletion(source, *how_many)
                    .unwrap_or_else(|| target.clone());
                let back_to = source.transformed_by_insertion(&moved_to, *how_many, true);
                Operation::Move {
                    source: moved_to,
                    how_many: *how_many,
                    target: back_to,
                }
            }

            Operation::Rename { position, old_name, new_name } => Operation::Rename {
                position: position.clone(),
                old_name: new_name.clone(),
                new_name: old_name.clone(),
            },

            Operation::AttributeChange { range, key, old_value, new_value } => Operation::AttributeChange {
                range: range.clone(),
                key: key.clone(),
                old_value: new_value.clone(),
                new_value: old_value.clone(),
            },

            Operation::Split { position, name, attributes } => {
                let element = position.parent_path();
                let between = Position::new(position.root.clone(), element.to_vec())
                    .with_offset(element[element.len() - 1] + 1);
                Operation::Merge {
                    position: between,
                    offset: position.offset(),
                    name: name.clone(),
                    attributes: attributes.clone(),
                }
            }

            Operation::Merge { position, offset, name, attributes } => {
                let mut path = position.path.clone();
                if let Some(last) = path.last_mut() {
                    *last = last.saturating_sub(1);
                }
                path.push(*offset);
                Operation::Split {
                    position: Position::new(position.root.clone(), path),
                    name: name.clone(),
                    attributes: attributes.clone(),
                }
            }

            Operation::MarkerChange { name, old_range, new_range } => Operation::MarkerChange {
                name: name.clone(),
                old_range: new_range.clone(),
                new_range: old_range.clone(),
            },
        }
    }

    /// Where `position` ends up once this operation is applied; `None` when
    /// the content it pointed into was removed.
    pub fn transform_position(&self, position: &Position) -> Option<Position> {
        match self {
            Operation::Insert { position: at, nodes } => {
                Some(position.transformed_by_insertion(at, nodes_size(nodes), true))
            }

            Operation::Remove { position: at, nodes } => {
                position.transformed_by_deletion(at, nodes_size(nodes))
            }

            Operation::Move { source, how_many, target } => {
                Some(position.transformed_by_move(source, target, *how_many))
            }

            Operation::Split { position: at, .. } => Some(split_transform(position, at)),

            Operation::Merge { position: at, offset, .. } => Some(merge_transform(position, at, *offset)),

            Operation::Rename { .. } | Operation::AttributeChange { .. } | Operation::MarkerChange { .. } => {
                Some(position.clone())
            }
        }
    }

    /// Where `range` ends up once this operation is applied.
    pub fn transform_range(&self, range: &Range) -> Range {
        match self {
            Operation::Insert { position, nodes } => range.transformed_by_insertion(position, nodes_size(nodes)),

            Operation::Remove { position, nodes } => range.transformed_by_deletion(position, nodes_size(nodes)),

            Operation::Move { source, how_many, target } => range.transformed_by_move(source, target, *how_many),

            Operation::Split { .. } | Operation::Merge { .. } => {
                let start = self
                    .transform_position(&range.start)
                    .unwrap_or_else(|| range.start.clone());
                let end = self
                    .transform_position(&range.end)
                    .unwrap_or_else(|| range.end.clone());
                Range::new(start.clone(), end).unwrap_or_else(|_| Range::collapsed(start))
            }

            Operation::Rename { .. } | Operation::AttributeChange { .. } | Operation::MarkerChange { .. } => {
                range.clone()
            }
        }
    }

    /// Follow the element at `element` (a position right before it).
    /// `None` when the element was removed or merged away.
    pub fn transform_element(&self, element: &Position) -> Option<Position> {
        if element.path.is_empty() {
            return Some(element.clone());
        }
        match self {
            Operation::Insert { position: at, nodes } => {
                Some(element.transformed_by_insertion(at, nodes_size(nodes), true))
            }

            Operation::Remove { position: at, nodes } => {
                if covers_node(at, nodes_size(nodes), element) {
                    return None;
                }
                element.transformed_by_deletion(at, nodes_size(nodes))
            }

            Operation::Move { source, how_many, target } => {
                if covers_node(source, *how_many, element) {
                    let target = target
                        .transformed_by_deletion(source, *how_many)
                        .unwrap_or_else(|| target.clone());
                    return Some(element.combined(source, &target));
                }
                Some(element.transformed_by_move(source, target, *how_many))
            }

            Operation::Merge { position: at, .. } if at.root == element.root && at.path == element.path => None,

            // Split and merge move content between siblings; following a
            // position inside the element tells where the element went.
            Operation::Split { .. } | Operation::Merge { .. } => {
                let mut inside = element.path.clone();
                inside.push(0);
                let moved = self.transform_position(&Position::new(element.root.clone(), inside))?;
                Some(Position::new(moved.root.clone(), moved.parent_path().to_vec()))
            }

            Operation::Rename { .. } | Operation::AttributeChange { .. } | Operation::MarkerChange { .. } => {
                Some(element.clone())
            }
        }
    }

    /// Parents whose children this operation changes, as `(root, path)` in
    /// coordinates from before the operation.
    pub fn affected_parents(&self) -> Vec<(String, Vec<usize>)> {
        let parent_of = |position: &Position| (position.root.clone(), position.parent_path().to_vec());
        match self {
            Operation::Insert { position, .. }
            | Operation::Remove { position, .. }
            | Operation::Rename { position, .. }
            | Operation::Merge { position, .. } => vec![parent_of(position)],

            Operation::Move { source, target, .. } => vec![parent_of(source), parent_of(target)],

            Operation::AttributeChange { range, .. } => vec![parent_of(&range.start)],

            Operation::Split { position, .. } => {
                let element = position.parent_path();
                vec![(position.root.clone(), element[..element.len().saturating_sub(1)].to_vec())]
            }

            Operation::MarkerChange { .. } => Vec::new(),
        }
    }

    fn is_inside_moved_range(source: &Position, how_many: usize, target: &Position) -> bool {
        if source.root != target.root || source.path.is_empty() {
            return false;
        }
        let level = source.path.len() - 1;
        if target.path.len() <= level || target.path[..level] != source.path[..level] {
            return false;
        }
        let own = target.path[level];
        let start = source.offset();
        let end = start + how_many;
        if target.path.len() == source.path.len() {
            own > start && own < end
        } else {
            own >= start && own < end
        }
    }

    fn apply_insert(tree: &mut Tree, position: &Position, nodes: &[Node]) -> Result<(), OperationError> {
        tree.parent_of_mut(position)?
            .insert_at(position.offset(), nodes.to_vec())?;
        Ok(())
    }

    fn apply_remove(tree: &mut Tree, position: &Position, size: usize) -> Result<Vec<Node>, OperationError> {
        Ok(tree
            .parent_of_mut(position)?
            .remove_at(position.offset(), size)?)
    }

    fn apply_move(tree: &mut Tree, source: &Position, how_many: usize, target: &Position) -> Result<(), OperationError> {
        let moved = Self::apply_remove(tree, source, how_many)?;
        let target = target
            .transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());

        let inserted = tree
            .parent_of_mut(&target)
            .and_then(|parent| parent.insert_at(target.offset(), moved.clone()));
        if let Err(err) = inserted {
            // Put the content back where it came from.
            Self::apply_insert(tree, source, &moved)?;
            return Err(err.into());
        }
        Ok(())
    }

    fn apply_split(tree: &mut Tree, position: &Position, name: &str, attributes: &Attributes) -> Result<(), OperationError> {
        let element_path = position.parent_path().to_vec();
        let tail = tree
            .element_at_path_mut(&position.root, &element_path)?
            .split_off(position.offset())?;

        let sibling = Element::new(name)
            .with_attributes(attributes.clone())
            .with_children(tail);
        let element = Position::new(position.root.clone(), element_path);
        tree.parent_of_mut(&element)?
            .insert_at(element.offset() + 1, vec![Node::Element(sibling)])?;
        Ok(())
    }

    fn apply_merge(tree: &mut Tree, position: &Position) -> Result<(), OperationError> {
        let at = position.offset();
        let parent = tree.parent_of_mut(position)?;
        let mut removed = parent.remove_at(at, 1)?;
        let children = match removed.first_mut() {
            Some(Node::Element(element)) => element.take_children(),
            _ => return Err(OperationError::InvalidStructure(format!("no element at {}", position))),
        };
        parent
            .element_at_offset_mut(at - 1)
            .ok_or_else(|| OperationError::InvalidStructure(format!("no element before {}", position)))?
            .append(children);
        Ok(())
    }
}

/// Whether the node at `node` is one of the `how_many` nodes starting at
/// `start`, or lies inside one of them.
fn covers_node(start: &Position, how_many: usize, node: &Position) -> bool {
    if start.root != node.root || start.path.is_empty() || node.path.len() < start.path.len() {
        return false;
    }
    let level = start.path.len() - 1;
    let own = node.path[level];
    node.path[..level] == start.path[..level] && own >= start.offset() && own < start.offset() + how_many
}

fn describe(node: Option<&Node>) -> String {
    match node {
        Some(Node::Element(element)) => format!("`{}`", element.name()),
        Some(Node::Text(_)) => "text".to_string(),
        None => "nothing".to_string(),
    }
}

fn split_transform(position: &Position, at: &Position) -> Position {
    let element = at.parent_path();
    let level = element.len();
    if level == 0 {
        return position.clone();
    }

    if position.root == at.root && position.path.len() > level && position.path[..level] == *element {
        let own = position.path[level];
        let deeper = position.path.len() > level + 1;
        if own > at.offset() || (own == at.offset() && deeper) {
            let mut path = element.to_vec();
            path[level - 1] += 1;
            path.push(own - at.offset());
            path.extend_from_slice(&position.path[level + 1..]);
            return Position::new(position.root.clone(), path);
        }
        return position.clone();
    }

    let after_element = Position::new(at.root.clone(), element.to_vec()).with_offset(element[level - 1] + 1);
    position.transformed_by_insertion(&after_element, 1, true)
}

fn merge_transform(position: &Position, at: &Position, offset: usize) -> Position {
    let parent = at.parent_path();
    let level = parent.len();
    let merged = at.offset();

    if position.root == at.root
        && position.path.len() > level + 1
        && position.path[..level] == *parent
        && position.path[level] == merged
        && merged > 0
    {
        let mut path = parent.to_vec();
        path.push(merged - 1);
        path.push(offset + position.path[level + 1]);
        path.extend_from_slice(&position.path[level + 2..]);
        return Position::new(position.root.clone(), path);
    }

    position
        .transformed_by_deletion(at, 1)
        .unwrap_or_else(|| position.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_model::data::{parse, stringify};

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    fn load(markup: &str) -> Tree {
        let mut tree = Tree::new();
        let data = parse(markup, "main").unwrap();
        tree.create_root("main", "$root").unwrap().append(data.nodes);
        tree
    }

    fn dump(tree: &Tree) -> String {
        stringify(tree.root("main").unwrap(), "main", None)
    }

    fn roundtrip(markup: &str, op: Operation, expected: &str) {
        let mut tree = load(markup);
        let mut markers = MarkerCollection::default();
        let applied = op.apply(&mut tree, &mut markers).unwrap();
        assert_eq!(dump(&tree), expected);
        applied.inverse().apply(&mut tree, &mut markers).unwrap();
        assert_eq!(dump(&tree), markup);
    }

    #[test]
    fn test_insert_and_inverse() {
        roundtrip(
            "<paragraph>foo</paragraph>",
            Operation::Insert {
                position: pos(&[0, 1]),
                nodes: vec![Node::Text(quire_model::Text::new("XY"))],
            },
            "<paragraph>fXYoo</paragraph>",
        );
    }

    #[test]
    fn test_remove_records_actual_nodes() {
        let mut tree = load("<paragraph>foobar</paragraph>");
        let mut markers = MarkerCollection::default();
        let op = Operation::Remove {
            position: pos(&[0, 1]),
            nodes: vec![Node::Text(quire_model::Text::new("???"))],
        };
        let applied = op.apply(&mut tree, &mut markers).unwrap();
        assert_eq!(dump(&tree), "<paragraph>far</paragraph>");
        applied.inverse().apply(&mut tree, &mut markers).unwrap();
        assert_eq!(dump(&tree), "<paragraph>foobar</paragraph>");
    }

    #[test]
    fn test_move_and_inverse() {
        roundtrip(
            "<a></a><b></b><c></c><d></d>",
            Operation::Move {
                source: pos(&[0]),
                how_many: 1,
                target: pos(&[3]),
            },
            "<b></b><c></c><a></a><d></d>",
        );
        roundtrip(
            "<paragraph>foo</paragraph><paragraph>bar</paragraph>",
            Operation::Move {
                source: pos(&[0, 1]),
                how_many: 2,
                target: pos(&[1, 0]),
            },
            "<paragraph>f</paragraph><paragraph>oobar</paragraph>",
        );
    }

    #[test]
    fn test_move_into_itself_fails() {
        let mut tree = load("<quote><paragraph>x</paragraph></quote>");
        let op = Operation::Move {
            source: pos(&[0]),
            how_many: 1,
            target: pos(&[0, 0]),
        };
        assert!(matches!(
            op.apply(&mut tree, &mut MarkerCollection::default()),
            Err(OperationError::MoveIntoItself(_))
        ));
    }

    #[test]
    fn test_rename_checks_old_name() {
        roundtrip(
            "<paragraph>x</paragraph>",
            Operation::Rename {
                position: pos(&[0]),
                old_name: "paragraph".into(),
                new_name: "heading".into(),
            },
            "<heading>x</heading>",
        );

        let mut tree = load("<paragraph>x</paragraph>");
        let wrong = Operation::Rename {
            position: pos(&[0]),
            old_name: "heading".into(),
            new_name: "paragraph".into(),
        };
        assert!(matches!(
            wrong.apply(&mut tree, &mut MarkerCollection::default()),
            Err(OperationError::ElementMismatch { .. })
        ));
    }

    #[test]
    fn test_attribute_change_and_mismatch() {
        roundtrip(
            "<paragraph>foobar</paragraph>",
            Operation::AttributeChange {
                range: Range::new(pos(&[0, 1]), pos(&[0, 3])).unwrap(),
                key: "bold".into(),
                old_value: None,
                new_value: Some("true".into()),
            },
            "<paragraph>f<$text bold=\"true\">oo</$text>bar</paragraph>",
        );

        let mut tree = load("<paragraph>f<$text bold=\"true\">oo</$text>bar</paragraph>");
        let conflicting = Operation::AttributeChange {
            range: Range::new(pos(&[0, 0]), pos(&[0, 3])).unwrap(),
            key: "bold".into(),
            old_value: None,
            new_value: Some("false".into()),
        };
        assert!(matches!(
            conflicting.apply(&mut tree, &mut MarkerCollection::default()),
            Err(OperationError::AttributeMismatch { .. })
        ));
    }

    #[test]
    fn test_attribute_change_needs_flat_range() {
        let mut tree = load("<paragraph>foo</paragraph><paragraph>bar</paragraph>");
        let op = Operation::AttributeChange {
            range: Range::new(pos(&[0, 1]), pos(&[1, 1])).unwrap(),
            key: "bold".into(),
            old_value: None,
            new_value: Some("true".into()),
        };
        assert!(op.apply(&mut tree, &mut MarkerCollection::default()).is_err());
    }

    #[test]
    fn test_split_and_merge_are_inverses() {
        roundtrip(
            "<paragraph align=\"left\">foobar</paragraph>",
            Operation::Split {
                position: pos(&[0, 3]),
                name: "paragraph".into(),
                attributes: [("align".to_string(), "left".to_string())].into(),
            },
            "<paragraph align=\"left\">foo</paragraph><paragraph align=\"left\">bar</paragraph>",
        );
        roundtrip(
            "<paragraph>foo</paragraph><heading>bar</heading>",
            Operation::Merge {
                position: pos(&[1]),
                offset: 3,
                name: "heading".into(),
                attributes: Attributes::new(),
            },
            "<paragraph>foobar</paragraph>",
        );
    }

    #[test]
    fn test_split_root_fails() {
        let mut tree = load("<paragraph>x</paragraph>");
        let op = Operation::Split {
            position: pos(&[1]),
            name: "paragraph".into(),
            attributes: Attributes::new(),
        };
        assert!(matches!(
            op.apply(&mut tree, &mut MarkerCollection::default()),
            Err(OperationError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_marker_change() {
        let mut tree = load("<paragraph>foo</paragraph>");
        let mut markers = MarkerCollection::default();
        let range = Range::new(pos(&[0, 0]), pos(&[0, 2])).unwrap();
        let add = Operation::MarkerChange {
            name: "comment:1".into(),
            old_range: None,
            new_range: Some(range.clone()),
        };
        add.apply(&mut tree, &mut markers).unwrap();
        assert_eq!(markers.get("comment:1"), Some(&range));

        // Applying the same change twice fails its precondition.
        assert!(matches!(
            add.apply(&mut tree, &mut markers),
            Err(OperationError::MarkerMismatch { .. })
        ));

        add.inverse().apply(&mut tree, &mut markers).unwrap();
        assert!(markers.get("comment:1").is_none());
    }

    #[test]
    fn test_transform_position_by_split_and_merge() {
        let split = Operation::Split {
            position: pos(&[0, 3]),
            name: "paragraph".into(),
            attributes: Attributes::new(),
        };
        assert_eq!(split.transform_position(&pos(&[0, 2])), Some(pos(&[0, 2])));
        assert_eq!(split.transform_position(&pos(&[0, 3])), Some(pos(&[0, 3])));
        assert_eq!(split.transform_position(&pos(&[0, 5])), Some(pos(&[1, 2])));
        assert_eq!(split.transform_position(&pos(&[1, 0])), Some(pos(&[2, 0])));

        let merge = split.inverse();
        assert_eq!(merge.transform_position(&pos(&[1, 2])), Some(pos(&[0, 5])));
        assert_eq!(merge.transform_position(&pos(&[2, 0])), Some(pos(&[1, 0])));
        assert_eq!(merge.transform_position(&pos(&[0, 1])), Some(pos(&[0, 1])));
    }

    #[test]
    fn test_transform_element_detects_removal() {
        let remove = Operation::Remove {
            position: pos(&[1]),
            nodes: vec![Node::Element(Element::new("paragraph"))],
        };
        assert_eq!(remove.transform_element(&pos(&[1])), None);
        assert_eq!(remove.transform_element(&pos(&[2])), Some(pos(&[1])));
        assert_eq!(remove.transform_element(&pos(&[0])), Some(pos(&[0])));
    }

    #[test]
    fn test_transform_element_ignores_content_changes_inside() {
        let insert = Operation::Insert {
            position: pos(&[1, 0]),
            nodes: vec![Node::Text(quire_model::Text::new("X"))],
        };
        assert_eq!(insert.transform_element(&pos(&[1])), Some(pos(&[1])));

        let before = Operation::Insert {
            position: pos(&[1]),
            nodes: vec![Node::Element(Element::new("paragraph"))],
        };
        assert_eq!(before.transform_element(&pos(&[1])), Some(pos(&[2])));
        assert_eq!(before.transform_element(&pos(&[1, 2])), Some(pos(&[2, 2])));
    }

    #[test]
    fn test_transform_element_through_move_split_and_merge() {
        let moved = Operation::Move {
            source: pos(&[0]),
            how_many: 1,
            target: pos(&[3]),
        };
        assert_eq!(moved.transform_element(&pos(&[0])), Some(pos(&[2])));
        assert_eq!(moved.transform_element(&pos(&[1])), Some(pos(&[0])));

        let split = Operation::Split {
            position: pos(&[0, 2]),
            name: "paragraph".to_string(),
            attributes: Attributes::new(),
        };
        assert_eq!(split.transform_element(&pos(&[0])), Some(pos(&[0])));
        assert_eq!(split.transform_element(&pos(&[0, 2])), Some(pos(&[1, 0])));
        assert_eq!(split.transform_element(&pos(&[1])), Some(pos(&[2])));

        let merge = Operation::Merge {
            position: pos(&[1]),
            offset: 3,
            name: "paragraph".to_string(),
            attributes: Attributes::new(),
        };
        assert_eq!(merge.transform_element(&pos(&[1])), None);
        assert_eq!(merge.transform_element(&pos(&[1, 0])), Some(pos(&[0, 3])));
        assert_eq!(merge.transform_element(&pos(&[2])), Some(pos(&[1])));
    }

    #[test]
    fn test_serialized_shape() {
        let op = Operation::Move {
            source: pos(&[0]),
            how_many: 2,
            target: pos(&[4]),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "move");
        assert_eq!(json["howMany"], 2);
        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }
}
