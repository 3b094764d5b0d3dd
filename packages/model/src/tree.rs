//! The set of named roots and position resolution against them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::id::ElementId;
use crate::node::{Element, Node, Text};
use crate::position::Position;
use crate::range::Range;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    roots: BTreeMap<String, Element>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty root called `name` whose element is `element_name`.
    pub fn create_root(&mut self, name: impl Into<String>, element_name: impl Into<String>) -> ModelResult<&mut Element> {
        let name = name.into();
        if self.roots.contains_key(&name) {
            return Err(ModelError::DuplicateRoot(name));
        }
        Ok(self
            .roots
            .entry(name)
            .or_insert_with(|| Element::new(element_name)))
    }

    pub fn has_root(&self, name: &str) -> bool {
        self.roots.contains_key(name)
    }

    pub fn root_names(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn root(&self, name: &str) -> ModelResult<&Element> {
        self.roots
            .get(name)
            .ok_or_else(|| ModelError::RootNotFound(name.to_string()))
    }

    pub fn root_mut(&mut self, name: &str) -> ModelResult<&mut Element> {
        self.roots
            .get_mut(name)
            .ok_or_else(|| ModelError::RootNotFound(name.to_string()))
    }

    /// Position just past the last child of `root`.
    pub fn root_end(&self, root: &str) -> ModelResult<Position> {
        Ok(Position::new(root, vec![self.root(root)?.max_offset()]))
    }

    /// Element addressed by an offset path; the empty path is the root.
    pub fn element_at_path(&self, root: &str, path: &[usize]) -> ModelResult<&Element> {
        let mut element = self.root(root)?;
        for (depth, offset) in path.iter().enumerate() {
            element = element.element_at_offset(*offset).ok_or_else(|| {
                ModelError::invalid_position(
                    &Position::new(root, path[..=depth].to_vec()),
                    "no element at this offset",
                )
            })?;
        }
        Ok(element)
    }

    pub fn element_at_path_mut(&mut self, root: &str, path: &[usize]) -> ModelResult<&mut Element> {
        let mut element = self.root_mut(root)?;
        for (depth, offset) in path.iter().enumerate() {
            element = element.element_at_offset_mut(*offset).ok_or_else(|| {
                ModelError::invalid_position(
                    &Position::new(root, path[..=depth].to_vec()),
                    "no element at this offset",
                )
            })?;
        }
        Ok(element)
    }

    /// The element containing `position`, after checking the offset.
    pub fn parent_of(&self, position: &Position) -> ModelResult<&Element> {
        if position.path.is_empty() {
            return Err(ModelError::invalid_position(position, "empty path"));
        }
        let parent = self.element_at_path(&position.root, position.parent_path())?;
        if position.offset() > parent.max_offset() {
            return Err(ModelError::invalid_position(
                position,
                format!("offset exceeds parent size {}", parent.max_offset()),
            ));
        }
        Ok(parent)
    }

    pub fn parent_of_mut(&mut self, position: &Position) -> ModelResult<&mut Element> {
        self.parent_of(position)?;
        self.element_at_path_mut(&position.root, position.parent_path())
    }

    pub fn validate(&self, position: &Position) -> ModelResult<()> {
        self.parent_of(position).map(|_| ())
    }

    pub fn validate_range(&self, range: &Range) -> ModelResult<()> {
        self.validate(&range.start)?;
        self.validate(&range.end)
    }

    /// The node starting at `position`.
    pub fn node_after(&self, position: &Position) -> ModelResult<Option<&Node>> {
        Ok(self.parent_of(position)?.node_after_offset(position.offset()))
    }

    /// The node ending at `position`.
    pub fn node_before(&self, position: &Position) -> ModelResult<Option<&Node>> {
        Ok(self.parent_of(position)?.node_before_offset(position.offset()))
    }

    /// Text node that `position` lies strictly inside of.
    pub fn text_at(&self, position: &Position) -> ModelResult<Option<&Text>> {
        let parent = self.parent_of(position)?;
        Ok(match parent.child_at_offset(position.offset()) {
            Some((Node::Text(text), inner)) if inner > 0 => Some(text),
            _ => None,
        })
    }

    /// The node right after `position`, failing when there is none.
    pub fn node_at_position(&self, position: &Position) -> ModelResult<&Node> {
        self.parent_of(position)?
            .child_at_offset(position.offset())
            .map(|(node, _)| node)
            .ok_or_else(|| ModelError::invalid_position(position, "no node at this position"))
    }

    /// Names of the root element and every ancestor of `position`, outermost first.
    pub fn ancestor_names(&self, position: &Position) -> ModelResult<Vec<&str>> {
        let parent_path = position.parent_path();
        let mut names = Vec::with_capacity(parent_path.len() + 1);
        let mut element = self.root(&position.root)?;
        names.push(element.name());
        for (depth, offset) in parent_path.iter().enumerate() {
            element = element.element_at_offset(*offset).ok_or_else(|| {
                ModelError::invalid_position(
                    &Position::new(position.root.clone(), parent_path[..=depth].to_vec()),
                    "no element at this offset",
                )
            })?;
            names.push(element.name());
        }
        Ok(names)
    }

    /// Offset path of the element with `id`, searching every root.
    pub fn find_element(&self, id: ElementId) -> Option<(String, Vec<usize>)> {
        for (name, root) in &self.roots {
            if root.id() == id {
                return Some((name.clone(), Vec::new()));
            }
            if let Some(path) = root.path_of(id) {
                return Some((name.clone(), path));
            }
        }
        None
    }

    /// Cover `range` with the fewest flat ranges, in document order.
    pub fn flat_ranges(&self, range: &Range) -> ModelResult<Vec<Range>> {
        self.validate_range(range)?;
        let root = range.root().to_string();
        let common = range.start.common_path_len(&range.end);
        let mut ranges = Vec::new();

        let mut path = range.start.path.clone();

        // Climb out of the start branch.
        while path.len() > common + 1 {
            let parent = self.element_at_path(&root, &path[..path.len() - 1])?;
            let offset = path[path.len() - 1];
            let max = parent.max_offset();
            if max > offset {
                ranges.push(Range::flat(root.clone(), &path[..path.len() - 1], offset, max)?);
            }
            path.pop();
            if let Some(last) = path.last_mut() {
                *last += 1;
            }
        }

        // Descend into the end branch.
        while path.len() <= range.end.path.len() {
            let depth = path.len() - 1;
            let target = range.end.path[depth];
            let offset = path[depth];
            if target > offset {
                ranges.push(Range::flat(root.clone(), &path[..depth], offset, target)?);
            }
            path[depth] = target;
            path.push(0);
        }

        Ok(ranges)
    }

    /// Total offsets covered by a flat range, or an error for other ranges.
    pub fn flat_size(&self, range: &Range) -> ModelResult<usize> {
        range
            .flat_len()
            .ok_or_else(|| ModelError::invalid_range("range is not flat"))
    }

    /// Copy of the content covered by a flat range.
    pub fn slice(&self, range: &Range) -> ModelResult<Vec<Node>> {
        let size = self.flat_size(range)?;
        self.parent_of(&range.start)?
            .slice(range.start.offset(), size)
    }
}
