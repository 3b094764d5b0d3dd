//! Positions are offset paths from a root.
//!
//! The last path entry is an offset inside the parent, every earlier entry
//! is the offset of the ancestor element inside its own parent. Positions
//! hold no references into the tree; after a change they are transformed
//! explicitly with the `transformed_by_*` family.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub root: String,
    pub path: Vec<usize>,
}

impl Position {
    pub fn new(root: impl Into<String>, path: Vec<usize>) -> Self {
        Self {
            root: root.into(),
            path,
        }
    }

    /// Position at `offset` inside the element addressed by `parent_path`.
    pub fn in_parent(root: impl Into<String>, parent_path: &[usize], offset: usize) -> Self {
        let mut path = parent_path.to_vec();
        path.push(offset);
        Self::new(root, path)
    }

    pub fn offset(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    pub fn set_offset(&mut self, offset: usize) {
        if let Some(last) = self.path.last_mut() {
            *last = offset;
        }
    }

    pub fn with_offset(&self, offset: usize) -> Position {
        let mut position = self.clone();
        position.set_offset(offset);
        position
    }

    /// Move the offset by `delta`; `None` when it would go negative.
    pub fn shifted_by(&self, delta: isize) -> Option<Position> {
        let offset = self.offset().checked_add_signed(delta)?;
        Some(self.with_offset(offset))
    }

    /// Path of the element containing this position.
    pub fn parent_path(&self) -> &[usize] {
        &self.path[..self.path.len().saturating_sub(1)]
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn has_same_parent_as(&self, other: &Position) -> bool {
        self.root == other.root && self.parent_path() == other.parent_path()
    }

    /// Document order. Positions in different roots are unordered.
    pub fn compare(&self, other: &Position) -> Option<Ordering> {
        if self.root != other.root {
            return None;
        }
        Some(self.path.cmp(&other.path))
    }

    pub fn is_before(&self, other: &Position) -> bool {
        self.compare(other) == Some(Ordering::Less)
    }

    pub fn is_after(&self, other: &Position) -> bool {
        self.compare(other) == Some(Ordering::Greater)
    }

    /// Length of the shared path prefix.
    pub fn common_path_len(&self, other: &Position) -> usize {
        self.path
            .iter()
            .zip(&other.path)
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Depth index at which a change at `at` affects this position, if any.
    fn affected_level(&self, at: &Position) -> Option<usize> {
        if self.root != at.root || at.path.is_empty() {
            return None;
        }
        let level = at.path.len() - 1;
        if self.path.len() <= level || self.path[..level] != at.path[..level] {
            return None;
        }
        Some(level)
    }

    /// Account for `how_many` offsets inserted at `at`.
    ///
    /// With `stick_to_next` a position equal to `at` moves past the inserted
    /// content; otherwise it stays in front of it.
    pub fn transformed_by_insertion(&self, at: &Position, how_many: usize, stick_to_next: bool) -> Position {
        let mut result = self.clone();
        let Some(level) = self.affected_level(at) else {
            return result;
        };

        let offset = at.offset();
        let own = self.path[level];
        let deeper = self.path.len() > at.path.len();
        if offset < own || (offset == own && (stick_to_next || deeper)) {
            result.path[level] += how_many;
        }
        result
    }

    /// Account for `how_many` offsets removed at `at`.
    ///
    /// Returns `None` when this position was inside the removed content.
    pub fn transformed_by_deletion(&self, at: &Position, how_many: usize) -> Option<Position> {
        let mut result = self.clone();
        let Some(level) = self.affected_level(at) else {
            return Some(result);
        };

        let start = at.offset();
        let end = start + how_many;
        let own = self.path[level];

        if self.path.len() == at.path.len() {
            if own <= start {
                return Some(result);
            }
            if own >= end {
                result.path[level] -= how_many;
                return Some(result);
            }
            return None;
        }

        if own < start {
            Some(result)
        } else if own >= end {
            result.path[level] -= how_many;
            Some(result)
        } else {
            None
        }
    }

    /// Account for `how_many` offsets moved from `source` to `target`.
    ///
    /// `target` is expressed in coordinates from before the move. Positions
    /// inside the moved content travel with it; a position equal to
    /// `source` stays where it is.
    pub fn transformed_by_move(&self, source: &Position, target: &Position, how_many: usize) -> Position {
        let target_after = target
            .transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());

        match self.transformed_by_deletion(source, how_many) {
            None => self.combined(source, &target_after),
            Some(position) => position.transformed_by_insertion(&target_after, how_many, true),
        }
    }

    /// Re-root the part of this path below `source` at `target`.
    pub fn combined(&self, source: &Position, target: &Position) -> Position {
        let level = source.path.len() - 1;
        let mut path = target.path.clone();
        if let Some(last) = path.last_mut() {
            *last += self.path[level] - source.offset();
        }
        path.extend_from_slice(&self.path[level + 1..]);
        Position::new(target.root.clone(), path)
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.root, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    #[test]
    fn test_document_order() {
        assert!(pos(&[1]).is_before(&pos(&[1, 0])));
        assert!(pos(&[1, 5]).is_before(&pos(&[2])));
        assert!(pos(&[0, 3]).is_after(&pos(&[0, 2, 7])));
        assert_eq!(pos(&[1]).compare(&Position::new("other", vec![1])), None);
    }

    #[test]
    fn test_insertion_shifts_positions_at_or_after() {
        let at = pos(&[0, 2]);
        assert_eq!(pos(&[0, 1]).transformed_by_insertion(&at, 3, true), pos(&[0, 1]));
        assert_eq!(pos(&[0, 2]).transformed_by_insertion(&at, 3, true), pos(&[0, 5]));
        assert_eq!(pos(&[0, 2]).transformed_by_insertion(&at, 3, false), pos(&[0, 2]));
        assert_eq!(pos(&[0, 4]).transformed_by_insertion(&at, 3, true), pos(&[0, 7]));
        // Inside a node that starts at the insertion point.
        assert_eq!(pos(&[0, 2, 1]).transformed_by_insertion(&at, 3, false), pos(&[0, 5, 1]));
        // Unrelated branch.
        assert_eq!(pos(&[1, 4]).transformed_by_insertion(&at, 3, true), pos(&[1, 4]));
        // Ancestor level.
        assert_eq!(pos(&[0]).transformed_by_insertion(&at, 3, true), pos(&[0]));
    }

    #[test]
    fn test_insertion_at_ancestor_level() {
        let at = pos(&[1]);
        assert_eq!(pos(&[1, 2]).transformed_by_insertion(&at, 2, false), pos(&[3, 2]));
        assert_eq!(pos(&[0, 2]).transformed_by_insertion(&at, 2, true), pos(&[0, 2]));
    }

    #[test]
    fn test_deletion() {
        let at = pos(&[0, 2]);
        assert_eq!(pos(&[0, 1]).transformed_by_deletion(&at, 2), Some(pos(&[0, 1])));
        assert_eq!(pos(&[0, 2]).transformed_by_deletion(&at, 2), Some(pos(&[0, 2])));
        assert_eq!(pos(&[0, 3]).transformed_by_deletion(&at, 2), None);
        assert_eq!(pos(&[0, 4]).transformed_by_deletion(&at, 2), Some(pos(&[0, 2])));
        assert_eq!(pos(&[0, 6]).transformed_by_deletion(&at, 2), Some(pos(&[0, 4])));
        // Inside a removed element.
        assert_eq!(pos(&[0, 2, 0]).transformed_by_deletion(&at, 1), None);
        assert_eq!(pos(&[0, 3, 1]).transformed_by_deletion(&at, 1), Some(pos(&[0, 2, 1])));
    }

    #[test]
    fn test_move_forward_in_same_parent() {
        // [A, B, C, D]: move A before D.
        let source = pos(&[0]);
        let target = pos(&[3]);
        assert_eq!(pos(&[0, 1]).transformed_by_move(&source, &target, 1), pos(&[2, 1]));
        assert_eq!(pos(&[1, 0]).transformed_by_move(&source, &target, 1), pos(&[0, 0]));
        assert_eq!(pos(&[3, 0]).transformed_by_move(&source, &target, 1), pos(&[3, 0]));
    }

    #[test]
    fn test_move_into_other_parent() {
        // Move two characters out of the first paragraph into the second.
        let source = pos(&[0, 1]);
        let target = pos(&[1, 0]);
        assert_eq!(pos(&[0, 2]).transformed_by_move(&source, &target, 2), pos(&[1, 1]));
        assert_eq!(pos(&[0, 3]).transformed_by_move(&source, &target, 2), pos(&[0, 1]));
        assert_eq!(pos(&[1, 0]).transformed_by_move(&source, &target, 2), pos(&[1, 2]));
        assert_eq!(pos(&[0, 1]).transformed_by_move(&source, &target, 2), pos(&[0, 1]));
    }

    #[test]
    fn test_shifted_by() {
        assert_eq!(pos(&[0, 2]).shifted_by(-2), Some(pos(&[0, 0])));
        assert_eq!(pos(&[0, 2]).shifted_by(-3), None);
        assert_eq!(pos(&[0, 2]).shifted_by(4), Some(pos(&[0, 6])));
    }
}
