use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::position::Position;

/// Span between two positions of the same root, `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> ModelResult<Self> {
        if start.root != end.root {
            return Err(ModelError::invalid_range(format!(
                "{} and {} are in different roots",
                start, end
            )));
        }
        if start.path.is_empty() || end.path.is_empty() {
            return Err(ModelError::invalid_range("positions must have a path"));
        }
        if start.is_after(&end) {
            return Err(ModelError::invalid_range(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            start: position.clone(),
            end: position,
        }
    }

    /// Range over `start..end` inside one parent.
    pub fn flat(root: impl Into<String>, parent_path: &[usize], start: usize, end: usize) -> ModelResult<Self> {
        let root = root.into();
        Self::new(
            Position::in_parent(root.clone(), parent_path, start),
            Position::in_parent(root, parent_path, end),
        )
    }

    pub fn root(&self) -> &str {
        &self.start.root
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Both ends share a parent.
    pub fn is_flat(&self) -> bool {
        self.start.has_same_parent_as(&self.end)
    }

    /// Offset span of a flat range.
    pub fn flat_len(&self) -> Option<usize> {
        self.is_flat()
            .then(|| self.end.offset().saturating_sub(self.start.offset()))
    }

    /// Strictly between the boundaries.
    pub fn contains_position(&self, position: &Position) -> bool {
        position.is_after(&self.start) && position.is_before(&self.end)
    }

    pub fn contains_range(&self, other: &Range) -> bool {
        self.root() == other.root()
            && !other.start.is_before(&self.start)
            && !other.end.is_after(&self.end)
    }

    pub fn intersects(&self, other: &Range) -> bool {
        self.start.is_before(&other.end) && other.start.is_before(&self.end)
    }

    /// Shift for inserted content. Insertion at the end boundary is not
    /// absorbed; a collapsed range moves like a position.
    pub fn transformed_by_insertion(&self, at: &Position, how_many: usize) -> Range {
        if self.is_collapsed() {
            return Range::collapsed(self.start.transformed_by_insertion(at, how_many, true));
        }
        let start = self.start.transformed_by_insertion(at, how_many, true);
        let end = self.end.transformed_by_insertion(at, how_many, false);
        order(start, end)
    }

    /// Shrink for removed content; boundaries inside it collapse onto `at`.
    pub fn transformed_by_deletion(&self, at: &Position, how_many: usize) -> Range {
        let start = self
            .start
            .transformed_by_deletion(at, how_many)
            .unwrap_or_else(|| at.clone());
        let end = self
            .end
            .transformed_by_deletion(at, how_many)
            .unwrap_or_else(|| at.clone());
        order(start, end)
    }

    /// Follow moved content. A range only partly inside the moved content
    /// keeps the part that stayed.
    pub fn transformed_by_move(&self, source: &Position, target: &Position, how_many: usize) -> Range {
        let start = self.start.transformed_by_move(source, target, how_many);
        let end = self.end.transformed_by_move(source, target, how_many);
        if let Ok(range) = Range::new(start, end) {
            return range;
        }

        let target_after = target
            .transformed_by_deletion(source, how_many)
            .unwrap_or_else(|| target.clone());
        self.transformed_by_deletion(source, how_many)
            .transformed_by_insertion(&target_after, how_many)
    }
}

fn order(start: Position, end: Position) -> Range {
    if end.is_before(&start) {
        Range {
            start: end.clone(),
            end,
        }
    } else {
        Range { start, end }
    }
}
