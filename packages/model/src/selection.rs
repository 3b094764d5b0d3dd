use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::position::Position;
use crate::range::Range;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub range: Range,
    /// Anchor at `end`, focus at `start`.
    #[serde(default)]
    pub backward: bool,
}

/// An ordered set of non-intersecting ranges. The most recently added
/// range carries the anchor and focus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ranges: Vec<SelectionRange>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collapsed_at(position: Position) -> Self {
        Self::from_range(Range::collapsed(position), false)
    }

    pub fn from_range(range: Range, backward: bool) -> Self {
        Self {
            ranges: vec![SelectionRange { range, backward }],
        }
    }

    pub fn add_range(&mut self, range: Range, backward: bool) -> ModelResult<()> {
        if self.ranges.iter().any(|existing| existing.range.intersects(&range)) {
            return Err(ModelError::IntersectingRanges);
        }
        self.ranges.retain(|existing| existing.range != range);
        self.ranges.push(SelectionRange { range, backward });
        Ok(())
    }

    pub fn set_ranges(&mut self, ranges: Vec<Range>, backward: bool) -> ModelResult<()> {
        let mut selection = Selection::new();
        for range in ranges {
            selection.add_range(range, backward)?;
        }
        *self = selection;
        Ok(())
    }

    pub fn remove_all_ranges(&mut self) {
        self.ranges.clear();
    }

    pub fn ranges(&self) -> impl Iterator<Item = &Range> {
        self.ranges.iter().map(|entry| &entry.range)
    }

    pub fn entries(&self) -> &[SelectionRange] {
        &self.ranges
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Earliest range in document order.
    pub fn first_range(&self) -> Option<&Range> {
        self.ranges()
            .min_by(|a, b| a.start.path.cmp(&b.start.path))
    }

    /// Latest range in document order.
    pub fn last_range(&self) -> Option<&Range> {
        self.ranges()
            .max_by(|a, b| a.start.path.cmp(&b.start.path))
    }

    pub fn is_backward(&self) -> bool {
        self.ranges.last().is_some_and(|entry| entry.backward)
    }

    pub fn is_collapsed(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].range.is_collapsed()
    }

    pub fn anchor(&self) -> Option<&Position> {
        self.ranges.last().map(|entry| {
            if entry.backward {
                &entry.range.end
            } else {
                &entry.range.start
            }
        })
    }

    pub fn focus(&self) -> Option<&Position> {
        self.ranges.last().map(|entry| {
            if entry.backward {
                &entry.range.start
            } else {
                &entry.range.end
            }
        })
    }

    /// Replace everything with a caret at `position`.
    pub fn collapse(&mut self, position: Position) {
        *self = Selection::collapsed_at(position);
    }

    pub fn collapse_to_start(&mut self) {
        if let Some(range) = self.first_range() {
            let start = range.start.clone();
            self.collapse(start);
        }
    }

    pub fn collapse_to_end(&mut self) {
        if let Some(range) = self.last_range() {
            let end = range.end.clone();
            self.collapse(end);
        }
    }

    /// Keep the anchor of the last range and move its focus.
    pub fn set_focus(&mut self, focus: Position) -> ModelResult<()> {
        let anchor = self
            .anchor()
            .cloned()
            .ok_or_else(|| ModelError::invalid_range("cannot set focus on an empty selection"))?;

        self.ranges.pop();
        let (range, backward) = if focus.is_before(&anchor) {
            (Range::new(focus, anchor)?, true)
        } else {
            (Range::new(anchor, focus)?, false)
        };
        self.add_range(range, backward)
    }

    /// Apply `transform` to every range, dropping duplicates and merging
    /// ranges that start to overlap.
    pub fn map_ranges(&mut self, mut transform: impl FnMut(&Range) -> Range) {
        let mut mapped: Vec<SelectionRange> = Vec::with_capacity(self.ranges.len());
        for entry in &self.ranges {
            let range = transform(&entry.range);
            match mapped.iter_mut().find(|other| other.range.intersects(&range) || other.range == range) {
                Some(other) => {
                    let start = if range.start.is_before(&other.range.start) {
                        range.start.clone()
                    } else {
                        other.range.start.clone()
                    };
                    let end = if range.end.is_after(&other.range.end) {
                        range.end.clone()
                    } else {
                        other.range.end.clone()
                    };
                    other.range = Range { start, end };
                }
                None => mapped.push(SelectionRange {
                    range,
                    backward: entry.backward,
                }),
            }
        }
        self.ranges = mapped;
    }
}
