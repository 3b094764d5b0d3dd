//! Named ranges that follow the content they cover.

use std::collections::BTreeMap;

use quire_model::Range;
use serde::{Deserialize, Serialize};

use crate::operation::Operation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerCollection {
    markers: BTreeMap<String, Range>,
}

impl MarkerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Range> {
        self.markers.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    /// Returns the previous range.
    pub fn set(&mut self, name: impl Into<String>, range: Range) -> Option<Range> {
        self.markers.insert(name.into(), range)
    }

    pub fn remove(&mut self, name: &str) -> Option<Range> {
        self.markers.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Range)> {
        self.markers.iter().map(|(name, range)| (name.as_str(), range))
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Markers named `group` or `group:*`.
    pub fn group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = (&'a str, &'a Range)> + 'a {
        self.iter().filter(move |(name, _)| {
            *name == group
                || name
                    .strip_prefix(group)
                    .is_some_and(|rest| rest.starts_with(':'))
        })
    }

    /// Markers whose range intersects or touches `range`.
    pub fn intersecting<'a>(&'a self, range: &'a Range) -> impl Iterator<Item = (&'a str, &'a Range)> + 'a {
        self.iter().filter(move |(_, marker)| {
            marker.root() == range.root()
                && !marker.end.is_before(&range.start)
                && !marker.start.is_after(&range.end)
        })
    }

    /// Move every marker along with a structural change. The marker named by
    /// a `MarkerChange` is left alone since that operation sets it directly.
    pub fn transform(&mut self, operation: &Operation) {
        let own = match operation {
            Operation::MarkerChange { name, .. } => Some(name.as_str()),
            _ => None,
        };
        for (name, range) in self.markers.iter_mut() {
            if Some(name.as_str()) != own {
                *range = operation.transform_range(range);
            }
        }
    }
}
