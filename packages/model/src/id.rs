use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an element, stable across moves and edits.
///
/// Ids are never part of structural equality. They exist so that side
/// tables (model to view mapping, split bookkeeping) can follow an element
/// while its position changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(u64);

impl ElementId {
    /// Allocate the next sequential id.
    pub fn next() -> Self {
        ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = ElementId::next();
        let b = ElementId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(a.to_string(), format!("e{}", a.value()));
    }
}
