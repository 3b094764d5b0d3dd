//! Bookkeeping of which parts of an item a converter already handled.
//!
//! A part is a plain string: `name`, `attribute:<key>`, `class:<name>` for
//! view elements; `insert`, `attribute:<key>`, `addMarker` for model items.
//! Converters test a part before acting and consume it when they do, so
//! two converters never handle the same part.

use std::collections::BTreeMap;

use crate::view::{ViewData, ViewDocument, ViewId};

#[derive(Debug, Clone)]
pub struct Consumable<K> {
    items: BTreeMap<K, BTreeMap<String, bool>>,
}

impl<K> Default for Consumable<K> {
    fn default() -> Self {
        Self { items: BTreeMap::new() }
    }
}

impl<K: Ord + Clone> Consumable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, part: impl Into<String>) {
        self.items.entry(key).or_default().insert(part.into(), true);
    }

    /// `None` when the part was never added, otherwise whether it is still
    /// available.
    pub fn test(&self, key: &K, part: &str) -> Option<bool> {
        self.items.get(key).and_then(|parts| parts.get(part)).copied()
    }

    pub fn consume(&mut self, key: &K, part: &str) -> bool {
        match self.items.get_mut(key).and_then(|parts| parts.get_mut(part)) {
            Some(available) if *available => {
                *available = false;
                true
            }
            _ => false,
        }
    }

    /// Consume every part or none of them.
    pub fn consume_all(&mut self, key: &K, parts: &[String]) -> bool {
        if !parts.iter().all(|part| self.test(key, part) == Some(true)) {
            return false;
        }
        for part in parts {
            self.consume(key, part);
        }
        true
    }

    /// Make a consumed part available again.
    pub fn revert(&mut self, key: &K, part: &str) -> bool {
        match self.items.get_mut(key).and_then(|parts| parts.get_mut(part)) {
            Some(available) if !*available => {
                *available = true;
                true
            }
            _ => false,
        }
    }
}

impl Consumable<ViewId> {
    /// Register `id` and all its descendants with every part they have.
    pub fn from_view(view: &ViewDocument, id: ViewId) -> Self {
        let mut consumable = Self::new();
        consumable.add_view_tree(view, id);
        consumable
    }

    fn add_view_tree(&mut self, view: &ViewDocument, id: ViewId) {
        let Ok(node) = view.node(id) else {
            return;
        };
        match &node.data {
            ViewData::Text(_) => self.add(id, "name"),
            ViewData::Element(element) => {
                self.add(id, "name");
                for key in element.attributes.keys() {
                    self.add(id, format!("attribute:{key}"));
                }
                for class in &element.classes {
                    self.add(id, format!("class:{class}"));
                }
            }
        }
        for child in node.children() {
            self.add_view_tree(view, *child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_once() {
        let mut consumable: Consumable<u32> = Consumable::new();
        consumable.add(1, "insert");

        assert_eq!(consumable.test(&1, "insert"), Some(true));
        assert!(consumable.consume(&1, "insert"));
        assert!(!consumable.consume(&1, "insert"));
        assert_eq!(consumable.test(&1, "insert"), Some(false));
        assert_eq!(consumable.test(&2, "insert"), None);

        assert!(consumable.revert(&1, "insert"));
        assert_eq!(consumable.test(&1, "insert"), Some(true));
    }

    #[test]
    fn test_consume_all_is_atomic() {
        let mut consumable: Consumable<u32> = Consumable::new();
        consumable.add(1, "name");
        consumable.add(1, "class:a");

        let parts = vec!["name".to_string(), "class:b".to_string()];
        assert!(!consumable.consume_all(&1, &parts));
        assert_eq!(consumable.test(&1, "name"), Some(true));
    }

    #[test]
    fn test_view_parts() {
        let mut view = ViewDocument::new();
        let fragment = view.parse_fragment(r#"<p class="x" data-id="1">a</p>"#).unwrap();
        let p = view.children(fragment)[0];

        let consumable = Consumable::from_view(&view, fragment);
        assert_eq!(consumable.test(&p, "name"), Some(true));
        assert_eq!(consumable.test(&p, "class:x"), Some(true));
        assert_eq!(consumable.test(&p, "attribute:data-id"), Some(true));
    }
}
