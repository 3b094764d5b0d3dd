//! # Schema
//!
//! Declares which elements may contain which children and which attributes
//! an item may carry. A schema is plain data owned by its document; there is
//! no process-wide registry.
//!
//! Rules compose by reference:
//! - `allow_in`: parents this item may be placed in
//! - `allow_where`: allowed wherever the named items are allowed
//! - `allow_content_of`: accepts whatever the named items accept
//! - `allow_attributes_of`: accepts the attributes of the named items
//! - `inherit_all_from`: all of the above plus the item flags

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::node::TEXT_NAME;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaItemDefinition {
    pub allow_in: Vec<String>,
    pub allow_where: Vec<String>,
    pub allow_content_of: Vec<String>,
    pub allow_attributes: Vec<String>,
    pub allow_attributes_of: Vec<String>,
    pub inherit_all_from: Option<String>,
    pub is_block: bool,
    pub is_inline: bool,
    pub is_object: bool,
    pub is_limit: bool,
}

impl SchemaItemDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_in(mut self, parent: impl Into<String>) -> Self {
        self.allow_in.push(parent.into());
        self
    }

    pub fn allow_where(mut self, item: impl Into<String>) -> Self {
        self.allow_where.push(item.into());
        self
    }

    pub fn allow_content_of(mut self, item: impl Into<String>) -> Self {
        self.allow_content_of.push(item.into());
        self
    }

    pub fn allow_attribute(mut self, key: impl Into<String>) -> Self {
        self.allow_attributes.push(key.into());
        self
    }

    pub fn allow_attributes_of(mut self, item: impl Into<String>) -> Self {
        self.allow_attributes_of.push(item.into());
        self
    }

    pub fn inherit_all_from(mut self, item: impl Into<String>) -> Self {
        self.inherit_all_from = Some(item.into());
        self
    }

    pub fn block(mut self) -> Self {
        self.is_block = true;
        self
    }

    pub fn inline(mut self) -> Self {
        self.is_inline = true;
        self
    }

    pub fn object(mut self) -> Self {
        self.is_object = true;
        self
    }

    pub fn limit(mut self) -> Self {
        self.is_limit = true;
        self
    }

    fn merge(&mut self, other: SchemaItemDefinition) {
        self.allow_in.extend(other.allow_in);
        self.allow_where.extend(other.allow_where);
        self.allow_content_of.extend(other.allow_content_of);
        self.allow_attributes.extend(other.allow_attributes);
        self.allow_attributes_of.extend(other.allow_attributes_of);
        if other.inherit_all_from.is_some() {
            self.inherit_all_from = other.inherit_all_from;
        }
        self.is_block |= other.is_block;
        self.is_inline |= other.is_inline;
        self.is_object |= other.is_object;
        self.is_limit |= other.is_limit;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    items: BTreeMap<String, SchemaItemDefinition>,
}

impl Schema {
    /// A schema with no items at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The generic items every document needs: `$root`, `$block`, `$text`
    /// and `$documentFragment`.
    pub fn new() -> Self {
        let mut schema = Self::empty();
        schema
            .items
            .insert("$root".into(), SchemaItemDefinition::new().limit());
        schema.items.insert(
            "$documentFragment".into(),
            SchemaItemDefinition::new().allow_content_of("$root").limit(),
        );
        schema
            .items
            .insert("$block".into(), SchemaItemDefinition::new().allow_in("$root").block());
        schema
            .items
            .insert(TEXT_NAME.into(), SchemaItemDefinition::new().allow_in("$block").inline());
        schema
    }

    pub fn register(&mut self, name: impl Into<String>, definition: SchemaItemDefinition) -> ModelResult<()> {
        let name = name.into();
        if self.items.contains_key(&name) {
            return Err(ModelError::DuplicateSchemaItem(name));
        }
        debug!(item = %name, "registered schema item");
        self.items.insert(name, definition);
        Ok(())
    }

    /// Add rules to an item, registering it if needed.
    pub fn extend(&mut self, name: impl Into<String>, definition: SchemaItemDefinition) {
        self.items.entry(name.into()).or_default().merge(definition);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Option<&SchemaItemDefinition> {
        self.items.get(name)
    }

    pub fn item_names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn is_block(&self, name: &str) -> bool {
        self.flag(name, |definition| definition.is_block)
    }

    pub fn is_inline(&self, name: &str) -> bool {
        self.flag(name, |definition| definition.is_inline)
    }

    pub fn is_object(&self, name: &str) -> bool {
        self.flag(name, |definition| definition.is_object)
    }

    pub fn is_limit(&self, name: &str) -> bool {
        self.flag(name, |definition| definition.is_limit)
    }

    /// May `child` be placed directly inside `parent`?
    pub fn check_child(&self, parent: &str, child: &str) -> bool {
        if !self.is_registered(child) || !self.is_registered(parent) {
            return false;
        }
        let parents = self.allowed_parents(child);
        self.content_sources(parent)
            .iter()
            .any(|source| parents.contains(source))
    }

    /// May `item` carry the attribute `key`?
    pub fn check_attribute(&self, item: &str, key: &str) -> bool {
        self.allowed_attributes(item).contains(key)
    }

    /// Index into `ancestors` (outermost first) of the innermost element
    /// that accepts `child`.
    pub fn find_allowed_parent(&self, ancestors: &[&str], child: &str) -> Option<usize> {
        ancestors
            .iter()
            .rposition(|ancestor| self.check_child(ancestor, child))
    }

    fn flag(&self, name: &str, get: impl Fn(&SchemaItemDefinition) -> bool + Copy) -> bool {
        let mut visited = BTreeSet::new();
        let mut current = Some(name.to_string());
        while let Some(name) = current {
            if !visited.insert(name.clone()) {
                break;
            }
            let Some(definition) = self.items.get(&name) else {
                break;
            };
            if get(definition) {
                return true;
            }
            current = definition.inherit_all_from.clone();
        }
        false
    }

    fn allowed_parents(&self, name: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.collect_parents(name, &mut BTreeSet::new(), &mut result);
        result
    }

    fn collect_parents(&self, name: &str, visited: &mut BTreeSet<String>, out: &mut BTreeSet<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(definition) = self.items.get(name) else {
            return;
        };
        out.extend(definition.allow_in.iter().cloned());
        for other in &definition.allow_where {
            self.collect_parents(other, visited, out);
        }
        if let Some(other) = &definition.inherit_all_from {
            self.collect_parents(other, visited, out);
        }
    }

    /// The item itself plus everything whose content it accepts.
    fn content_sources(&self, name: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.collect_content_sources(name, &mut result);
        result
    }

    fn collect_content_sources(&self, name: &str, out: &mut BTreeSet<String>) {
        if !out.insert(name.to_string()) {
            return;
        }
        let Some(definition) = self.items.get(name) else {
            return;
        };
        for other in &definition.allow_content_of {
            self.collect_content_sources(other, out);
        }
        if let Some(other) = &definition.inherit_all_from {
            self.collect_content_sources(other, out);
        }
    }

    fn allowed_attributes(&self, name: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.collect_attributes(name, &mut BTreeSet::new(), &mut result);
        result
    }

    fn collect_attributes(&self, name: &str, visited: &mut BTreeSet<String>, out: &mut BTreeSet<String>) {
        if !visited.insert(name.to_string()) {
            return;
        }
        let Some(definition) = self.items.get(name) else {
            return;
        };
        out.extend(definition.allow_attributes.iter().cloned());
        for other in &definition.allow_attributes_of {
            self.collect_attributes(other, visited, out);
        }
        if let Some(other) = &definition.inherit_all_from {
            self.collect_attributes(other, visited, out);
        }
    }
}
