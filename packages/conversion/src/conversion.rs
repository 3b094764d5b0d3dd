//! Named conversion pipelines.
//!
//! One upcast pipeline reads data into the model. Two downcast pipelines
//! write the model out: `editingDowncast` feeds the editing view and
//! `dataDowncast` feeds `get_data`. The `downcast` group addresses both,
//! so a feature registers a converter once when both outputs agree.

use std::collections::BTreeMap;

use quire_common::Priority;

use crate::downcast::DowncastDispatcher;
use crate::errors::{ConversionError, ConversionResult};
use crate::helpers::{self, ElementDefinition, ViewCreator};
use crate::upcast::UpcastDispatcher;

pub const UPCAST: &str = "upcast";
pub const EDITING_DOWNCAST: &str = "editingDowncast";
pub const DATA_DOWNCAST: &str = "dataDowncast";
pub const DOWNCAST: &str = "downcast";

pub struct Conversion {
    upcast: BTreeMap<String, UpcastDispatcher>,
    downcast: BTreeMap<String, DowncastDispatcher>,
    groups: BTreeMap<String, Vec<String>>,
}

impl Conversion {
    pub fn new() -> Self {
        let mut conversion = Self {
            upcast: BTreeMap::new(),
            downcast: BTreeMap::new(),
            groups: BTreeMap::new(),
        };
        conversion.register_upcast(UPCAST);
        conversion.register_downcast(EDITING_DOWNCAST, &[DOWNCAST]);
        conversion.register_downcast(DATA_DOWNCAST, &[DOWNCAST]);
        conversion
    }

    pub fn register_upcast(&mut self, name: &str) {
        self.upcast.entry(name.to_string()).or_default();
    }

    /// Add a downcast pipeline, optionally as a member of `groups`.
    pub fn register_downcast(&mut self, name: &str, groups: &[&str]) {
        self.downcast.entry(name.to_string()).or_default();
        for group in groups {
            let members = self.groups.entry(group.to_string()).or_default();
            if !members.iter().any(|member| member == name) {
                members.push(name.to_string());
            }
        }
    }

    pub fn upcast_dispatcher(&self, name: &str) -> ConversionResult<&UpcastDispatcher> {
        self.upcast
            .get(name)
            .ok_or_else(|| ConversionError::UnknownPipeline(name.to_string()))
    }

    pub fn downcast_dispatcher(&self, name: &str) -> ConversionResult<&DowncastDispatcher> {
        self.downcast
            .get(name)
            .ok_or_else(|| ConversionError::UnknownPipeline(name.to_string()))
    }

    pub fn for_upcast(&mut self, name: &str) -> ConversionResult<UpcastHelpers<'_>> {
        let dispatcher = self
            .upcast
            .get_mut(name)
            .ok_or_else(|| ConversionError::UnknownPipeline(name.to_string()))?;
        Ok(UpcastHelpers {
            dispatchers: vec![dispatcher],
        })
    }

    /// Helpers for a downcast pipeline or for every pipeline of a group.
    pub fn for_downcast(&mut self, name: &str) -> ConversionResult<DowncastHelpers<'_>> {
        let names: Vec<String> = if self.downcast.contains_key(name) {
            vec![name.to_string()]
        } else {
            self.groups
                .get(name)
                .cloned()
                .ok_or_else(|| ConversionError::UnknownPipeline(name.to_string()))?
        };
        let dispatchers = self
            .downcast
            .iter_mut()
            .filter(|(pipeline, _)| names.contains(*pipeline))
            .map(|(_, dispatcher)| dispatcher)
            .collect();
        Ok(DowncastHelpers { dispatchers })
    }
}

impl Default for Conversion {
    fn default() -> Self {
        Self::new()
    }
}

pub struct UpcastHelpers<'a> {
    dispatchers: Vec<&'a mut UpcastDispatcher>,
}

impl UpcastHelpers<'_> {
    /// Register custom converters on every dispatcher.
    pub fn add(mut self, register: impl Fn(&mut UpcastDispatcher)) -> Self {
        for dispatcher in self.dispatchers.iter_mut() {
            register(dispatcher);
        }
        self
    }

    pub fn element_to_element(self, view: impl Into<ElementDefinition>, model: &str) -> Self {
        let view = view.into();
        self.add(|dispatcher| {
            helpers::upcast_element_to_element(dispatcher, view.clone(), model, Priority::Normal);
        })
    }

    pub fn attribute_to_attribute(self, view_key: &str, model_key: &str) -> Self {
        self.add(|dispatcher| {
            helpers::upcast_attribute_to_attribute(dispatcher, view_key, model_key);
        })
    }

    pub fn attribute_to_element(self, view: impl Into<ElementDefinition>, model_key: &str) -> Self {
        let view = view.into();
        self.add(|dispatcher| {
            helpers::upcast_attribute_to_element(dispatcher, view.clone(), model_key);
        })
    }
}

pub struct DowncastHelpers<'a> {
    dispatchers: Vec<&'a mut DowncastDispatcher>,
}

impl DowncastHelpers<'_> {
    pub fn add(mut self, register: impl Fn(&mut DowncastDispatcher)) -> Self {
        for dispatcher in self.dispatchers.iter_mut() {
            register(dispatcher);
        }
        self
    }

    pub fn element_to_element(self, model: &str, view: impl Into<ViewCreator>) -> Self {
        let view = view.into();
        self.add(|dispatcher| {
            helpers::downcast_element_to_element(dispatcher, model, view.clone(), Priority::Normal);
        })
    }

    pub fn attribute_to_attribute(self, model_key: &str, view_key: &str) -> Self {
        self.add(|dispatcher| {
            helpers::downcast_attribute_to_attribute(dispatcher, model_key, view_key);
        })
    }

    pub fn attribute_to_element(self, model_key: &str, view: impl Into<ElementDefinition>) -> Self {
        let view = view.into();
        self.add(|dispatcher| {
            helpers::downcast_attribute_to_element(dispatcher, model_key, view.clone());
        })
    }

    pub fn marker_to_element(self, group: &str, view: impl Into<ElementDefinition>) -> Self {
        let view = view.into();
        self.add(|dispatcher| {
            helpers::downcast_marker_to_element(dispatcher, group, view.clone());
        })
    }

    /// Number of pipelines these helpers write to.
    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_reaches_both_downcast_pipelines() {
        let mut conversion = Conversion::new();
        assert_eq!(conversion.for_downcast(DOWNCAST).unwrap().len(), 2);
        assert_eq!(conversion.for_downcast(DATA_DOWNCAST).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_pipeline() {
        let mut conversion = Conversion::new();
        assert!(matches!(
            conversion.for_downcast("print"),
            Err(ConversionError::UnknownPipeline(name)) if name == "print"
        ));
        assert!(conversion.for_upcast("clipboard").is_err());

        conversion.register_upcast("clipboard");
        assert!(conversion.for_upcast("clipboard").is_ok());
    }
}
