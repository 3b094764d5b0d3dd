//! # Event emitter
//!
//! Named events with prioritized listeners. Event names are namespaced
//! with `:`; firing `insert:paragraph` also reaches listeners attached to
//! `insert`. Each listener receives a shared context and a mutable payload.
//!
//! ```rust,ignore
//! let mut emitter: Emitter<Vec<String>, String, ()> = Emitter::new();
//! emitter.on("change", Priority::Normal, |_info, log, data| {
//!     log.push(data.clone());
//!     Ok(())
//! });
//! emitter.fire("change:text", &mut log, &mut "hello".to_string())?;
//! ```

use std::collections::HashMap;

use tracing::trace;

use crate::priority::{ListenerId, ListenerList, Priority};

/// Per-firing state handed to each listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInfo {
    name: String,
    stopped: bool,
    default_prevented: bool,
}

impl EventInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stopped: false,
            default_prevented: false,
        }
    }

    /// Full name of the fired event, including namespaces.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// No further listeners run for this firing.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Listeners registered as default behavior are skipped from now on.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

pub type Listener<C, D, E> = Box<dyn Fn(&mut EventInfo, &mut C, &mut D) -> Result<(), E>>;

/// Split `a:b:c` into `["a:b:c", "a:b", "a"]`.
pub fn namespaces(event: &str) -> Vec<&str> {
    let mut names = vec![event];
    let mut current = event;
    while let Some(index) = current.rfind(':') {
        current = &current[..index];
        names.push(current);
    }
    names
}

pub struct Emitter<C, D, E> {
    events: HashMap<String, ListenerList<Listener<C, D, E>>>,
}

impl<C, D, E> Default for Emitter<C, D, E> {
    fn default() -> Self {
        Self {
            events: HashMap::new(),
        }
    }
}

impl<C, D, E> Emitter<C, D, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, event: &str, priority: Priority, listener: F) -> ListenerId
    where
        F: Fn(&mut EventInfo, &mut C, &mut D) -> Result<(), E> + 'static,
    {
        self.events
            .entry(event.to_string())
            .or_default()
            .add(Box::new(listener), priority)
    }

    /// Attach default behavior. See [`EventInfo::prevent_default`].
    pub fn on_default<F>(&mut self, event: &str, priority: Priority, listener: F) -> ListenerId
    where
        F: Fn(&mut EventInfo, &mut C, &mut D) -> Result<(), E> + 'static,
    {
        self.events
            .entry(event.to_string())
            .or_default()
            .add_default(Box::new(listener), priority)
    }

    pub fn off(&mut self, event: &str, id: ListenerId) -> bool {
        self.events
            .get_mut(event)
            .map(|list| list.remove(id))
            .unwrap_or(false)
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        namespaces(event)
            .into_iter()
            .any(|name| self.events.get(name).is_some_and(|list| !list.is_empty()))
    }

    /// Run every listener for `event` and its parent namespaces.
    ///
    /// The first listener error aborts the firing and is returned.
    pub fn fire(&self, event: &str, context: &mut C, data: &mut D) -> Result<EventInfo, E> {
        let mut info = EventInfo::new(event);

        let lists: Vec<_> = namespaces(event)
            .into_iter()
            .filter_map(|name| self.events.get(name))
            .collect();

        for (listener, is_default) in ListenerList::merged(&lists) {
            if info.is_stopped() {
                break;
            }
            if is_default && info.is_default_prevented() {
                trace!(event, "skipping default listener");
                continue;
            }
            listener(&mut info, context, data)?;
        }

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<String>;

    fn push(label: &'static str) -> impl Fn(&mut EventInfo, &mut Log, &mut ()) -> Result<(), ()> {
        move |_info, log, _data| {
            log.push(label.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_namespaces() {
        assert_eq!(
            namespaces("attribute:bold:$text"),
            vec!["attribute:bold:$text", "attribute:bold", "attribute"]
        );
        assert_eq!(namespaces("remove"), vec!["remove"]);
    }

    #[test]
    fn test_fire_reaches_parent_namespace() {
        let mut emitter: Emitter<Log, (), ()> = Emitter::new();
        emitter.on("insert", Priority::Normal, push("generic"));
        emitter.on("insert:paragraph", Priority::Normal, push("specific"));
        emitter.on("insert:heading", Priority::Normal, push("other"));

        let mut log = Vec::new();
        emitter.fire("insert:paragraph", &mut log, &mut ()).unwrap();
        assert_eq!(log, vec!["specific", "generic"]);
    }

    #[test]
    fn test_stop_halts_remaining_listeners() {
        let mut emitter: Emitter<Log, (), ()> = Emitter::new();
        emitter.on("change", Priority::High, |info, log: &mut Log, _| {
            log.push("high".into());
            info.stop();
            Ok(())
        });
        emitter.on("change", Priority::Normal, push("normal"));

        let mut log = Vec::new();
        let info = emitter.fire("change", &mut log, &mut ()).unwrap();
        assert!(info.is_stopped());
        assert_eq!(log, vec!["high"]);
    }

    #[test]
    fn test_prevent_default_skips_default_listeners_only() {
        let mut emitter: Emitter<Log, (), ()> = Emitter::new();
        emitter.on_default("delete", Priority::Normal, push("default"));
        emitter.on("delete", Priority::High, |info, log: &mut Log, _| {
            log.push("override".into());
            info.prevent_default();
            Ok(())
        });
        emitter.on("delete", Priority::Low, push("observer"));

        let mut log = Vec::new();
        emitter.fire("delete", &mut log, &mut ()).unwrap();
        assert_eq!(log, vec!["override", "observer"]);
    }

    #[test]
    fn test_listener_error_aborts_firing() {
        let mut emitter: Emitter<Log, (), &'static str> = Emitter::new();
        emitter.on("save", Priority::High, |_, _, _| Err("boom"));
        emitter.on("save", Priority::Normal, |_, log: &mut Log, _| {
            log.push("unreachable".into());
            Ok(())
        });

        let mut log = Vec::new();
        assert_eq!(emitter.fire("save", &mut log, &mut ()), Err("boom"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_off_detaches_listener() {
        let mut emitter: Emitter<Log, (), ()> = Emitter::new();
        let id = emitter.on("change", Priority::Normal, push("a"));
        assert!(emitter.has_listeners("change"));
        assert!(emitter.off("change", id));
        assert!(!emitter.has_listeners("change"));
    }
}
