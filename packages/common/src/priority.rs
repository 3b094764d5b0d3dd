use serde::{Deserialize, Serialize};

/// Ordering hint for listeners attached to the same event.
///
/// Higher priorities run first. Listeners sharing a priority run in the
/// order they were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
    Custom(i32),
}

impl Priority {
    pub fn value(self) -> i32 {
        match self {
            Priority::Highest => 100_000,
            Priority::High => 1_000,
            Priority::Normal => 0,
            Priority::Low => -1_000,
            Priority::Lowest => -100_000,
            Priority::Custom(value) => value,
        }
    }
}

/// Handle returned when a listener is registered. Used to detach it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Entry<L> {
    id: ListenerId,
    priority: i32,
    is_default: bool,
    listener: L,
}

/// Listeners for a single event, kept sorted by priority.
pub struct ListenerList<L> {
    entries: Vec<Entry<L>>,
    next_id: u64,
}

impl<L> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

impl<L> ListenerList<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: L, priority: Priority) -> ListenerId {
        self.insert(listener, priority, false)
    }

    /// Register a listener that is skipped once an earlier listener has
    /// called [`EventInfo::prevent_default`].
    pub fn add_default(&mut self, listener: L, priority: Priority) -> ListenerId {
        self.insert(listener, priority, true)
    }

    fn insert(&mut self, listener: L, priority: Priority, is_default: bool) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        let priority = priority.value();
        let index = self
            .entries
            .iter()
            .position(|entry| entry.priority < priority)
            .unwrap_or(self.entries.len());

        self.entries.insert(
            index,
            Entry {
                id,
                priority,
                is_default,
                listener,
            },
        );
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before != self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(listener, is_default)` pairs in call order.
    pub fn iter(&self) -> impl Iterator<Item = (&L, bool)> {
        self.entries
            .iter()
            .map(|entry| (&entry.listener, entry.is_default))
    }

    /// Merge several lists into one call order.
    ///
    /// Priority decides first. On ties, lists earlier in `lists` win, so
    /// callers pass the most specific event name first.
    pub fn merged<'a>(lists: &[&'a ListenerList<L>]) -> Vec<(&'a L, bool)> {
        let mut all: Vec<(i32, usize, usize, &'a Entry<L>)> = Vec::new();
        for (list_index, list) in lists.iter().enumerate() {
            for (position, entry) in list.entries.iter().enumerate() {
                all.push((entry.priority, list_index, position, entry));
            }
        }

        all.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        all.into_iter()
            .map(|(_, _, _, entry)| (&entry.listener, entry.is_default))
            .collect()
    }
}
