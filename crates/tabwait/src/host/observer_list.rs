//! Non-owning observer lists.

use std::fmt;
use std::rc::{Rc, Weak};

/// Identity of one registration in an observer list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Ordered list of `Weak` observers.
///
/// Dispatchers take [`ObserverList::ids`] first and resolve each id with
/// [`ObserverList::get`] right before the call, so an observer removed by
/// an earlier observer in the same dispatch is skipped.
pub(crate) struct ObserverList<T: ?Sized> {
    next_id: u64,
    entries: Vec<(ObserverId, Weak<T>)>,
}

impl<T: ?Sized> Default for ObserverList<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for ObserverList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<T: ?Sized> ObserverList<T> {
    pub(crate) fn add(&mut self, observer: Weak<T>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        // Dead entries are dropped lazily here rather than on every dispatch.
        self.entries.retain(|(_, weak)| weak.strong_count() > 0);
        self.entries.push((id, observer));
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn ids(&self) -> Vec<ObserverId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn get(&self, id: ObserverId) -> Option<Rc<T>> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .and_then(|(_, weak)| weak.upgrade())
    }

    /// Registrations whose observer is still alive
    pub(crate) fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }
}
