//! Host environment: windows, tabs, and their notifications.
//!
//! The waiters only ever see the host through the three observer traits
//! below and the query methods of [`BrowserHost`]. Observers are held by
//! `Weak` reference; nothing here owns an observer, and no observer owns a
//! window or tab. Identity is by [`WindowId`]/[`TabId`]: a destroyed
//! object's id stays a valid value, but every lookup on it returns
//! [`TabWaitError::UnknownTab`](crate::TabWaitError::UnknownTab) (or the
//! window equivalent) instead of dangling.
//!
//! All notifications are delivered synchronously on the calling thread,
//! except load completion, which [`BrowserHost::navigate`] posts to the
//! [`EventLoop`](crate::EventLoop) as a task.

mod browser_host;
mod observer_list;

pub use browser_host::{BrowserHost, Subscription};
pub use observer_list::ObserverId;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a top-level window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(u64);

impl WindowId {
    /// Wrap a raw id
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Stable identity of a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(u64);

impl TabId {
    /// Wrap a raw id
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab#{}", self.0)
    }
}

/// Why a tab left a tab strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoveReason {
    /// Detached for insertion elsewhere; the tab lives on
    Detached,
    /// The tab is about to be destroyed
    Deleted,
}

/// A change to one window's ordered tab list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabStripChange {
    /// A tab was inserted (new, or moved in from another window)
    Inserted {
        /// Inserted tab
        tab: TabId,
        /// Index it now occupies
        index: usize,
    },
    /// A tab was removed
    Removed {
        /// Removed tab
        tab: TabId,
        /// Index it occupied
        index: usize,
        /// Whether it survives the removal
        reason: RemoveReason,
    },
    /// A tab was swapped for another in place
    Replaced {
        /// Outgoing tab
        old: TabId,
        /// Incoming tab
        new: TabId,
        /// Shared index
        index: usize,
    },
}

/// Window creation and removal
pub trait BrowserListObserver {
    /// A window was created
    fn on_window_added(&self, _window: WindowId) {}

    /// A window was removed; its tabs are already gone
    fn on_window_removed(&self, _window: WindowId) {}
}

/// Changes to one window's tab strip
pub trait TabStripObserver {
    /// The strip of `window` changed
    fn on_tab_strip_changed(&self, window: WindowId, change: &TabStripChange);
}

/// Per-tab lifecycle
pub trait TabObserver {
    /// A top-level navigation to `url` started
    fn did_start_navigation(&self, _tab: TabId, _url: &str) {}

    /// The tab finished loading its current URL
    fn did_stop_loading(&self, _tab: TabId) {}

    /// The tab is being destroyed; its id goes stale after this returns
    fn tab_destroyed(&self, _tab: TabId) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(WindowId::from_raw(3).to_string(), "window#3");
        assert_eq!(TabId::from_raw(12).to_string(), "tab#12");
    }

    #[test]
    fn test_id_ordering_follows_raw() {
        assert!(TabId::from_raw(1) < TabId::from_raw(2));
        assert_eq!(WindowId::from_raw(9).raw(), 9);
    }

    #[test]
    fn test_tab_strip_change_json() {
        let change = TabStripChange::Removed {
            tab: TabId::from_raw(4),
            index: 0,
            reason: RemoveReason::Detached,
        };
        let json = serde_json::to_string(&change).unwrap_or_default();
        assert_eq!(
            json,
            r#"{"Removed":{"tab":4,"index":0,"reason":"Detached"}}"#
        );
    }
}
