//! Result and error types for Tabwait.

use crate::host::{TabId, WindowId};
use thiserror::Error;

/// Result type for Tabwait operations
pub type TabWaitResult<T> = Result<T, TabWaitError>;

/// Errors that can occur in Tabwait
#[derive(Debug, Error)]
pub enum TabWaitError {
    /// Window id does not name a live window
    #[error("Unknown window: {window}")]
    UnknownWindow {
        /// Stale or foreign window id
        window: WindowId,
    },

    /// Tab id does not name a live tab
    #[error("Unknown tab: {tab}")]
    UnknownTab {
        /// Stale or foreign tab id
        tab: TabId,
    },

    /// Tab is not attached to any window
    #[error("Tab {tab} is not attached to a window")]
    TabDetached {
        /// Detached tab
        tab: TabId,
    },

    /// Tab is already attached to a window
    #[error("Tab {tab} is already attached to {window}")]
    TabAttached {
        /// Attached tab
        tab: TabId,
        /// Window currently owning the tab
        window: WindowId,
    },

    /// Insertion index past the end of a tab strip
    #[error("Index {index} out of range for {window} with {len} tabs")]
    TabIndexOutOfRange {
        /// Target window
        window: WindowId,
        /// Requested index
        index: usize,
        /// Current tab count
        len: usize,
    },

    /// The event loop ran dry before the awaited condition was met
    #[error("Event loop went idle while waiting for {waited_for}{}", format_tracked(.tracked))]
    LoopIdle {
        /// Description of the waiter
        waited_for: String,
        /// Diagnostic dump of tracked tabs and windows
        tracked: Vec<String>,
    },

    /// The configured task budget for a single wait was exhausted
    #[error("Ran {limit} tasks without satisfying {waited_for}")]
    TaskBudgetExhausted {
        /// Configured task limit
        limit: usize,
        /// Description of the waiter
        waited_for: String,
    },

    /// A waiter reached a state its contract rules out
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn format_tracked(tracked: &[String]) -> String {
    if tracked.is_empty() {
        String::new()
    } else {
        format!(" (tracking: {})", tracked.join(", "))
    }
}
