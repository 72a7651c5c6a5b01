//! Wait for a window to be added or removed.

use crate::condition::Condition;
use crate::host::{BrowserHost, BrowserListObserver, Subscription, WindowId};
use crate::result::{TabWaitError, TabWaitResult};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Kind of window-list change to wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// A window was opened
    Added,
    /// A window was closed
    Removed,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

#[derive(Debug)]
struct ChangeRecorder {
    target: Option<WindowId>,
    change: ChangeType,
    condition: Condition,
    window: Cell<Option<WindowId>>,
}

impl ChangeRecorder {
    fn record(&self, window: WindowId, change: ChangeType) {
        if change != self.change || self.window.get().is_some() {
            return;
        }
        if self.target.is_some_and(|target| target != window) {
            return;
        }
        tracing::debug!(%window, %change, "window change observed");
        self.window.set(Some(window));
        self.condition.signal();
    }
}

impl BrowserListObserver for ChangeRecorder {
    fn on_window_added(&self, window: WindowId) {
        self.record(window, ChangeType::Added);
    }

    fn on_window_removed(&self, window: WindowId) {
        self.record(window, ChangeType::Removed);
    }
}

/// Completes on the first matching window-list change after construction.
///
/// With `target: None` any window matches. For [`ChangeType::Removed`] the
/// returned id is already stale; host lookups on it fail with
/// [`TabWaitError::UnknownWindow`].
#[derive(Debug)]
pub struct BrowserChangeObserver {
    host: BrowserHost,
    recorder: Rc<ChangeRecorder>,
    _subscription: Subscription,
}

impl BrowserChangeObserver {
    /// Watch the window list of `host`
    #[must_use]
    pub fn new(host: &BrowserHost, target: Option<WindowId>, change: ChangeType) -> Self {
        let recorder = Rc::new(ChangeRecorder {
            target,
            change,
            condition: Condition::new(),
            window: Cell::new(None),
        });
        let subscription = host.observe_browser_list(recorder.clone());
        Self {
            host: host.clone(),
            recorder,
            _subscription: subscription,
        }
    }

    /// Block until the change happens; returns the window it happened to
    pub fn wait(&self) -> TabWaitResult<WindowId> {
        let waited_for = match self.recorder.target {
            Some(window) => format!("{window} {}", self.recorder.change),
            None => format!("any window {}", self.recorder.change),
        };
        self.recorder.condition.wait(
            self.host.event_loop(),
            self.host.config(),
            &waited_for,
            Vec::new,
        )?;
        self.recorder
            .window
            .get()
            .ok_or_else(|| TabWaitError::InvalidState {
                message: "window change wait released without a window".to_string(),
            })
    }

    /// The matched window, if the change already happened
    #[must_use]
    pub fn window(&self) -> Option<WindowId> {
        self.recorder.window.get()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_any_window_added() {
        let host = BrowserHost::new();
        let observer = BrowserChangeObserver::new(&host, None, ChangeType::Added);
        host.post_task(|host| {
            host.create_window();
        });

        let window = observer.wait().unwrap();
        assert!(host.contains_window(window));
    }

    #[test]
    fn test_removed_returns_stale_id() {
        let host = BrowserHost::new();
        let window = host.create_window();
        let observer = BrowserChangeObserver::new(&host, None, ChangeType::Removed);
        host.post_task(move |host| host.close_window(window).unwrap());

        assert_eq!(observer.wait().unwrap(), window);
        assert!(matches!(
            host.tabs_in(window),
            Err(TabWaitError::UnknownWindow { .. })
        ));
    }

    #[test]
    fn test_targeted_ignores_other_windows() {
        let host = BrowserHost::new();
        let w1 = host.create_window();
        let w2 = host.create_window();
        let observer = BrowserChangeObserver::new(&host, Some(w2), ChangeType::Removed);

        host.close_window(w1).unwrap();
        assert_eq!(observer.window(), None);

        host.close_window(w2).unwrap();
        assert_eq!(observer.wait().unwrap(), w2);
    }

    #[test]
    fn test_added_ignores_removals() {
        let host = BrowserHost::new();
        let window = host.create_window();
        let observer = BrowserChangeObserver::new(&host, None, ChangeType::Added);
        host.close_window(window).unwrap();

        let err = observer.wait().unwrap_err();
        assert!(err.to_string().contains("any window added"));
    }

    #[test]
    fn test_change_type_display() {
        assert_eq!(ChangeType::Added.to_string(), "added");
        assert_eq!(ChangeType::Removed.to_string(), "removed");
    }
}
