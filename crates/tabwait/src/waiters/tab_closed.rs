//! Wait for one tab to be destroyed.

use crate::condition::Condition;
use crate::host::{BrowserHost, Subscription, TabId, TabObserver};
use crate::result::TabWaitResult;
use std::rc::Rc;

#[derive(Debug)]
struct DestructionWatcher {
    condition: Condition,
}

impl TabObserver for DestructionWatcher {
    fn tab_destroyed(&self, tab: TabId) {
        tracing::debug!(%tab, "watched tab closed");
        self.condition.signal();
    }
}

/// Completes when `tab` is destroyed.
///
/// A tab that is already gone at construction completes the wait at once.
/// Moving the tab to another window does not count as closing it.
#[derive(Debug)]
pub struct TabClosedWaiter {
    host: BrowserHost,
    tab: TabId,
    watcher: Rc<DestructionWatcher>,
    _subscription: Option<Subscription>,
}

impl TabClosedWaiter {
    /// Watch `tab` on `host`
    #[must_use]
    pub fn new(host: &BrowserHost, tab: TabId) -> Self {
        let watcher = Rc::new(DestructionWatcher {
            condition: Condition::new(),
        });
        let subscription = match host.observe_tab(tab, watcher.clone()) {
            Ok(subscription) => Some(subscription),
            Err(_) => {
                watcher.condition.signal();
                None
            }
        };
        Self {
            host: host.clone(),
            tab,
            watcher,
            _subscription: subscription,
        }
    }

    /// Block until the tab is gone
    pub fn wait(&self) -> TabWaitResult<()> {
        self.watcher.condition.wait(
            self.host.event_loop(),
            self.host.config(),
            &format!("{} closed", self.tab),
            Vec::new,
        )
    }

    /// Whether the tab has been destroyed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.watcher.condition.is_met()
    }
}
