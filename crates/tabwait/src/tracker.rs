//! Collection membership tracker.
//!
//! [`AllTabsObserver`] follows every tab of every window: those that exist
//! when [`AllTabsObserver::add_all_browsers`] runs and those created later,
//! including tabs of windows opened after the scan. Each tab it meets is
//! handed once to a [`TabProcessor`], which decides whether the tab matters
//! to the wait and may keep a per-tab [`TabInterest`] alive for as long as
//! the tab is tracked.
//!
//! ## Invariants
//!
//! - Every live tab attached to a scanned window has exactly one entry.
//! - A tab moved between windows keeps its entry; it is not reprocessed.
//! - An entry is erased inside the host's destruction notification for its
//!   tab, before the tab id goes stale.
//! - The tracker holds ids and `Weak`-backed subscriptions only; it never
//!   keeps a window or tab alive.

use crate::condition::Condition;
use crate::host::{
    BrowserHost, BrowserListObserver, Subscription, TabId, TabObserver, TabStripChange,
    TabStripObserver, WindowId,
};
use crate::result::TabWaitResult;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Per-tab state a processor keeps alive while its tab is tracked
pub trait TabInterest {
    /// One-line description for stall diagnostics
    fn describe(&self) -> String;
}

/// What the tracker asks about each tab
pub trait TabProcessor {
    /// Called once per tracked tab.
    ///
    /// Return `None` when the tab is irrelevant. The processor may call
    /// [`TrackerContext::condition_met`] before returning.
    fn process_one_contents(
        &self,
        tab: TabId,
        cx: &TrackerContext<'_>,
    ) -> Option<Box<dyn TabInterest>>;

    /// What the wait is for, used in errors
    fn describe(&self) -> String;
}

/// Access a [`TabProcessor`] gets while processing a tab
#[derive(Debug)]
pub struct TrackerContext<'a> {
    host: &'a BrowserHost,
    condition: &'a Condition,
}

impl TrackerContext<'_> {
    /// The host being observed
    #[must_use]
    pub fn host(&self) -> &BrowserHost {
        self.host
    }

    /// The tracker's condition; clone it into per-tab observers
    #[must_use]
    pub fn condition(&self) -> &Condition {
        self.condition
    }

    /// Signal the tracker's condition
    pub fn condition_met(&self) {
        self.condition.signal();
    }
}

struct TrackingEntry {
    interest: Option<Box<dyn TabInterest>>,
    _destruction: Subscription,
}

struct TrackerInner<P: TabProcessor + 'static> {
    entries: RefCell<BTreeMap<TabId, TrackingEntry>>,
    windows: RefCell<BTreeMap<WindowId, Subscription>>,
    browser_list: RefCell<Option<Subscription>>,
    scanned: Cell<bool>,
    condition: Condition,
    processor: P,
    host: BrowserHost,
    weak_self: Weak<TrackerInner<P>>,
}

impl<P: TabProcessor + 'static> TrackerInner<P> {
    fn add_browser(&self, window: WindowId) -> TabWaitResult<()> {
        if self.windows.borrow().contains_key(&window) {
            return Ok(());
        }
        let Some(this) = self.weak_self.upgrade() else {
            return Ok(());
        };
        let subscription = self.host.observe_tab_strip(window, this)?;
        self.windows.borrow_mut().insert(window, subscription);
        tracing::debug!(%window, "tracking window");

        for tab in self.host.tabs_in(window)? {
            // A processor may close or move tabs, or the window, mid-scan.
            if !self.host.contains_window(window) {
                break;
            }
            if self.host.window_of(tab).ok().flatten() != Some(window) {
                continue;
            }
            self.add_web_contents(tab)?;
        }
        Ok(())
    }

    fn add_web_contents(&self, tab: TabId) -> TabWaitResult<()> {
        if self.entries.borrow().contains_key(&tab) {
            tracing::trace!(%tab, "tab already tracked");
            return Ok(());
        }
        let Some(this) = self.weak_self.upgrade() else {
            return Ok(());
        };
        let destruction = self.host.observe_tab(tab, this)?;
        // Claim the slot before calling out so re-entrant inserts see it.
        self.entries.borrow_mut().insert(
            tab,
            TrackingEntry {
                interest: None,
                _destruction: destruction,
            },
        );

        let cx = TrackerContext {
            host: &self.host,
            condition: &self.condition,
        };
        let interest = self.processor.process_one_contents(tab, &cx);
        tracing::debug!(%tab, interested = interest.is_some(), "tracking tab");

        let unclaimed = {
            let mut entries = self.entries.borrow_mut();
            match entries.get_mut(&tab) {
                Some(entry) => {
                    entry.interest = interest;
                    None
                }
                // Destroyed while being processed.
                None => interest,
            }
        };
        drop(unclaimed);
        Ok(())
    }

    fn untrack(&self, tab: TabId) {
        let entry = self.entries.borrow_mut().remove(&tab);
        if entry.is_some() {
            tracing::debug!(%tab, "untracking destroyed tab");
        }
        drop(entry);
    }

    fn tracked_dump(&self) -> Vec<String> {
        let mut dump: Vec<String> = self
            .windows
            .borrow()
            .keys()
            .map(|window| format!("{window}"))
            .collect();
        dump.extend(self.entries.borrow().iter().map(|(tab, entry)| {
            let place = match self.host.window_of(*tab) {
                Ok(Some(window)) => format!(" in {window}"),
                _ => " detached".to_string(),
            };
            match &entry.interest {
                Some(interest) => format!("{tab}{place}: {}", interest.describe()),
                None => format!("{tab}{place}"),
            }
        }));
        dump
    }
}

impl<P: TabProcessor + 'static> BrowserListObserver for TrackerInner<P> {
    fn on_window_added(&self, window: WindowId) {
        if !self.scanned.get() {
            return;
        }
        if let Err(err) = self.add_browser(window) {
            tracing::warn!(%window, %err, "could not track new window");
        }
    }

    fn on_window_removed(&self, window: WindowId) {
        let subscription = self.windows.borrow_mut().remove(&window);
        if subscription.is_some() {
            tracing::debug!(%window, "window gone");
        }
        drop(subscription);
    }
}

impl<P: TabProcessor + 'static> TabStripObserver for TrackerInner<P> {
    fn on_tab_strip_changed(&self, window: WindowId, change: &TabStripChange) {
        let added = match change {
            TabStripChange::Inserted { tab, .. } => *tab,
            TabStripChange::Replaced { new, .. } => *new,
            // Deleted tabs leave through `tab_destroyed`; detached ones keep
            // their entry for the insert that follows.
            TabStripChange::Removed { .. } => return,
        };
        if let Err(err) = self.add_web_contents(added) {
            tracing::warn!(%window, tab = %added, %err, "could not track inserted tab");
        }
    }
}

impl<P: TabProcessor + 'static> TabObserver for TrackerInner<P> {
    fn tab_destroyed(&self, tab: TabId) {
        self.untrack(tab);
    }
}

/// Tracks every tab of every window and exposes one condition to wait on
pub struct AllTabsObserver<P: TabProcessor + 'static> {
    inner: Rc<TrackerInner<P>>,
}

impl<P: TabProcessor + 'static> fmt::Debug for AllTabsObserver<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllTabsObserver")
            .field("waiting_for", &self.inner.processor.describe())
            .field("scanned", &self.inner.scanned.get())
            .field("tabs", &self.tracked_tabs())
            .field("condition", &self.inner.condition)
            .finish()
    }
}

impl<P: TabProcessor + 'static> AllTabsObserver<P> {
    /// Subscribe to window events on `host`. Tracking starts with
    /// [`add_all_browsers`](Self::add_all_browsers).
    pub fn new(host: &BrowserHost, processor: P) -> Self {
        let inner = Rc::new_cyclic(|weak_self| TrackerInner {
            entries: RefCell::new(BTreeMap::new()),
            windows: RefCell::new(BTreeMap::new()),
            browser_list: RefCell::new(None),
            scanned: Cell::new(false),
            condition: Condition::new(),
            processor,
            host: host.clone(),
            weak_self: weak_self.clone(),
        });
        let subscription = host.observe_browser_list(inner.clone());
        *inner.browser_list.borrow_mut() = Some(subscription);
        Self { inner }
    }

    /// Scan every existing window and its tabs.
    ///
    /// # Panics
    ///
    /// Debug builds panic on a second call.
    pub fn add_all_browsers(&self) -> TabWaitResult<()> {
        debug_assert!(
            !self.inner.scanned.get(),
            "add_all_browsers() must run exactly once"
        );
        self.inner.scanned.set(true);
        for window in self.inner.host.windows() {
            // A processor may close windows mid-scan.
            if self.inner.host.contains_window(window) {
                self.inner.add_browser(window)?;
            }
        }
        Ok(())
    }

    /// Signal the condition; repeat calls are no-ops
    pub fn condition_met(&self) {
        self.inner.condition.signal();
    }

    /// Whether the condition has been signalled
    #[must_use]
    pub fn is_condition_met(&self) -> bool {
        self.inner.condition.is_met()
    }

    /// The shared condition
    #[must_use]
    pub fn condition(&self) -> &Condition {
        &self.inner.condition
    }

    /// Pump the host's event loop until the condition is met.
    ///
    /// # Panics
    ///
    /// Debug builds panic if [`add_all_browsers`](Self::add_all_browsers)
    /// has not run.
    pub fn wait(&self) -> TabWaitResult<()> {
        debug_assert!(
            self.inner.scanned.get(),
            "add_all_browsers() must run before wait()"
        );
        let inner = &self.inner;
        inner.condition.wait(
            inner.host.event_loop(),
            inner.host.config(),
            &inner.processor.describe(),
            || inner.tracked_dump(),
        )
    }

    /// The processor
    #[must_use]
    pub fn processor(&self) -> &P {
        &self.inner.processor
    }

    /// The observed host
    #[must_use]
    pub fn host(&self) -> &BrowserHost {
        &self.inner.host
    }

    /// Tracked tabs in id order
    #[must_use]
    pub fn tracked_tabs(&self) -> Vec<TabId> {
        self.inner.entries.borrow().keys().copied().collect()
    }

    /// Windows whose strips are observed, in id order
    #[must_use]
    pub fn tracked_windows(&self) -> Vec<WindowId> {
        self.inner.windows.borrow().keys().copied().collect()
    }

    /// Whether `tab` has an entry
    #[must_use]
    pub fn is_tracking(&self, tab: TabId) -> bool {
        self.inner.entries.borrow().contains_key(&tab)
    }

    /// Whether the processor kept an interest observer for `tab`
    #[must_use]
    pub fn has_interest(&self, tab: TabId) -> bool {
        self.inner
            .entries
            .borrow()
            .get(&tab)
            .is_some_and(|entry| entry.interest.is_some())
    }

    /// Diagnostic lines describing tracked windows and tabs
    #[must_use]
    pub fn tracked_dump(&self) -> Vec<String> {
        self.inner.tracked_dump()
    }
}
