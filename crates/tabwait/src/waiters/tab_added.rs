//! Wait for a tab to be inserted into one window or into any window.

use crate::condition::Condition;
use crate::host::{
    BrowserHost, BrowserListObserver, Subscription, TabId, TabStripChange, TabStripObserver,
    WindowId,
};
use crate::result::{TabWaitError, TabWaitResult};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Which tab [`AllBrowserTabAddedWaiter::wait`] reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddedTabSelection {
    /// The tab whose insertion completed the wait
    #[default]
    TriggeringTab,
    /// The last tab inserted before `wait()` returned
    MostRecent,
}

#[derive(Debug, Default)]
struct InsertionRecorder {
    condition: Condition,
    first: Cell<Option<TabId>>,
    last: Cell<Option<TabId>>,
    count: Cell<usize>,
}

impl InsertionRecorder {
    fn record(&self, window: WindowId, change: &TabStripChange) {
        let TabStripChange::Inserted { tab, .. } = change else {
            return;
        };
        tracing::debug!(%tab, %window, "tab added");
        if self.first.get().is_none() {
            self.first.set(Some(*tab));
        }
        self.last.set(Some(*tab));
        self.count.set(self.count.get() + 1);
        self.condition.signal();
    }

    fn wait(&self, host: &BrowserHost, waited_for: &str) -> TabWaitResult<()> {
        self.condition
            .wait(host.event_loop(), host.config(), waited_for, Vec::new)
    }

    fn released(&self, tab: Option<TabId>) -> TabWaitResult<TabId> {
        tab.ok_or_else(|| TabWaitError::InvalidState {
            message: "tab-added wait released without an inserted tab".to_string(),
        })
    }
}

impl TabStripObserver for InsertionRecorder {
    fn on_tab_strip_changed(&self, window: WindowId, change: &TabStripChange) {
        self.record(window, change);
    }
}

/// Completes on the first tab inserted into one window after construction,
/// including a tab moved in from another window.
#[derive(Debug)]
pub struct TabAddedWaiter {
    host: BrowserHost,
    window: WindowId,
    recorder: Rc<InsertionRecorder>,
    _subscription: Subscription,
}

impl TabAddedWaiter {
    /// Watch the tab strip of `window`
    pub fn new(host: &BrowserHost, window: WindowId) -> TabWaitResult<Self> {
        let recorder = Rc::new(InsertionRecorder::default());
        let subscription = host.observe_tab_strip(window, recorder.clone())?;
        Ok(Self {
            host: host.clone(),
            window,
            recorder,
            _subscription: subscription,
        })
    }

    /// Block until a tab is inserted; returns the first one
    pub fn wait(&self) -> TabWaitResult<TabId> {
        self.recorder
            .wait(&self.host, &format!("tab added to {}", self.window))?;
        self.recorder.released(self.recorder.first.get())
    }

    /// Insertions seen so far
    #[must_use]
    pub fn insertions(&self) -> usize {
        self.recorder.count.get()
    }
}

struct AllStripsObserver {
    recorder: InsertionRecorder,
    host: BrowserHost,
    strips: RefCell<BTreeMap<WindowId, Subscription>>,
    weak_self: Weak<AllStripsObserver>,
}

impl AllStripsObserver {
    fn observe_window(&self, window: WindowId) -> TabWaitResult<()> {
        if self.strips.borrow().contains_key(&window) {
            return Ok(());
        }
        let Some(this) = self.weak_self.upgrade() else {
            return Ok(());
        };
        let subscription = self.host.observe_tab_strip(window, this)?;
        self.strips.borrow_mut().insert(window, subscription);
        Ok(())
    }
}

impl BrowserListObserver for AllStripsObserver {
    fn on_window_added(&self, window: WindowId) {
        if let Err(err) = self.observe_window(window) {
            tracing::warn!(%window, %err, "could not observe new window");
        }
    }

    fn on_window_removed(&self, window: WindowId) {
        let subscription = self.strips.borrow_mut().remove(&window);
        drop(subscription);
    }
}

impl TabStripObserver for AllStripsObserver {
    fn on_tab_strip_changed(&self, window: WindowId, change: &TabStripChange) {
        self.recorder.record(window, change);
    }
}

/// Completes on the first tab inserted into any window, current or future,
/// after construction.
pub struct AllBrowserTabAddedWaiter {
    observer: Rc<AllStripsObserver>,
    selection: AddedTabSelection,
    _browser_list: Subscription,
}

impl fmt::Debug for AllBrowserTabAddedWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllBrowserTabAddedWaiter")
            .field("selection", &self.selection)
            .field("windows", &self.observer.strips.borrow().keys().collect::<Vec<_>>())
            .field("recorder", &self.observer.recorder)
            .finish()
    }
}

impl AllBrowserTabAddedWaiter {
    /// Watch every window; `wait()` reports the triggering tab
    pub fn new(host: &BrowserHost) -> TabWaitResult<Self> {
        Self::with_selection(host, AddedTabSelection::default())
    }

    /// Watch every window; `wait()` reports per `selection`
    pub fn with_selection(host: &BrowserHost, selection: AddedTabSelection) -> TabWaitResult<Self> {
        let observer = Rc::new_cyclic(|weak_self| AllStripsObserver {
            recorder: InsertionRecorder::default(),
            host: host.clone(),
            strips: RefCell::new(BTreeMap::new()),
            weak_self: weak_self.clone(),
        });
        let browser_list = host.observe_browser_list(observer.clone());
        for window in host.windows() {
            observer.observe_window(window)?;
        }
        Ok(Self {
            observer,
            selection,
            _browser_list: browser_list,
        })
    }

    /// Block until a tab is inserted anywhere
    pub fn wait(&self) -> TabWaitResult<TabId> {
        let recorder = &self.observer.recorder;
        recorder.wait(&self.observer.host, "tab added to any window")?;
        let tab = match self.selection {
            AddedTabSelection::TriggeringTab => recorder.first.get(),
            AddedTabSelection::MostRecent => recorder.last.get(),
        };
        recorder.released(tab)
    }

    /// Insertions seen so far, across all windows
    #[must_use]
    pub fn insertions(&self) -> usize {
        self.observer.recorder.count.get()
    }

    /// The reporting policy
    #[must_use]
    pub fn selection(&self) -> AddedTabSelection {
        self.selection
    }
}
