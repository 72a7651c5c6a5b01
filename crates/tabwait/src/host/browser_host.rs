//! Deterministic in-process host: a window list with tab strips.
//!
//! [`BrowserHost`] plays the browser under test. Test bodies drive it
//! directly or schedule work on its [`EventLoop`] with
//! [`BrowserHost::post_task`], the way production code would run
//! asynchronously alongside a blocked waiter.

use super::observer_list::{ObserverId, ObserverList};
use super::{
    BrowserListObserver, RemoveReason, TabId, TabObserver, TabStripChange, TabStripObserver,
    WindowId,
};
use crate::config::WaitConfig;
use crate::result::{TabWaitError, TabWaitResult};
use crate::run_loop::EventLoop;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug)]
struct WindowRecord {
    id: WindowId,
    tabs: Vec<TabId>,
}

#[derive(Debug)]
struct TabRecord {
    window: Option<WindowId>,
    url: String,
    loading: bool,
    navigation_count: u64,
}

#[derive(Default)]
struct HostState {
    next_id: u64,
    windows: Vec<WindowRecord>,
    tabs: BTreeMap<TabId, TabRecord>,
    browser_list_observers: ObserverList<dyn BrowserListObserver>,
    tab_strip_observers: HashMap<WindowId, ObserverList<dyn TabStripObserver>>,
    tab_observers: HashMap<TabId, ObserverList<dyn TabObserver>>,
}

impl HostState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn window(&self, window: WindowId) -> TabWaitResult<&WindowRecord> {
        self.windows
            .iter()
            .find(|w| w.id == window)
            .ok_or(TabWaitError::UnknownWindow { window })
    }

    fn window_mut(&mut self, window: WindowId) -> TabWaitResult<&mut WindowRecord> {
        self.windows
            .iter_mut()
            .find(|w| w.id == window)
            .ok_or(TabWaitError::UnknownWindow { window })
    }

    fn tab(&self, tab: TabId) -> TabWaitResult<&TabRecord> {
        self.tabs.get(&tab).ok_or(TabWaitError::UnknownTab { tab })
    }

    fn tab_mut(&mut self, tab: TabId) -> TabWaitResult<&mut TabRecord> {
        self.tabs.get_mut(&tab).ok_or(TabWaitError::UnknownTab { tab })
    }

    /// Remove `tab` from its window's strip, returning `(window, index)`
    fn unlink(&mut self, tab: TabId) -> TabWaitResult<Option<(WindowId, usize)>> {
        let Some(window) = self.tab(tab)?.window else {
            return Ok(None);
        };
        let record = self.window_mut(window)?;
        let index = record
            .tabs
            .iter()
            .position(|t| *t == tab)
            .ok_or(TabWaitError::TabDetached { tab })?;
        record.tabs.remove(index);
        self.tab_mut(tab)?.window = None;
        Ok(Some((window, index)))
    }
}

struct HostShared {
    state: RefCell<HostState>,
    event_loop: EventLoop,
    config: WaitConfig,
}

#[derive(Debug, Clone, Copy)]
enum SubscriptionKey {
    BrowserList,
    TabStrip(WindowId),
    Tab(TabId),
}

/// Registration of one observer; dropping it unregisters.
pub struct Subscription {
    host: Weak<HostShared>,
    key: SubscriptionKey,
    id: ObserverId,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(host) = self.host.upgrade() else {
            return;
        };
        let Ok(mut state) = host.state.try_borrow_mut() else {
            tracing::warn!(
                key = ?self.key,
                id = ?self.id,
                "host state busy; observer registration left in place"
            );
            return;
        };
        match self.key {
            SubscriptionKey::BrowserList => {
                state.browser_list_observers.remove(self.id);
            }
            SubscriptionKey::TabStrip(window) => {
                if let Some(list) = state.tab_strip_observers.get_mut(&window) {
                    list.remove(self.id);
                }
            }
            SubscriptionKey::Tab(tab) => {
                if let Some(list) = state.tab_observers.get_mut(&tab) {
                    list.remove(self.id);
                }
            }
        }
    }
}

/// Handle to the simulated browser. Clones share state.
#[derive(Clone)]
pub struct BrowserHost {
    shared: Rc<HostShared>,
}

impl Default for BrowserHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BrowserHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("BrowserHost")
            .field("windows", &state.windows)
            .field("tab_count", &state.tabs.len())
            .field("event_loop", &self.shared.event_loop)
            .finish()
    }
}

impl BrowserHost {
    /// Create a host with no windows and the default config
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WaitConfig::default())
    }

    /// Create a host whose waiters use `config`
    #[must_use]
    pub fn with_config(config: WaitConfig) -> Self {
        Self {
            shared: Rc::new(HostShared {
                state: RefCell::new(HostState::default()),
                event_loop: EventLoop::new(),
                config,
            }),
        }
    }

    /// The event loop notifications and scripted tasks run on
    #[must_use]
    pub fn event_loop(&self) -> &EventLoop {
        &self.shared.event_loop
    }

    /// Config for waiters on this host
    #[must_use]
    pub fn config(&self) -> &WaitConfig {
        &self.shared.config
    }

    /// Schedule `task` on the event loop with access to the host.
    ///
    /// The task is dropped unrun if the host is gone by then.
    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce(&BrowserHost) + 'static,
    {
        let weak = Rc::downgrade(&self.shared);
        self.shared.event_loop.post_task(move || {
            if let Some(shared) = weak.upgrade() {
                task(&BrowserHost { shared });
            }
        });
    }

    /// Run pending tasks until the event loop is empty
    pub fn run_until_idle(&self) -> usize {
        self.shared.event_loop.run_until_idle()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Live windows in creation order
    #[must_use]
    pub fn windows(&self) -> Vec<WindowId> {
        self.shared
            .state
            .borrow()
            .windows
            .iter()
            .map(|w| w.id)
            .collect()
    }

    /// Number of live windows
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.shared.state.borrow().windows.len()
    }

    /// Number of live tabs, attached or not
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.shared.state.borrow().tabs.len()
    }

    /// Whether `window` is live
    #[must_use]
    pub fn contains_window(&self, window: WindowId) -> bool {
        self.shared.state.borrow().window(window).is_ok()
    }

    /// Whether `tab` is live
    #[must_use]
    pub fn contains_tab(&self, tab: TabId) -> bool {
        self.shared.state.borrow().tabs.contains_key(&tab)
    }

    /// Ordered tabs of `window`
    pub fn tabs_in(&self, window: WindowId) -> TabWaitResult<Vec<TabId>> {
        Ok(self.shared.state.borrow().window(window)?.tabs.clone())
    }

    /// Window that currently owns `tab`, `None` while detached
    pub fn window_of(&self, tab: TabId) -> TabWaitResult<Option<WindowId>> {
        Ok(self.shared.state.borrow().tab(tab)?.window)
    }

    /// URL of the most recent navigation in `tab`
    pub fn url_of(&self, tab: TabId) -> TabWaitResult<String> {
        Ok(self.shared.state.borrow().tab(tab)?.url.clone())
    }

    /// Whether `tab` has a load in flight
    pub fn is_loading(&self, tab: TabId) -> TabWaitResult<bool> {
        Ok(self.shared.state.borrow().tab(tab)?.loading)
    }

    /// Top-level navigations started in `tab`
    pub fn navigation_count(&self, tab: TabId) -> TabWaitResult<u64> {
        Ok(self.shared.state.borrow().tab(tab)?.navigation_count)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Observe window creation and removal
    pub fn observe_browser_list(&self, observer: Rc<dyn BrowserListObserver>) -> Subscription {
        let id = self
            .shared
            .state
            .borrow_mut()
            .browser_list_observers
            .add(Rc::downgrade(&observer));
        self.subscription(SubscriptionKey::BrowserList, id)
    }

    /// Observe the tab strip of `window`
    pub fn observe_tab_strip(
        &self,
        window: WindowId,
        observer: Rc<dyn TabStripObserver>,
    ) -> TabWaitResult<Subscription> {
        let id = {
            let mut state = self.shared.state.borrow_mut();
            state.window(window)?;
            state
                .tab_strip_observers
                .entry(window)
                .or_default()
                .add(Rc::downgrade(&observer))
        };
        Ok(self.subscription(SubscriptionKey::TabStrip(window), id))
    }

    /// Observe navigation, loading, and destruction of `tab`
    pub fn observe_tab(
        &self,
        tab: TabId,
        observer: Rc<dyn TabObserver>,
    ) -> TabWaitResult<Subscription> {
        let id = {
            let mut state = self.shared.state.borrow_mut();
            state.tab(tab)?;
            state
                .tab_observers
                .entry(tab)
                .or_default()
                .add(Rc::downgrade(&observer))
        };
        Ok(self.subscription(SubscriptionKey::Tab(tab), id))
    }

    /// Live observers registered on `tab`
    #[must_use]
    pub fn tab_observer_count(&self, tab: TabId) -> usize {
        self.shared
            .state
            .borrow()
            .tab_observers
            .get(&tab)
            .map_or(0, ObserverList::live_count)
    }

    /// Live observers registered on the strip of `window`
    #[must_use]
    pub fn tab_strip_observer_count(&self, window: WindowId) -> usize {
        self.shared
            .state
            .borrow()
            .tab_strip_observers
            .get(&window)
            .map_or(0, ObserverList::live_count)
    }

    fn subscription(&self, key: SubscriptionKey, id: ObserverId) -> Subscription {
        Subscription {
            host: Rc::downgrade(&self.shared),
            key,
            id,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Open a new, empty window
    pub fn create_window(&self) -> WindowId {
        let window = {
            let mut state = self.shared.state.borrow_mut();
            let window = WindowId::from_raw(state.allocate_id());
            state.windows.push(WindowRecord {
                id: window,
                tabs: Vec::new(),
            });
            window
        };
        tracing::debug!(%window, "window created");
        self.notify_browser_list(|observer| observer.on_window_added(window));
        window
    }

    /// Close `window`, destroying its tabs last-to-first, then announce the
    /// removal
    pub fn close_window(&self, window: WindowId) -> TabWaitResult<()> {
        self.tabs_in(window)?;
        // Re-read each round: destruction observers may close sibling tabs
        // or the window itself.
        loop {
            if !self.contains_window(window) {
                return Ok(());
            }
            let Some(tab) = self.tabs_in(window)?.last().copied() else {
                break;
            };
            self.destroy_tab(tab)?;
        }
        {
            let mut state = self.shared.state.borrow_mut();
            state.windows.retain(|w| w.id != window);
            state.tab_strip_observers.remove(&window);
        }
        tracing::debug!(%window, "window removed");
        self.notify_browser_list(|observer| observer.on_window_removed(window));
        Ok(())
    }

    /// Append a new tab to `window` and navigate it to `url`
    pub fn add_tab(&self, window: WindowId, url: &str) -> TabWaitResult<TabId> {
        let index = self.shared.state.borrow().window(window)?.tabs.len();
        self.insert_tab_at(window, index, url)
    }

    /// Insert a new tab at `index` of `window` and navigate it to `url`
    pub fn insert_tab_at(&self, window: WindowId, index: usize, url: &str) -> TabWaitResult<TabId> {
        let tab = {
            let mut state = self.shared.state.borrow_mut();
            let len = state.window(window)?.tabs.len();
            if index > len {
                return Err(TabWaitError::TabIndexOutOfRange { window, index, len });
            }
            let tab = TabId::from_raw(state.allocate_id());
            state.tabs.insert(
                tab,
                TabRecord {
                    window: Some(window),
                    url: url.to_string(),
                    loading: false,
                    navigation_count: 0,
                },
            );
            state.window_mut(window)?.tabs.insert(index, tab);
            tab
        };
        tracing::debug!(%tab, %window, index, "tab inserted");
        self.notify_tab_strip(window, &TabStripChange::Inserted { tab, index });
        self.navigate(tab, url)?;
        Ok(tab)
    }

    /// Close `tab` and destroy it
    pub fn close_tab(&self, tab: TabId) -> TabWaitResult<()> {
        self.destroy_tab(tab)
    }

    /// Take `tab` out of its window without destroying it
    pub fn detach_tab(&self, tab: TabId) -> TabWaitResult<()> {
        let unlinked = self.shared.state.borrow_mut().unlink(tab)?;
        let (window, index) = unlinked.ok_or(TabWaitError::TabDetached { tab })?;
        tracing::debug!(%tab, %window, "tab detached");
        self.notify_tab_strip(
            window,
            &TabStripChange::Removed {
                tab,
                index,
                reason: RemoveReason::Detached,
            },
        );
        Ok(())
    }

    /// Insert a detached `tab` at the end of `window`
    pub fn insert_detached_tab(&self, window: WindowId, tab: TabId) -> TabWaitResult<()> {
        let index = {
            let mut state = self.shared.state.borrow_mut();
            if let Some(owner) = state.tab(tab)?.window {
                return Err(TabWaitError::TabAttached { tab, window: owner });
            }
            let record = state.window_mut(window)?;
            record.tabs.push(tab);
            let index = record.tabs.len() - 1;
            state.tab_mut(tab)?.window = Some(window);
            index
        };
        tracing::debug!(%tab, %window, index, "tab attached");
        self.notify_tab_strip(window, &TabStripChange::Inserted { tab, index });
        Ok(())
    }

    /// Transfer `tab` to the end of `to`; the tab is never destroyed
    pub fn move_tab(&self, tab: TabId, to: WindowId) -> TabWaitResult<()> {
        self.shared.state.borrow().window(to)?;
        self.detach_tab(tab)?;
        self.insert_detached_tab(to, tab)
    }

    /// Swap `old` for a new tab navigated to `url`, then destroy `old`
    pub fn replace_tab(&self, old: TabId, url: &str) -> TabWaitResult<TabId> {
        let (window, index, new) = {
            let mut state = self.shared.state.borrow_mut();
            let window = state
                .tab(old)?
                .window
                .ok_or(TabWaitError::TabDetached { tab: old })?;
            let new = TabId::from_raw(state.allocate_id());
            let record = state.window_mut(window)?;
            let index = record
                .tabs
                .iter()
                .position(|t| *t == old)
                .ok_or(TabWaitError::TabDetached { tab: old })?;
            record.tabs[index] = new;
            state.tab_mut(old)?.window = None;
            state.tabs.insert(
                new,
                TabRecord {
                    window: Some(window),
                    url: url.to_string(),
                    loading: false,
                    navigation_count: 0,
                },
            );
            (window, index, new)
        };
        tracing::debug!(%old, %new, %window, "tab replaced");
        self.notify_tab_strip(window, &TabStripChange::Replaced { old, new, index });
        self.navigate(new, url)?;
        self.destroy_tab(old)?;
        Ok(new)
    }

    /// Start a top-level navigation; the load finishes on a posted task
    pub fn navigate(&self, tab: TabId, url: &str) -> TabWaitResult<()> {
        let generation = {
            let mut state = self.shared.state.borrow_mut();
            let record = state.tab_mut(tab)?;
            record.url = url.to_string();
            record.loading = true;
            record.navigation_count += 1;
            record.navigation_count
        };
        tracing::trace!(%tab, url, generation, "navigation started");
        self.notify_tab(tab, |observer| observer.did_start_navigation(tab, url));

        let weak = Rc::downgrade(&self.shared);
        self.shared.event_loop.post_task(move || {
            if let Some(shared) = weak.upgrade() {
                BrowserHost { shared }.finish_load(tab, generation);
            }
        });
        Ok(())
    }

    fn finish_load(&self, tab: TabId, generation: u64) {
        let finished = {
            let mut state = self.shared.state.borrow_mut();
            match state.tabs.get_mut(&tab) {
                // A newer navigation owns the pending load.
                Some(record) if record.loading && record.navigation_count == generation => {
                    record.loading = false;
                    true
                }
                _ => false,
            }
        };
        if finished {
            tracing::trace!(%tab, "load stopped");
            self.notify_tab(tab, |observer| observer.did_stop_loading(tab));
        }
    }

    /// Strip removal, then destruction notice, then the record goes away
    fn destroy_tab(&self, tab: TabId) -> TabWaitResult<()> {
        let unlinked = self.shared.state.borrow_mut().unlink(tab)?;
        if let Some((window, index)) = unlinked {
            self.notify_tab_strip(
                window,
                &TabStripChange::Removed {
                    tab,
                    index,
                    reason: RemoveReason::Deleted,
                },
            );
        }
        tracing::debug!(%tab, "tab destroyed");
        self.notify_tab(tab, |observer| observer.tab_destroyed(tab));
        let mut state = self.shared.state.borrow_mut();
        state.tabs.remove(&tab);
        state.tab_observers.remove(&tab);
        Ok(())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn notify_browser_list<F>(&self, f: F)
    where
        F: Fn(&dyn BrowserListObserver),
    {
        let ids = self.shared.state.borrow().browser_list_observers.ids();
        for id in ids {
            let observer = self.shared.state.borrow().browser_list_observers.get(id);
            if let Some(observer) = observer {
                f(observer.as_ref());
            }
        }
    }

    fn notify_tab_strip(&self, window: WindowId, change: &TabStripChange) {
        let ids = self
            .shared
            .state
            .borrow()
            .tab_strip_observers
            .get(&window)
            .map(ObserverList::ids)
            .unwrap_or_default();
        for id in ids {
            let observer = self
                .shared
                .state
                .borrow()
                .tab_strip_observers
                .get(&window)
                .and_then(|list| list.get(id));
            if let Some(observer) = observer {
                observer.on_tab_strip_changed(window, change);
            }
        }
    }

    fn notify_tab<F>(&self, tab: TabId, f: F)
    where
        F: Fn(&dyn TabObserver),
    {
        let ids = self
            .shared
            .state
            .borrow()
            .tab_observers
            .get(&tab)
            .map(ObserverList::ids)
            .unwrap_or_default();
        for id in ids {
            let observer = self
                .shared
                .state
                .borrow()
                .tab_observers
                .get(&tab)
                .and_then(|list| list.get(id));
            if let Some(observer) = observer {
                f(observer.as_ref());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.borrow_mut())
        }
    }

    impl BrowserListObserver for Recorder {
        fn on_window_added(&self, window: WindowId) {
            self.events.borrow_mut().push(format!("added {window}"));
        }

        fn on_window_removed(&self, window: WindowId) {
            self.events.borrow_mut().push(format!("removed {window}"));
        }
    }

    impl TabStripObserver for Recorder {
        fn on_tab_strip_changed(&self, window: WindowId, change: &TabStripChange) {
            let line = match change {
                TabStripChange::Inserted { tab, index } => {
                    format!("{window} insert {tab}@{index}")
                }
                TabStripChange::Removed { tab, index, reason } => {
                    format!("{window} remove {tab}@{index} {reason:?}")
                }
                TabStripChange::Replaced { old, new, index } => {
                    format!("{window} replace {old}->{new}@{index}")
                }
            };
            self.events.borrow_mut().push(line);
        }
    }

    impl TabObserver for Recorder {
        fn did_start_navigation(&self, tab: TabId, url: &str) {
            self.events.borrow_mut().push(format!("{tab} start {url}"));
        }

        fn did_stop_loading(&self, tab: TabId) {
            self.events.borrow_mut().push(format!("{tab} stop"));
        }

        fn tab_destroyed(&self, tab: TabId) {
            self.events.borrow_mut().push(format!("{tab} destroyed"));
        }
    }

    // =========================================================================
    // Window Tests
    // =========================================================================

    mod window_tests {
        use super::*;

        #[test]
        fn test_create_and_close_window_notifies() {
            let host = BrowserHost::new();
            let recorder = Rc::new(Recorder::default());
            let _sub = host.observe_browser_list(recorder.clone());

            let window = host.create_window();
            assert_eq!(host.windows(), vec![window]);
            host.close_window(window).unwrap();

            assert_eq!(
                recorder.take(),
                vec![format!("added {window}"), format!("removed {window}")]
            );
            assert_eq!(host.window_count(), 0);
            assert!(matches!(
                host.tabs_in(window),
                Err(TabWaitError::UnknownWindow { .. })
            ));
        }

        #[test]
        fn test_close_window_destroys_tabs_before_removal() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let tab = host.add_tab(window, "about:blank").unwrap();
            let recorder = Rc::new(Recorder::default());
            let _list = host.observe_browser_list(recorder.clone());
            let _strip = host.observe_tab_strip(window, recorder.clone()).unwrap();
            let _tab = host.observe_tab(tab, recorder.clone()).unwrap();

            host.close_window(window).unwrap();

            assert_eq!(
                recorder.take(),
                vec![
                    format!("{window} remove {tab}@0 Deleted"),
                    format!("{tab} destroyed"),
                    format!("removed {window}"),
                ]
            );
            assert!(!host.contains_tab(tab));
        }

        /// Closes another tab or window from inside `tab_destroyed`
        struct CloseOnDestroy {
            host: BrowserHost,
            tab: Option<TabId>,
            window: Option<WindowId>,
        }

        impl TabObserver for CloseOnDestroy {
            fn tab_destroyed(&self, _tab: TabId) {
                if let Some(tab) = self.tab {
                    self.host.close_tab(tab).unwrap();
                }
                if let Some(window) = self.window {
                    self.host.close_window(window).unwrap();
                }
            }
        }

        #[test]
        fn test_close_window_survives_sibling_closed_by_observer() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let a = host.add_tab(window, "about:blank").unwrap();
            let b = host.add_tab(window, "about:blank").unwrap();
            let recorder = Rc::new(Recorder::default());
            let _list = host.observe_browser_list(recorder.clone());
            let closer = Rc::new(CloseOnDestroy {
                host: host.clone(),
                tab: Some(a),
                window: None,
            });
            let _closer = host.observe_tab(b, closer.clone()).unwrap();

            host.close_window(window).unwrap();

            assert!(!host.contains_window(window));
            assert!(!host.contains_tab(a));
            assert!(!host.contains_tab(b));
            assert_eq!(recorder.take(), vec![format!("removed {window}")]);
        }

        #[test]
        fn test_close_window_reentered_from_observer() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let a = host.add_tab(window, "about:blank").unwrap();
            let b = host.add_tab(window, "about:blank").unwrap();
            let recorder = Rc::new(Recorder::default());
            let _list = host.observe_browser_list(recorder.clone());
            let closer = Rc::new(CloseOnDestroy {
                host: host.clone(),
                tab: None,
                window: Some(window),
            });
            let _closer = host.observe_tab(b, closer.clone()).unwrap();

            host.close_window(window).unwrap();

            assert!(!host.contains_window(window));
            assert!(!host.contains_tab(a));
            assert_eq!(recorder.take(), vec![format!("removed {window}")]);
        }

        #[test]
        fn test_subscription_dropped_while_state_busy() {
            let host = BrowserHost::new();
            let recorder = Rc::new(Recorder::default());
            let sub = host.observe_browser_list(recorder.clone());
            {
                let _busy = host.shared.state.borrow();
                drop(sub);
            }
            assert_eq!(host.shared.state.borrow().browser_list_observers.live_count(), 1);
        }

        #[test]
        fn test_dropped_subscription_stops_delivery() {
            let host = BrowserHost::new();
            let recorder = Rc::new(Recorder::default());
            let sub = host.observe_browser_list(recorder.clone());
            drop(sub);
            host.create_window();
            assert!(recorder.take().is_empty());
        }
    }

    // =========================================================================
    // Tab Tests
    // =========================================================================

    mod tab_tests {
        use super::*;

        #[test]
        fn test_add_tab_inserts_then_navigates() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let recorder = Rc::new(Recorder::default());
            let _strip = host.observe_tab_strip(window, recorder.clone()).unwrap();

            let tab = host.add_tab(window, "http://x/").unwrap();

            assert_eq!(recorder.take(), vec![format!("{window} insert {tab}@0")]);
            assert_eq!(host.url_of(tab).unwrap(), "http://x/");
            assert_eq!(host.navigation_count(tab).unwrap(), 1);
            assert!(host.is_loading(tab).unwrap());
            assert_eq!(host.event_loop().pending_count(), 1);

            host.run_until_idle();
            assert!(!host.is_loading(tab).unwrap());
        }

        #[test]
        fn test_load_stop_is_asynchronous() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let tab = host.add_tab(window, "about:blank").unwrap();
            host.run_until_idle();

            let recorder = Rc::new(Recorder::default());
            let _sub = host.observe_tab(tab, recorder.clone()).unwrap();
            host.navigate(tab, "http://x/a").unwrap();
            assert_eq!(recorder.take(), vec![format!("{tab} start http://x/a")]);

            host.run_until_idle();
            assert_eq!(recorder.take(), vec![format!("{tab} stop")]);
        }

        #[test]
        fn test_superseded_navigation_stops_once() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let tab = host.add_tab(window, "http://x/a").unwrap();
            host.navigate(tab, "http://x/b").unwrap();
            let recorder = Rc::new(Recorder::default());
            let _sub = host.observe_tab(tab, recorder.clone()).unwrap();

            host.run_until_idle();

            assert_eq!(recorder.take(), vec![format!("{tab} stop")]);
            assert_eq!(host.url_of(tab).unwrap(), "http://x/b");
            assert_eq!(host.navigation_count(tab).unwrap(), 2);
        }

        #[test]
        fn test_insert_out_of_range() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let err = host.insert_tab_at(window, 1, "about:blank").unwrap_err();
            assert!(matches!(
                err,
                TabWaitError::TabIndexOutOfRange { index: 1, len: 0, .. }
            ));
        }

        #[test]
        fn test_move_tab_detaches_then_inserts() {
            let host = BrowserHost::new();
            let w1 = host.create_window();
            let w2 = host.create_window();
            let tab = host.add_tab(w1, "about:blank").unwrap();
            let recorder = Rc::new(Recorder::default());
            let _s1 = host.observe_tab_strip(w1, recorder.clone()).unwrap();
            let _s2 = host.observe_tab_strip(w2, recorder.clone()).unwrap();
            let _tab = host.observe_tab(tab, recorder.clone()).unwrap();

            host.move_tab(tab, w2).unwrap();

            assert_eq!(
                recorder.take(),
                vec![
                    format!("{w1} remove {tab}@0 Detached"),
                    format!("{w2} insert {tab}@0"),
                ]
            );
            assert_eq!(host.window_of(tab).unwrap(), Some(w2));
            assert!(host.tabs_in(w1).unwrap().is_empty());
        }

        #[test]
        fn test_insert_detached_rejects_attached_tab() {
            let host = BrowserHost::new();
            let w1 = host.create_window();
            let w2 = host.create_window();
            let tab = host.add_tab(w1, "about:blank").unwrap();
            let err = host.insert_detached_tab(w2, tab).unwrap_err();
            assert!(matches!(err, TabWaitError::TabAttached { window, .. } if window == w1));
        }

        #[test]
        fn test_replace_tab() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let first = host.add_tab(window, "about:blank").unwrap();
            let old = host.add_tab(window, "http://x/old").unwrap();
            let recorder = Rc::new(Recorder::default());
            let _strip = host.observe_tab_strip(window, recorder.clone()).unwrap();
            let _tab = host.observe_tab(old, recorder.clone()).unwrap();

            let new = host.replace_tab(old, "http://x/new").unwrap();

            assert_eq!(
                recorder.take(),
                vec![
                    format!("{window} replace {old}->{new}@1"),
                    format!("{old} destroyed"),
                ]
            );
            assert_eq!(host.tabs_in(window).unwrap(), vec![first, new]);
            assert!(!host.contains_tab(old));
        }

        #[test]
        fn test_stale_tab_lookups_fail() {
            let host = BrowserHost::new();
            let window = host.create_window();
            let tab = host.add_tab(window, "about:blank").unwrap();
            host.close_tab(tab).unwrap();
            assert!(matches!(
                host.url_of(tab),
                Err(TabWaitError::UnknownTab { .. })
            ));
            assert!(host.navigate(tab, "http://x/").is_err());
            // The load posted before destruction is dropped quietly.
            host.run_until_idle();
        }

        #[test]
        fn test_post_task_sees_host() {
            let host = BrowserHost::new();
            let seen = Rc::new(RefCell::new(None));
            let slot = Rc::clone(&seen);
            host.post_task(move |host| {
                *slot.borrow_mut() = Some(host.create_window());
            });
            assert_eq!(host.window_count(), 0);
            host.run_until_idle();
            assert_eq!(host.windows(), vec![seen.borrow().unwrap()]);
        }
    }
}
