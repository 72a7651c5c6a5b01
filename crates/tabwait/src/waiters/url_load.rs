//! Wait for any tab to finish loading one exact URL.

use crate::condition::Condition;
use crate::host::{BrowserHost, Subscription, TabId, TabObserver};
use crate::result::TabWaitResult;
use crate::tracker::{AllTabsObserver, TabInterest, TabProcessor, TrackerContext};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

struct LoadStopWatcher {
    url: Rc<str>,
    host: BrowserHost,
    condition: Condition,
    matched: Rc<Cell<Option<TabId>>>,
}

impl TabObserver for LoadStopWatcher {
    fn did_stop_loading(&self, tab: TabId) {
        if self.matched.get().is_some() {
            return;
        }
        match self.host.url_of(tab) {
            Ok(url) if *url == *self.url => {
                tracing::debug!(%tab, %url, "target URL loaded");
                self.matched.set(Some(tab));
                self.condition.signal();
            }
            _ => {}
        }
    }
}

struct LoadStopInterest {
    watcher: Rc<LoadStopWatcher>,
    _subscription: Subscription,
}

impl TabInterest for LoadStopInterest {
    fn describe(&self) -> String {
        format!("watching load-stop for {}", self.watcher.url)
    }
}

/// Processor behind [`UrlLoadObserver`]: one load-stop watcher per tab
pub struct UrlLoadProcessor {
    url: Rc<str>,
    matched: Rc<Cell<Option<TabId>>>,
}

impl fmt::Debug for UrlLoadProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlLoadProcessor")
            .field("url", &self.url)
            .field("matched", &self.matched.get())
            .finish()
    }
}

impl TabProcessor for UrlLoadProcessor {
    fn process_one_contents(
        &self,
        tab: TabId,
        cx: &TrackerContext<'_>,
    ) -> Option<Box<dyn TabInterest>> {
        let watcher = Rc::new(LoadStopWatcher {
            url: Rc::clone(&self.url),
            host: cx.host().clone(),
            condition: cx.condition().clone(),
            matched: Rc::clone(&self.matched),
        });
        let subscription = cx.host().observe_tab(tab, watcher.clone()).ok()?;
        Some(Box::new(LoadStopInterest {
            watcher,
            _subscription: subscription,
        }))
    }

    fn describe(&self) -> String {
        format!("load of {}", self.url)
    }
}

/// Completes when some tab finishes loading exactly `url`.
///
/// Matching is exact string equality: `http://x/page1` does not match
/// `http://x/page1?x=1`. When several tabs match, the first load-stop the
/// event loop delivers wins.
#[derive(Debug)]
pub struct UrlLoadObserver {
    tracker: AllTabsObserver<UrlLoadProcessor>,
}

impl UrlLoadObserver {
    /// Start watching every current and future tab on `host`
    pub fn new(host: &BrowserHost, url: &str) -> TabWaitResult<Self> {
        let tracker = AllTabsObserver::new(
            host,
            UrlLoadProcessor {
                url: Rc::from(url),
                matched: Rc::new(Cell::new(None)),
            },
        );
        tracker.add_all_browsers()?;
        Ok(Self { tracker })
    }

    /// Block until a tab finished loading the URL
    pub fn wait(&self) -> TabWaitResult<()> {
        self.tracker.wait()
    }

    /// The tab that satisfied the wait; `None` until it happens
    #[must_use]
    pub fn web_contents(&self) -> Option<TabId> {
        self.tracker.processor().matched.get()
    }

    /// The awaited URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.tracker.processor().url
    }

    /// The underlying tracker
    #[must_use]
    pub fn tracker(&self) -> &AllTabsObserver<UrlLoadProcessor> {
        &self.tracker
    }
}
