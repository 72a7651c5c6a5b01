//! One-call helpers built on the waiters.
//!
//! Each helper registers its observer before blocking, so the change it
//! waits for may already be queued on the event loop when it is called.

use super::browser_change::{BrowserChangeObserver, ChangeType};
use super::url_load::UrlLoadObserver;
use crate::host::{BrowserHost, TabId, WindowId};
use crate::result::{TabWaitError, TabWaitResult};

/// Navigate `tab` to `url` and block until some tab finished loading it.
///
/// Returns the tab the load completed in, normally `tab` itself.
pub fn navigate_to_url(host: &BrowserHost, tab: TabId, url: &str) -> TabWaitResult<TabId> {
    let observer = UrlLoadObserver::new(host, url)?;
    host.navigate(tab, url)?;
    observer.wait()?;
    observer
        .web_contents()
        .ok_or_else(|| TabWaitError::InvalidState {
            message: format!("load of {url} released without a tab"),
        })
}

/// Block until any new window opens
pub fn wait_for_browser_to_open(host: &BrowserHost) -> TabWaitResult<WindowId> {
    BrowserChangeObserver::new(host, None, ChangeType::Added).wait()
}

/// Block until `window` closes; returns at once if it is already gone
pub fn wait_for_browser_to_close(host: &BrowserHost, window: WindowId) -> TabWaitResult<()> {
    if !host.contains_window(window) {
        return Ok(());
    }
    BrowserChangeObserver::new(host, Some(window), ChangeType::Removed)
        .wait()
        .map(|_| ())
}
