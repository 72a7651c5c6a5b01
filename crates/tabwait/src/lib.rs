//! Tabwait: Test Synchronization Over Dynamic Windows and Tabs
//!
//! Tests that drive a multi-window, multi-tab application have to block
//! until something asynchronous happens: a page finishes loading, a tab
//! appears, a window closes. Tabwait provides observers that watch every
//! current and future window and tab, plus a single-shot latch that blocks
//! the test thread by pumping its event loop until the awaited condition
//! holds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    TABWAIT Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Waiters    │    │ AllTabs    │    │ Browser    │            │
//! │   │ (url load, │───►│ Observer   │───►│ Host       │            │
//! │   │  tab added)│    │ (tracker)  │    │ (windows)  │            │
//! │   └─────┬──────┘    └────────────┘    └─────┬──────┘            │
//! │         │ wait()                            │ post_task         │
//! │         ▼                                   ▼                   │
//! │   ┌────────────┐                     ┌────────────┐             │
//! │   │ Condition  │──── RunLoop ───────►│ EventLoop  │             │
//! │   └────────────┘                     └────────────┘             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use tabwait::prelude::*;
//!
//! let host = BrowserHost::new();
//! let window = host.create_window();
//! let tab = host.add_tab(window, "about:blank").unwrap();
//!
//! let observer = UrlLoadObserver::new(&host, "https://example.com/").unwrap();
//! host.post_task(move |host| host.navigate(tab, "https://example.com/").unwrap());
//! observer.wait().unwrap();
//!
//! assert_eq!(observer.web_contents(), Some(tab));
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod condition;
mod config;
#[allow(clippy::missing_errors_doc)]
pub mod host;
pub mod logging;
mod result;
mod run_loop;
#[allow(clippy::missing_errors_doc)]
pub mod tracker;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod waiters;

pub use condition::{Condition, ConditionState};
pub use config::WaitConfig;
pub use host::{
    BrowserHost, BrowserListObserver, ObserverId, RemoveReason, Subscription, TabId, TabObserver,
    TabStripChange, TabStripObserver, WindowId,
};
pub use result::{TabWaitError, TabWaitResult};
pub use run_loop::{EventLoop, QuitHandle, RunExit, RunLoop, DEFAULT_IDLE_DRAIN_LIMIT};
pub use tracker::{AllTabsObserver, TabInterest, TabProcessor, TrackerContext};
pub use waiters::{
    navigate_to_url, wait_for_browser_to_close, wait_for_browser_to_open, AddedTabSelection,
    AllBrowserTabAddedWaiter, BrowserChangeObserver, ChangeType, TabAddedWaiter, TabClosedWaiter,
    UrlLoadObserver, UrlLoadProcessor,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::condition::*;
    pub use super::config::*;
    pub use super::host::{
        BrowserHost, BrowserListObserver, RemoveReason, Subscription, TabId, TabObserver,
        TabStripChange, TabStripObserver, WindowId,
    };
    pub use super::result::*;
    pub use super::run_loop::*;
    pub use super::tracker::*;
    pub use super::waiters::*;
}
