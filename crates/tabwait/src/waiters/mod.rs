//! Ready-made waiters.
//!
//! Every waiter follows the same life cycle: construct it before the
//! action that triggers the change, trigger the action (usually by posting
//! it to the event loop), then call `wait()`. Changes that happen before
//! construction are not seen.

mod browser_change;
mod navigation;
mod tab_added;
mod tab_closed;
mod url_load;

pub use browser_change::{BrowserChangeObserver, ChangeType};
pub use navigation::{navigate_to_url, wait_for_browser_to_close, wait_for_browser_to_open};
pub use tab_added::{AddedTabSelection, AllBrowserTabAddedWaiter, TabAddedWaiter};
pub use tab_closed::TabClosedWaiter;
pub use url_load::{UrlLoadObserver, UrlLoadProcessor};
