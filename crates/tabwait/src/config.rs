//! Wait configuration.
//!
//! Waits are unbounded by default: a condition that never fires keeps
//! pumping until the event loop has nothing left to run. A task budget can
//! be set to fail earlier in suites that post self-perpetuating tasks.

use crate::result::{TabWaitError, TabWaitResult};
use serde::{Deserialize, Serialize};

/// Options shared by every waiter created on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Maximum tasks a single wait may run (`None` = unbounded)
    pub max_tasks: Option<usize>,
    /// Include tracked tabs/windows in stall errors
    pub dump_tracked_on_stall: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_tasks: None,
            dump_tracked_on_stall: true,
        }
    }
}

impl WaitConfig {
    /// Create a new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of tasks a single wait may run
    #[must_use]
    pub const fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = Some(max_tasks);
        self
    }

    /// Toggle the tracked-object dump in stall errors
    #[must_use]
    pub const fn with_dump_tracked_on_stall(mut self, dump: bool) -> Self {
        self.dump_tracked_on_stall = dump;
        self
    }

    /// Parse a YAML document, filling missing keys with defaults
    pub fn from_yaml(yaml: &str) -> TabWaitResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| TabWaitError::Config(e.to_string()))
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> TabWaitResult<String> {
        serde_yaml_ng::to_string(self).map_err(|e| TabWaitError::Config(e.to_string()))
    }
}
