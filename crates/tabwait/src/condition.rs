//! Single-shot condition latch.
//!
//! Everything runs on one cooperative thread, so the latch is a plain
//! two-state cell. The first [`Condition::signal`] flips it to
//! [`ConditionState::Met`] and quits the run loop blocked in
//! [`Condition::wait`], if there is one. Later signals are no-ops.

use crate::config::WaitConfig;
use crate::result::{TabWaitError, TabWaitResult};
use crate::run_loop::{EventLoop, QuitHandle, RunExit, RunLoop};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// State of a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionState {
    /// Not yet signalled
    #[default]
    Pending,
    /// Signalled; stays here for good
    Met,
}

#[derive(Debug, Default)]
struct ConditionInner {
    state: ConditionState,
    waiter: Option<QuitHandle>,
    signal_count: usize,
}

/// Shared single-shot latch
#[derive(Clone, Default)]
pub struct Condition {
    inner: Rc<RefCell<ConditionInner>>,
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Condition")
            .field("state", &inner.state)
            .field("waiting", &inner.waiter.is_some())
            .field("signal_count", &inner.signal_count)
            .finish()
    }
}

impl Condition {
    /// Create a pending condition
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the condition met and release a blocked `wait()`.
    pub fn signal(&self) {
        let waiter = {
            let mut inner = self.inner.borrow_mut();
            inner.signal_count += 1;
            if inner.state == ConditionState::Met {
                return;
            }
            inner.state = ConditionState::Met;
            inner.waiter.take()
        };
        tracing::debug!(releasing_waiter = waiter.is_some(), "condition met");
        if let Some(waiter) = waiter {
            waiter.quit();
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ConditionState {
        self.inner.borrow().state
    }

    /// Whether `signal()` has been called
    #[must_use]
    pub fn is_met(&self) -> bool {
        self.state() == ConditionState::Met
    }

    /// How many times `signal()` has been called, including no-op repeats
    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.inner.borrow().signal_count
    }

    /// Whether a `wait()` is currently blocked on this condition
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.inner.borrow().waiter.is_some()
    }

    /// Pump `event_loop` until the condition is met.
    ///
    /// Returns at once if it was met before the call. `waited_for` names
    /// the waiter in errors; `tracked` is only called on a stall.
    pub fn wait<F>(
        &self,
        event_loop: &EventLoop,
        config: &WaitConfig,
        waited_for: &str,
        tracked: F,
    ) -> TabWaitResult<()>
    where
        F: FnOnce() -> Vec<String>,
    {
        if self.is_met() {
            return Ok(());
        }

        let mut run_loop = RunLoop::new(event_loop).with_max_tasks(config.max_tasks);
        {
            let mut inner = self.inner.borrow_mut();
            debug_assert!(
                inner.waiter.is_none(),
                "a condition supports a single blocked wait()"
            );
            inner.waiter = Some(run_loop.quit_handle());
        }

        tracing::debug!(waited_for, "waiting");
        let exit = run_loop.run();
        self.inner.borrow_mut().waiter = None;

        match exit {
            RunExit::Quit => Ok(()),
            RunExit::Idle { .. } => Err(TabWaitError::LoopIdle {
                waited_for: waited_for.to_string(),
                tracked: if config.dump_tracked_on_stall {
                    tracked()
                } else {
                    Vec::new()
                },
            }),
            RunExit::BudgetExhausted { limit } => Err(TabWaitError::TaskBudgetExhausted {
                limit,
                waited_for: waited_for.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_dump() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn test_new_is_pending() {
        let condition = Condition::new();
        assert_eq!(condition.state(), ConditionState::Pending);
        assert!(!condition.is_met());
        assert!(!condition.is_waiting());
    }

    #[test]
    fn test_signal_is_idempotent() {
        let condition = Condition::new();
        for _ in 0..3 {
            condition.signal();
        }
        assert!(condition.is_met());
        assert_eq!(condition.signal_count(), 3);
    }

    #[test]
    fn test_wait_after_signal_returns_without_pumping() {
        let event_loop = EventLoop::new();
        event_loop.post_task(|| {});
        let condition = Condition::new();
        condition.signal();
        condition
            .wait(&event_loop, &WaitConfig::default(), "test", no_dump)
            .unwrap();
        assert_eq!(event_loop.pending_count(), 1);
    }

    #[test]
    fn test_wait_released_by_task() {
        let event_loop = EventLoop::new();
        let condition = Condition::new();
        let signaller = condition.clone();
        event_loop.post_task(move || {
            signaller.signal();
            signaller.signal();
        });
        event_loop.post_task(|| {});
        condition
            .wait(&event_loop, &WaitConfig::default(), "test", no_dump)
            .unwrap();
        assert!(!condition.is_waiting());
        assert_eq!(event_loop.pending_count(), 1);
    }

    #[test]
    fn test_wait_on_idle_loop_reports_dump() {
        let event_loop = EventLoop::new();
        let condition = Condition::new();
        let err = condition
            .wait(&event_loop, &WaitConfig::default(), "nothing", || {
                vec!["tab#1".to_string()]
            })
            .unwrap_err();
        match err {
            TabWaitError::LoopIdle {
                waited_for,
                tracked,
            } => {
                assert_eq!(waited_for, "nothing");
                assert_eq!(tracked, vec!["tab#1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wait_on_idle_loop_without_dump() {
        let event_loop = EventLoop::new();
        let condition = Condition::new();
        let config = WaitConfig::new().with_dump_tracked_on_stall(false);
        let err = condition
            .wait(&event_loop, &config, "nothing", || {
                panic!("dump must not be collected")
            })
            .unwrap_err();
        assert!(matches!(err, TabWaitError::LoopIdle { tracked, .. } if tracked.is_empty()));
    }

    #[test]
    fn test_wait_respects_task_budget() {
        fn repost(event_loop: EventLoop) {
            let next = event_loop.clone();
            event_loop.post_task(move || repost(next));
        }
        let event_loop = EventLoop::new();
        repost(event_loop.clone());
        let condition = Condition::new();
        let config = WaitConfig::new().with_max_tasks(25);
        let err = condition
            .wait(&event_loop, &config, "never", no_dump)
            .unwrap_err();
        assert!(matches!(
            err,
            TabWaitError::TaskBudgetExhausted { limit: 25, .. }
        ));
        assert!(!condition.is_waiting());
    }
}
