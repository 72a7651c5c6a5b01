//! Single-threaded, re-entrant event loop.
//!
//! [`EventLoop`] is the thread's task queue. Host notifications that are
//! asynchronous (a page finishing its load, scripted "production" work) are
//! posted to it as tasks. A [`RunLoop`] pumps that queue until it is quit.
//!
//! ## Re-entrancy
//!
//! No borrow of the queue is held while a task runs, so a task may post
//! more tasks or start a nested [`RunLoop`] that pumps the same queue. Each
//! `RunLoop` owns its own quit flag: quitting one never releases another.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Bound used by [`EventLoop::run_until_idle`]
pub const DEFAULT_IDLE_DRAIN_LIMIT: usize = 10_000;

type Task = Box<dyn FnOnce()>;

struct EventLoopInner {
    queue: RefCell<VecDeque<Task>>,
    tasks_run: Cell<usize>,
    depth: Cell<usize>,
}

/// The task queue shared by everything on the test thread
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<EventLoopInner>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending", &self.pending_count())
            .field("tasks_run", &self.total_run())
            .field("depth", &self.run_depth())
            .finish()
    }
}

impl EventLoop {
    /// Create an empty event loop
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EventLoopInner {
                queue: RefCell::new(VecDeque::new()),
                tasks_run: Cell::new(0),
                depth: Cell::new(0),
            }),
        }
    }

    /// Append a task; tasks run in FIFO order
    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.inner.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run the next task, if any. Returns `false` when the queue is empty.
    pub fn run_one(&self) -> bool {
        // Pop and release the borrow before running: the task may post.
        let task = self.inner.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                self.inner.tasks_run.set(self.inner.tasks_run.get() + 1);
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, at most [`DEFAULT_IDLE_DRAIN_LIMIT`].
    ///
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut processed = 0;
        while processed < DEFAULT_IDLE_DRAIN_LIMIT && self.run_one() {
            processed += 1;
        }
        processed
    }

    /// Tasks waiting to run
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Tasks run since creation
    #[must_use]
    pub fn total_run(&self) -> usize {
        self.inner.tasks_run.get()
    }

    /// Number of `RunLoop::run` calls currently on the stack
    #[must_use]
    pub fn run_depth(&self) -> usize {
        self.inner.depth.get()
    }

    /// Whether two handles share one queue
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Cloneable handle that quits one [`RunLoop`]
#[derive(Debug, Clone)]
pub struct QuitHandle {
    flag: Rc<Cell<bool>>,
}

impl QuitHandle {
    /// Quit the run loop. Latched if it has not started running yet.
    pub fn quit(&self) {
        self.flag.set(true);
    }

    /// Whether quit has been requested
    #[must_use]
    pub fn is_quit(&self) -> bool {
        self.flag.get()
    }
}

/// Why [`RunLoop::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum RunExit {
    /// `quit()` was called
    Quit,
    /// The queue drained without a quit
    Idle {
        /// Tasks run by this call
        tasks_run: usize,
    },
    /// The task budget ran out without a quit
    BudgetExhausted {
        /// The budget
        limit: usize,
    },
}

/// Single-shot loop that pumps an [`EventLoop`] until quit
#[derive(Debug)]
pub struct RunLoop {
    event_loop: EventLoop,
    quit: QuitHandle,
    max_tasks: Option<usize>,
    has_run: bool,
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl RunLoop {
    /// Create a run loop over `event_loop`
    #[must_use]
    pub fn new(event_loop: &EventLoop) -> Self {
        Self {
            event_loop: event_loop.clone(),
            quit: QuitHandle {
                flag: Rc::new(Cell::new(false)),
            },
            max_tasks: None,
            has_run: false,
        }
    }

    /// Stop after `max_tasks` tasks even if not quit
    #[must_use]
    pub fn with_max_tasks(mut self, max_tasks: Option<usize>) -> Self {
        self.max_tasks = max_tasks;
        self
    }

    /// Handle for quitting this run loop from a task or observer
    #[must_use]
    pub fn quit_handle(&self) -> QuitHandle {
        self.quit.clone()
    }

    /// Quit this run loop
    pub fn quit(&self) {
        self.quit.quit();
    }

    /// Pump tasks until quit, the queue drains, or the budget runs out.
    ///
    /// # Panics
    ///
    /// Debug builds panic if called twice on the same run loop.
    pub fn run(&mut self) -> RunExit {
        debug_assert!(!self.has_run, "RunLoop::run called twice");
        self.has_run = true;

        let event_loop = self.event_loop.clone();
        let _depth = DepthGuard::enter(&event_loop.inner.depth);
        tracing::trace!(depth = event_loop.run_depth(), "run loop start");

        let mut tasks_run = 0;
        loop {
            if self.quit.is_quit() {
                tracing::trace!(tasks_run, "run loop quit");
                return RunExit::Quit;
            }
            if let Some(limit) = self.max_tasks {
                if tasks_run >= limit {
                    tracing::debug!(limit, "run loop exhausted its task budget");
                    return RunExit::BudgetExhausted { limit };
                }
            }
            if !event_loop.run_one() {
                tracing::debug!(tasks_run, "run loop went idle");
                return RunExit::Idle { tasks_run };
            }
            tasks_run += 1;
        }
    }
}
