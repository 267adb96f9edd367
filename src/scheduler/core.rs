//! Scheduler implementation

use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::config::SchedulerOptions;
use crate::error::{ConfigError, Result, TaskError};

use super::handle::TaskHandle;
use super::queue::{Job, PendingQueue, PendingTask, TaskId};
use super::stats::SchedulerStats;

/// Internal state protected by mutex
struct SchedulerState {
    /// Tasks started and not yet finished
    running: usize,

    /// Tasks waiting for a slot, oldest first
    pending: PendingQueue,

    next_id: u64,

    stats: SchedulerStats,
}

impl SchedulerState {
    fn observe(&mut self) {
        let (running, pending) = (self.running, self.pending.len());
        self.stats.observe(running, pending);
    }
}

struct Shared {
    limit: NonZeroUsize,
    state: Mutex<SchedulerState>,
}

impl Shared {
    fn launch(self: &Arc<Self>, task: PendingTask) {
        let PendingTask { id, job } = task;
        debug!(task_id = %id, "starting task");

        let slot = Slot {
            shared: Some(Arc::clone(self)),
            id,
        };
        tokio::spawn(async move {
            let succeeded = job.await;
            slot.finish(succeeded);
        });
    }

    /// Frees the slot held by `id`.
    ///
    /// A finished or panicked task hands its slot straight to the oldest
    /// pending task. A cancelled task means the runtime is tearing its tasks
    /// down, so the backlog is dropped instead of launched.
    fn release(self: &Arc<Self>, id: TaskId, release: Release) {
        let (next, discarded) = {
            let mut state = self.state.lock();
            match release {
                Release::Finished(succeeded) => state.stats.record_outcome(succeeded),
                Release::Panicked => state.stats.panicked += 1,
                Release::Cancelled => state.stats.cancelled += 1,
            }

            let (next, discarded) = match release {
                Release::Cancelled => {
                    let discarded = state.pending.drain();
                    state.stats.cancelled += discarded.len() as u64;
                    (None, discarded)
                }
                _ => (state.pending.pop(), Vec::new()),
            };
            if next.is_none() {
                state.running -= 1;
            }
            state.observe();
            trace!(
                task_id = %id,
                running = state.running,
                pending = state.pending.len(),
                "slot released"
            );
            (next, discarded)
        };

        if !discarded.is_empty() {
            debug!(task_id = %id, discarded = discarded.len(), "dropping pending tasks");
        }
        // Outside the lock: each dropped job reports cancellation to its handle
        drop(discarded);

        if let Some(next) = next {
            self.launch(next);
        }
    }
}

/// Why a slot was given back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    Finished(bool),
    Panicked,
    Cancelled,
}

/// Holds one concurrency slot for the lifetime of a running task.
///
/// Dropping it without `finish` frees the slot too: during a panic the queue
/// keeps moving, otherwise the task was cancelled by runtime shutdown.
struct Slot {
    shared: Option<Arc<Shared>>,
    id: TaskId,
}

impl Slot {
    fn finish(mut self, succeeded: bool) {
        if let Some(shared) = self.shared.take() {
            shared.release(self.id, Release::Finished(succeeded));
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            if thread::panicking() {
                warn!(task_id = %self.id, "task panicked");
                shared.release(self.id, Release::Panicked);
            } else {
                debug!(task_id = %self.id, "task cancelled");
                shared.release(self.id, Release::Cancelled);
            }
        }
    }
}

/// Sends a task's outcome to its handle, or reports why there is none.
struct Reporter<T, E> {
    sender: Option<oneshot::Sender<std::result::Result<T, TaskError<E>>>>,
}

impl<T, E> Reporter<T, E> {
    fn report(mut self, outcome: std::result::Result<T, E>) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(outcome.map_err(TaskError::Failed));
        }
    }
}

impl<T, E> Drop for Reporter<T, E> {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let err = if thread::panicking() {
                TaskError::Panicked
            } else {
                TaskError::Cancelled
            };
            let _ = sender.send(Err(err));
        }
    }
}

/// Runs submitted tasks with at most `concurrency` of them in flight,
/// starting the rest in submission order as slots free up.
///
/// Clones share the same limit and queue.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

/// Builds a scheduler from options, rejecting a zero concurrency limit.
pub fn create_scheduler(options: SchedulerOptions) -> Result<Scheduler> {
    NonZeroUsize::new(options.concurrency)
        .map(Scheduler::new)
        .ok_or(ConfigError::InvalidConcurrency(options.concurrency))
}

impl Scheduler {
    /// Create a new scheduler with the given concurrency limit
    pub fn new(concurrency: NonZeroUsize) -> Self {
        debug!(concurrency = concurrency.get(), "Scheduler::new: called");
        Self {
            shared: Arc::new(Shared {
                limit: concurrency,
                state: Mutex::new(SchedulerState {
                    running: 0,
                    pending: PendingQueue::new(),
                    next_id: 0,
                    stats: SchedulerStats::default(),
                }),
            }),
        }
    }

    // == Concurrency ==
    /// Returns the fixed concurrency limit.
    pub fn concurrency(&self) -> usize {
        self.shared.limit.get()
    }

    /// Admit a task, starting it now if a slot is free and queuing it
    /// otherwise.
    ///
    /// `task` is not invoked until the task starts. The returned handle
    /// resolves with the task's value, or with [`TaskError::Failed`] carrying
    /// its error unchanged. A failing task never stalls the queue.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime. The scheduler is left
    /// untouched in that case.
    pub fn submit<F, Fut, T, E>(&self, task: F) -> TaskHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        if Handle::try_current().is_err() {
            panic!("Scheduler::submit must be called from within a tokio runtime");
        }

        let (sender, receiver) = oneshot::channel();
        let reporter = Reporter {
            sender: Some(sender),
        };
        let job: Job = Box::pin(async move {
            let outcome = task().await;
            let succeeded = outcome.is_ok();
            reporter.report(outcome);
            succeeded
        });

        let mut state = self.shared.state.lock();
        let id = TaskId(state.next_id);
        state.next_id += 1;
        state.stats.submitted += 1;

        let task = PendingTask { id, job };
        if state.running < self.shared.limit.get() {
            state.running += 1;
            state.observe();
            drop(state);
            self.shared.launch(task);
        } else {
            state.pending.push(task);
            state.observe();
            debug!(
                task_id = %id,
                pending = state.pending.len(),
                "Scheduler::submit: concurrent limit reached, queuing"
            );
        }

        TaskHandle::new(id, receiver)
    }

    // == Stats ==
    /// Returns a snapshot of the scheduler's counters.
    pub fn stats(&self) -> SchedulerStats {
        self.shared.state.lock().stats.clone()
    }

    // == Running ==
    /// Returns the number of tasks currently holding a slot.
    pub fn running(&self) -> usize {
        self.shared.state.lock().running
    }

    // == Pending ==
    /// Returns the number of tasks waiting for a slot.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(NonZeroUsize::MIN)
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Scheduler")
            .field("concurrency", &self.shared.limit)
            .field("running", &state.running)
            .field("pending", &state.pending.len())
            .finish()
    }
}
