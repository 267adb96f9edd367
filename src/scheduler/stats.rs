//! Scheduler Statistics Module

use serde::Serialize;

// == Scheduler Stats ==
/// Snapshot of a scheduler's counters and current load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Tasks accepted by `submit`
    pub submitted: u64,
    /// Tasks that returned `Ok`
    pub succeeded: u64,
    /// Tasks that returned `Err`
    pub failed: u64,
    /// Tasks that panicked
    pub panicked: u64,
    /// Tasks torn down by runtime shutdown, running or still queued
    pub cancelled: u64,
    /// Tasks currently running
    pub running: usize,
    /// Tasks waiting for a slot
    pub pending: usize,
    /// Highest number of tasks seen running at once
    pub peak_running: usize,
    /// Highest number of tasks seen waiting at once
    pub peak_pending: usize,
}

impl SchedulerStats {
    /// Number of tasks that have settled in any way.
    pub fn settled(&self) -> u64 {
        self.succeeded + self.failed + self.panicked + self.cancelled
    }

    pub(crate) fn record_outcome(&mut self, succeeded: bool) {
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub(crate) fn observe(&mut self, running: usize, pending: usize) {
        self.running = running;
        self.pending = pending;
        self.peak_running = self.peak_running.max(running);
        self.peak_pending = self.peak_pending.max(pending);
    }
}
