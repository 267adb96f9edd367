//! Cache Statistics Module
//!
//! Tracks how calls to a timed cache were served.

use serde::Serialize;

// == Cache Stats ==
/// Counters for one cache wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls served from the cached entry
    pub hits: u64,
    /// Calls that had to wait on a producer execution
    pub misses: u64,
    /// Misses that joined an execution started by an earlier call
    pub joins: u64,
    /// Producer executions started
    pub executions: u64,
    /// Producer executions that failed or were abandoned
    pub failures: u64,
}

impl CacheStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no calls have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Records a call served from the cached entry.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Records a miss that started a new producer execution.
    pub fn record_execution(&mut self) {
        self.misses += 1;
        self.executions += 1;
    }

    /// Records a miss that joined the running execution.
    pub fn record_join(&mut self) {
        self.misses += 1;
        self.joins += 1;
    }

    /// Records an execution that failed or was abandoned.
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }
}
