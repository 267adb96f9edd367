//! Scheduler Module
//!
//! Bounded-concurrency execution of async tasks with a FIFO backlog.

mod core;
mod handle;
mod queue;
mod stats;


pub use self::core::{create_scheduler, Scheduler};
pub use handle::TaskHandle;
pub use queue::TaskId;
pub use stats::SchedulerStats;
