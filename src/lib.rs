//! Flowgate - concurrency control primitives for async work
//!
//! Provides a bounded-concurrency task scheduler with a FIFO backlog and a
//! single-flight, time-windowed cache around an async producer.

use std::future::Future;
use std::pin::Pin;

pub mod cache;
pub mod config;
pub mod error;
pub mod scheduler;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub use cache::{wrap_with_cache, CacheKey, CacheStats, FlightState, TimedCache};
pub use config::{CacheOptions, Config, SchedulerOptions};
pub use error::{CallError, ConfigError, TaskError};
pub use scheduler::{create_scheduler, Scheduler, SchedulerStats, TaskHandle, TaskId};
