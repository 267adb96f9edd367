//! Cache Module
//!
//! Single-flight, time-windowed caching of an async producer's result.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::{default_key_fn, CacheEntry, CacheKey};
pub use stats::CacheStats;
pub use store::{wrap_with_cache, FlightState, TimedCache};
