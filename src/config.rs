//! Configuration Module
//!
//! Option structs for the scheduler and the timed cache, plus an
//! environment-driven loader for their defaults.

use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{default_key_fn, CacheKey};

/// Default concurrency limit for a scheduler
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Default validity window for cached results, in seconds
pub const DEFAULT_TTL_SECONDS: u64 = 300;

/// Maps a call's argument list to the key its cached result is stored under.
pub type KeyFn<A> = Arc<dyn Fn(&A) -> CacheKey + Send + Sync>;

/// Process-level defaults.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of tasks a scheduler runs at once
    pub concurrency: usize,
    /// Validity window of a cached result in seconds
    pub ttl_seconds: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FLOWGATE_CONCURRENCY` - Scheduler concurrency limit (default: 1)
    /// - `FLOWGATE_TTL_SECONDS` - Cache validity window in seconds (default: 300)
    pub fn from_env() -> Self {
        Self {
            concurrency: env::var("FLOWGATE_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CONCURRENCY),
            ttl_seconds: env::var("FLOWGATE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TTL_SECONDS),
        }
    }

    /// Scheduler options carrying this config's concurrency limit.
    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            concurrency: self.concurrency,
        }
    }

    /// Cache options carrying this config's TTL and the default key function.
    pub fn cache_options<A: 'static>(&self) -> CacheOptions<A> {
        CacheOptions::default().ttl_seconds(self.ttl_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }
}

// == Scheduler Options ==
/// Options for [`create_scheduler`](crate::create_scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Maximum number of tasks running at once; must be at least 1
    pub concurrency: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

// == Cache Options ==
/// Options for [`wrap_with_cache`](crate::wrap_with_cache).
///
/// The default key function returns the current wall-clock time in
/// milliseconds, so two calls only share a cached result when they land in
/// the same millisecond. Supply a key function derived from the arguments
/// to get real deduplication across calls.
pub struct CacheOptions<A> {
    /// How long a settled result stays fresh
    pub ttl: Duration,
    /// Derives the cache key from a call's arguments
    pub key_fn: KeyFn<A>,
}

impl<A> CacheOptions<A> {
    /// Replaces the validity window.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Replaces the validity window with a whole number of seconds.
    pub fn ttl_seconds(self, seconds: u64) -> Self {
        self.ttl(Duration::from_secs(seconds))
    }

    /// Replaces the key function.
    pub fn key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&A) -> CacheKey + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }
}

impl<A: 'static> Default for CacheOptions<A> {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
            key_fn: Arc::new(|_: &A| default_key_fn()),
        }
    }
}

impl<A> Clone for CacheOptions<A> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<A> fmt::Debug for CacheOptions<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.ttl_seconds, 300);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("FLOWGATE_CONCURRENCY");
        env::remove_var("FLOWGATE_TTL_SECONDS");

        let config = Config::from_env();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_converts_to_options() {
        let config = Config {
            concurrency: 4,
            ttl_seconds: 10,
        };

        assert_eq!(config.scheduler_options().concurrency, 4);
        assert_eq!(
            config.cache_options::<()>().ttl,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_cache_options_key_fn_override() {
        let options = CacheOptions::<(u32, u32)>::default().key_fn(|(a, b)| (a + b).into());
        assert_eq!((options.key_fn)(&(2, 3)), CacheKey::Number(5));
    }

    #[test]
    fn test_default_key_fn_tracks_wall_clock() {
        let options = CacheOptions::<()>::default();
        let before = chrono::Utc::now().timestamp_millis();
        let key = (options.key_fn)(&());
        let after = chrono::Utc::now().timestamp_millis();

        match key {
            CacheKey::Number(ms) => assert!(before <= ms && ms <= after),
            other => panic!("expected a timestamp key, got {:?}", other),
        }
    }
}
