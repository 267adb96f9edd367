//! Cache Entry Module
//!
//! Defines the cache key and the single cached result slot.

use std::fmt;
use std::num::TryFromIntError;
use std::time::Duration;

use tokio::time::Instant;

// == Cache Key ==
/// Key a cached result is stored under.
///
/// Keys compare by value. Unsigned integers above `i64::MAX` are rejected by
/// the `TryFrom` conversions. There is no float variant: map float keys to
/// text (for example with `format!("{x}")`) so equality is well defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Text(String),
    Number(i64),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Text(text) => f.write_str(text),
            CacheKey::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        CacheKey::Text(value)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        CacheKey::Text(value.to_string())
    }
}

impl From<i64> for CacheKey {
    fn from(value: i64) -> Self {
        CacheKey::Number(value)
    }
}

impl From<i32> for CacheKey {
    fn from(value: i32) -> Self {
        CacheKey::Number(value.into())
    }
}

impl From<u32> for CacheKey {
    fn from(value: u32) -> Self {
        CacheKey::Number(value.into())
    }
}

impl TryFrom<u64> for CacheKey {
    type Error = TryFromIntError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(CacheKey::Number)
    }
}

impl TryFrom<usize> for CacheKey {
    type Error = TryFromIntError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        i64::try_from(value).map(CacheKey::Number)
    }
}

/// Key used when no key function is supplied: the current Unix time in
/// milliseconds.
///
/// Calls more than a millisecond apart get distinct keys, so this only
/// coalesces calls that overlap an in-flight execution.
pub fn default_key_fn() -> CacheKey {
    CacheKey::Number(chrono::Utc::now().timestamp_millis())
}

// == Cache Entry ==
/// The last successful producer result and when it was computed.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The stored value
    pub value: T,
    /// Key computed by the call that triggered the execution
    pub key: CacheKey,
    /// Settlement time of the execution
    pub computed_at: Instant,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(value: T, key: CacheKey) -> Self {
        Self {
            value,
            key,
            computed_at: Instant::now(),
        }
    }

    // == Is Fresh ==
    /// Returns true while no more than `ttl` has elapsed since computation.
    ///
    /// The boundary is inclusive: an entry exactly `ttl` old is still fresh.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.computed_at.elapsed() <= ttl
    }

    /// Returns true if the entry is fresh and was stored under `key`.
    pub fn serves(&self, key: &CacheKey, ttl: Duration) -> bool {
        &self.key == key && self.is_fresh(ttl)
    }
}
