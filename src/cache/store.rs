//! Timed Cache Module
//!
//! Wraps an async producer so concurrent calls share one execution and later
//! calls reuse its result while it is fresh.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::cache::{CacheEntry, CacheKey, CacheStats};
use crate::config::{CacheOptions, KeyFn};
use crate::error::CallError;
use crate::BoxFuture;

type Producer<A, T, E> = Arc<dyn Fn(A) -> BoxFuture<Result<T, E>> + Send + Sync>;
type Waiter<T, E> = oneshot::Sender<Result<T, CallError<E>>>;

// == Flight State ==
/// Observable state of a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    /// No fresh result and nothing running
    Idle,
    /// A result younger than the TTL is cached
    Fresh,
    /// A producer execution is outstanding
    InFlight,
}

/// The outstanding execution and every call waiting on it.
struct Flight<T, E> {
    key: CacheKey,
    waiters: Vec<Waiter<T, E>>,
}

struct Slot<T, E> {
    entry: Option<CacheEntry<T>>,
    in_flight: Option<Flight<T, E>>,
    stats: CacheStats,
}

struct Inner<A, T, E> {
    producer: Producer<A, T, E>,
    key_fn: KeyFn<A>,
    ttl: Duration,
    slot: Mutex<Slot<T, E>>,
}

impl<A, T, E> Inner<A, T, E> {
    /// Clears an execution that ended without an outcome and releases its
    /// waiters.
    fn abandon(&self) {
        let mut slot = self.slot.lock();
        if let Some(flight) = slot.in_flight.take() {
            slot.stats.record_failure();
            warn!(key = %flight.key, waiters = flight.waiters.len(), "producer execution abandoned");
            for waiter in flight.waiters {
                let _ = waiter.send(Err(CallError::Abandoned));
            }
        }
    }
}

impl<A, T: Clone, E: Clone> Inner<A, T, E> {
    fn settle(&self, outcome: Result<T, E>) {
        let mut guard = self.slot.lock();
        let slot = &mut *guard;
        let Some(Flight { key, waiters }) = slot.in_flight.take() else {
            return;
        };

        match outcome {
            Ok(value) => {
                debug!(%key, waiters = waiters.len(), "producer settled");
                for waiter in waiters {
                    let _ = waiter.send(Ok(value.clone()));
                }
                slot.entry = Some(CacheEntry::new(value, key));
            }
            Err(err) => {
                slot.stats.record_failure();
                warn!(%key, waiters = waiters.len(), "producer failed");
                for waiter in waiters {
                    let _ = waiter.send(Err(CallError::Producer(err.clone())));
                }
            }
        }
    }
}

/// Settles the flight it was created for, or abandons it if dropped first.
struct FlightGuard<A, T, E> {
    inner: Option<Arc<Inner<A, T, E>>>,
}

impl<A, T: Clone, E: Clone> FlightGuard<A, T, E> {
    fn settle(mut self, outcome: Result<T, E>) {
        if let Some(inner) = self.inner.take() {
            inner.settle(outcome);
        }
    }
}

impl<A, T, E> Drop for FlightGuard<A, T, E> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.abandon();
        }
    }
}

// == Timed Cache ==
/// A single-flight, time-windowed wrapper around an async producer.
///
/// Clones share one cached entry and one in-flight slot; separate
/// [`wrap_with_cache`] calls never share state.
pub struct TimedCache<A, T, E> {
    inner: Arc<Inner<A, T, E>>,
}

impl<A, T, E> Clone for TimedCache<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, T, E> fmt::Debug for TimedCache<A, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedCache")
            .field("ttl", &self.inner.ttl)
            .field("stats", &self.inner.slot.lock().stats)
            .finish_non_exhaustive()
    }
}

/// Wraps `producer` in a [`TimedCache`].
pub fn wrap_with_cache<A, T, E, F, Fut>(producer: F, options: CacheOptions<A>) -> TimedCache<A, T, E>
where
    A: Send + 'static,
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    TimedCache::new(producer, options)
}

impl<A, T, E> TimedCache<A, T, E>
where
    A: Send + 'static,
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    // == Constructor ==
    pub fn new<F, Fut>(producer: F, options: CacheOptions<A>) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let producer: Producer<A, T, E> =
            Arc::new(move |args: A| Box::pin(producer(args)) as BoxFuture<Result<T, E>>);

        Self {
            inner: Arc::new(Inner {
                producer,
                key_fn: options.key_fn,
                ttl: options.ttl,
                slot: Mutex::new(Slot {
                    entry: None,
                    in_flight: None,
                    stats: CacheStats::new(),
                }),
            }),
        }
    }

    // == Call ==
    /// Returns the cached result for `args`, or waits on a producer execution.
    ///
    /// A call that finds an execution already running joins it and receives
    /// that execution's result, even though it was computed from the
    /// arguments of the call that started it.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime when an execution must start.
    pub async fn call(&self, args: A) -> Result<T, CallError<E>> {
        let key = (self.inner.key_fn)(&args);

        let (receiver, starts) = {
            let mut guard = self.inner.slot.lock();
            let slot = &mut *guard;

            if let Some(entry) = &slot.entry {
                if entry.serves(&key, self.inner.ttl) {
                    let value = entry.value.clone();
                    slot.stats.record_hit();
                    trace!(%key, "cache hit");
                    return Ok(value);
                }
            }

            let (sender, receiver) = oneshot::channel();
            let starts = match slot.in_flight.as_mut() {
                Some(flight) => {
                    flight.waiters.push(sender);
                    slot.stats.record_join();
                    debug!(%key, in_flight = %flight.key, "joining in-flight execution");
                    false
                }
                None => {
                    slot.in_flight = Some(Flight {
                        key: key.clone(),
                        waiters: vec![sender],
                    });
                    slot.stats.record_execution();
                    true
                }
            };
            (receiver, starts)
        };

        if starts {
            self.start(args, key);
        }

        receiver.await.unwrap_or(Err(CallError::Abandoned))
    }

    fn start(&self, args: A, key: CacheKey) {
        debug!(%key, "starting producer execution");
        // Guard first so a producer that panics while building its future
        // still clears the flight.
        let guard = FlightGuard {
            inner: Some(Arc::clone(&self.inner)),
        };
        let execution = (self.inner.producer)(args);

        tokio::spawn(async move {
            let outcome = execution.await;
            guard.settle(outcome);
        });
    }
}

impl<A, T, E> TimedCache<A, T, E> {
    // == TTL ==
    /// Returns how long a settled result stays fresh.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    // == Stats ==
    /// Returns a snapshot of the call counters.
    pub fn stats(&self) -> CacheStats {
        self.inner.slot.lock().stats.clone()
    }

    // == State ==
    /// Returns the current state of the wrapper.
    pub fn state(&self) -> FlightState {
        let slot = self.inner.slot.lock();
        if slot.in_flight.is_some() {
            FlightState::InFlight
        } else if slot
            .entry
            .as_ref()
            .is_some_and(|entry| entry.is_fresh(self.inner.ttl))
        {
            FlightState::Fresh
        } else {
            FlightState::Idle
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_cache(
        ttl_seconds: u64,
        delay_ms: u64,
    ) -> (TimedCache<u32, u32, String>, Arc<AtomicUsize>) {
        let executions = Arc::new(AtomicUsize::new(0));
        let counter = executions.clone();
        let cache = wrap_with_cache(
            move |n: u32| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Ok::<_, String>(n * 10)
                }
            },
            CacheOptions::default()
                .ttl_seconds(ttl_seconds)
                .key_fn(|n: &u32| (*n).into()),
        );
        (cache, executions)
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_transitions() {
        let (cache, _) = counting_cache(1, 100);
        assert_eq!(cache.state(), FlightState::Idle);

        let pending = tokio::spawn({
            let cache = cache.clone();
            async move { cache.call(1).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(cache.state(), FlightState::InFlight);

        assert_eq!(pending.await.unwrap(), Ok(10));
        assert_eq!(cache.state(), FlightState::Fresh);

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_eq!(cache.state(), FlightState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_hit_skips_producer() {
        let (cache, executions) = counting_cache(60, 10);

        assert_eq!(cache.call(3).await, Ok(30));
        assert_eq!(cache.call(3).await, Ok(30));

        assert_eq!(executions.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.executions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_change_replaces_entry() {
        let (cache, executions) = counting_cache(60, 10);

        assert_eq!(cache.call(1).await, Ok(10));
        assert_eq!(cache.call(2).await, Ok(20));
        // Single slot: the entry for key 1 was replaced wholesale
        assert_eq!(cache.call(1).await, Ok(10));

        assert_eq!(executions.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_producer_is_abandoned() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let cache = wrap_with_cache(
            move |_: ()| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        panic!("producer blew up");
                    }
                    Ok::<_, String>("recovered")
                }
            },
            CacheOptions::default().key_fn(|_| "k".into()),
        );

        assert_eq!(cache.call(()).await, Err(CallError::Abandoned));
        assert_eq!(cache.state(), FlightState::Idle);
        assert_eq!(cache.call(()).await, Ok("recovered"));
        assert_eq!(cache.stats().failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_one_slot() {
        let (cache, executions) = counting_cache(60, 10);
        let other = cache.clone();

        assert_eq!(cache.call(4).await, Ok(40));
        assert_eq!(other.call(4).await, Ok(40));
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_wrappers_are_isolated() {
        let (first, first_runs) = counting_cache(60, 10);
        let (second, second_runs) = counting_cache(60, 10);

        first.call(5).await.unwrap();
        second.call(5).await.unwrap();

        assert_eq!(first_runs.load(Ordering::SeqCst), 1);
        assert_eq!(second_runs.load(Ordering::SeqCst), 1);
    }
}
