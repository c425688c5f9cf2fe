//! Single-flight call coalescing and thread-safe memoization.
//!
//! [`SingleFlight`] collapses concurrent calls that share a key into one
//! execution: the first caller to arrive becomes the round's leader and runs
//! the operation, every other caller blocks until the leader finishes and
//! then shares its outcome (value or error) without running the operation
//! again. Once the last participant has left, the round is retired and a
//! later call with the same key starts fresh.
//!
//! [`MemoizedFlight`] adds a backing cache on top: successful outcomes are
//! committed to the cache inside the round, and every call consults the
//! cache before taking any lock, so repeated calls with a known key never
//! execute at all. Failures are not cached.
//!
//! # Examples
//!
//! ```
//! use github_token_auth::singleflight::SingleFlight;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let flight: SingleFlight<&'static str, u32, String> = SingleFlight::new();
//! let value = flight.run("answer", || async { Ok(42) }).await.unwrap();
//! assert_eq!(value, 42);
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// One coalescing round: the outcome slot plus the number of participants
/// still attached. The joiner count is only touched under the owning
/// registry's lock.
struct Round<T, E> {
    outcome: tokio::sync::Mutex<Option<Result<T, E>>>,
    joiners: AtomicUsize,
}

impl<T, E> Round<T, E> {
    fn new() -> Self {
        Self {
            outcome: tokio::sync::Mutex::new(None),
            joiners: AtomicUsize::new(0),
        }
    }
}

/// Single-flight coalescing for a keyed asynchronous operation.
///
/// Calls with distinct keys never contend. Calls sharing a key while a round
/// is live share that round's single execution; the leader's error is cloned
/// to every follower. The transient outcome is discarded when the round's
/// last participant leaves.
pub struct SingleFlight<K, T, E> {
    rounds: Mutex<HashMap<K, Arc<Round<T, E>>>>,
}

impl<K, T, E> SingleFlight<K, T, E>
where
    K: Eq + Hash + Clone,
    T: Clone,
    E: Clone,
{
    /// Create a coalescer with no rounds in flight.
    pub fn new() -> Self {
        Self {
            rounds: Mutex::new(HashMap::new()),
        }
    }

    /// Run `operation` under single-flight semantics for `key`.
    ///
    /// The first caller for a key executes the operation; concurrent callers
    /// for the same key wait and receive the same `Result`. After the round
    /// ends, the next call with that key executes again.
    pub async fn run<F, Fut>(&self, key: K, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let round = self.join(&key);

        let outcome = {
            let mut slot = round.outcome.lock().await;
            match &*slot {
                // A leader already completed this round; share its outcome.
                Some(existing) => existing.clone(),
                None => {
                    let result = operation().await;
                    *slot = Some(result.clone());
                    result
                }
            }
        };

        self.leave(&key, &round);
        outcome
    }

    /// Number of rounds currently live. Primarily an introspection hook for
    /// tests and diagnostics.
    pub fn in_flight(&self) -> usize {
        self.rounds.lock().len()
    }

    fn join(&self, key: &K) -> Arc<Round<T, E>> {
        let mut rounds = self.rounds.lock();
        let round = rounds
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Round::new()))
            .clone();
        round.joiners.fetch_add(1, Ordering::Relaxed);
        round
    }

    fn leave(&self, key: &K, round: &Arc<Round<T, E>>) {
        let mut rounds = self.rounds.lock();
        if round.joiners.fetch_sub(1, Ordering::Relaxed) == 1 {
            // Last one out retires the round, unless a fresh round already
            // replaced it under this key.
            if rounds.get(key).is_some_and(|live| Arc::ptr_eq(live, round)) {
                rounds.remove(key);
            }
        }
    }
}

impl<K, T, E> Default for SingleFlight<K, T, E>
where
    K: Eq + Hash + Clone,
    T: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Backing store contract for [`MemoizedFlight`].
///
/// `get` takes `&mut self` so stores with recency bookkeeping (an LRU cache)
/// can refresh entries on lookup.
pub trait FlightCache<K, V> {
    /// Look up a cached value.
    fn get(&mut self, key: &K) -> Option<V>;

    /// Commit a value. Eviction policy is the store's business.
    fn insert(&mut self, key: K, value: V);

    /// Number of cached entries.
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> FlightCache<K, V> for HashMap<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn get(&mut self, key: &K) -> Option<V> {
        HashMap::get(self, key).cloned()
    }

    fn insert(&mut self, key: K, value: V) {
        HashMap::insert(self, key, value);
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }
}

/// Single-flight coalescing with a memoizing backing cache.
///
/// The cache is consulted before any coordination lock; a hit short-circuits
/// the call entirely. On leader success the value is committed to the cache
/// before the round's mutex is released, so every follower and every later
/// caller observes it. A failed round leaves no cache entry.
pub struct MemoizedFlight<K, T, E, C> {
    cache: Mutex<C>,
    flight: SingleFlight<K, T, E>,
}

impl<K, T, E, C> MemoizedFlight<K, T, E, C>
where
    K: Eq + Hash + Clone,
    T: Clone,
    E: Clone,
    C: FlightCache<K, T>,
{
    /// Wrap a backing cache.
    pub fn new(cache: C) -> Self {
        Self {
            cache: Mutex::new(cache),
            flight: SingleFlight::new(),
        }
    }

    /// Return the cached value for `key`, or run `operation` under
    /// single-flight semantics and cache its success.
    pub async fn get_or_run<F, Fut>(&self, key: K, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.cache.lock().get(&key) {
            return Ok(hit);
        }

        let cache = &self.cache;
        let committed_key = key.clone();
        self.flight
            .run(key, move || async move {
                let value = operation().await?;
                cache.lock().insert(committed_key, value.clone());
                Ok(value)
            })
            .await
    }

    /// Number of entries in the backing cache.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Run a closure against the backing cache, under its lock.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.cache.lock())
    }
}

#[cfg(test)]
#[path = "singleflight_tests.rs"]
mod tests;
