//! Two-tier identity cache plumbing.
//!
//! [`BoundedCache`] is the owning tier: a least-recently-used cache from
//! credential digests to shared identities, honoring a capacity of zero as
//! "disabled". [`UserRegistry`] is the non-owning tier: it maps a user's
//! natural id to a weak reference, so two credentials for the same user
//! share one identity, and the entry vanishes once the owning tier (or any
//! other holder) releases the last strong reference.

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::Mutex;

use super::GithubIdentity;
use crate::config::CacheConfig;
use crate::singleflight::FlightCache;

/// Least-recently-used cache that treats capacity `0` as "disabled".
///
/// With a disabled cache every lookup misses and every insert is dropped;
/// otherwise an insert beyond capacity evicts the least-recently-used entry.
///
/// # Examples
///
/// ```
/// use github_token_auth::BoundedCache;
///
/// let mut cache: BoundedCache<&'static str, u32> = BoundedCache::new(2);
/// cache.insert("a", 1);
/// cache.insert("b", 2);
/// cache.insert("c", 3);
/// assert_eq!(cache.get(&"a"), None);
/// assert_eq!(cache.get(&"c"), Some(3));
/// ```
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Option<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> std::fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<K: Hash + Eq, V: Clone> BoundedCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    /// Look up an entry, marking it most-recently-used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.inner.as_mut()?.get(key).cloned()
    }

    /// Insert an entry, evicting the least-recently-used one if full.
    /// Dropped entirely when the cache is disabled.
    pub fn insert(&mut self, key: K, value: V) {
        if let Some(inner) = self.inner.as_mut() {
            inner.push(key, value);
        }
    }

    /// Whether the cache holds an entry, without touching recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.contains(key))
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, LruCache::len)
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity; `0` when disabled.
    pub fn capacity(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.cap().get())
    }
}

impl<K: Hash + Eq, V: Clone> FlightCache<K, V> for BoundedCache<K, V> {
    fn get(&mut self, key: &K) -> Option<V> {
        BoundedCache::get(self, key)
    }

    fn insert(&mut self, key: K, value: V) {
        BoundedCache::insert(self, key, value);
    }

    fn len(&self) -> usize {
        BoundedCache::len(self)
    }
}

/// Non-owning registry of live identities, keyed by natural id.
///
/// Entries hold `Weak` references: the registry never keeps an identity
/// alive. Dead entries are pruned on every touch, so the registry's view
/// tracks the set of identities that still have an owner (normally a token
/// cache entry or a caller-held `Arc`).
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: Mutex<HashMap<String, Weak<GithubIdentity>>>,
}

impl UserRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the identity for `core`'s natural id, or build and register
    /// a new one from the given profile payload.
    ///
    /// Two credentials resolving to the same login share the returned
    /// identity, and with it one permission cache.
    pub fn resolve_or_insert(
        &self,
        core: super::CoreIdentity,
        raw: super::ProfileMap,
        cache: &CacheConfig,
    ) -> Arc<GithubIdentity> {
        let mut users = self.users.lock();
        users.retain(|_, user| user.strong_count() > 0);

        if let Some(existing) = users.get(core.login()).and_then(Weak::upgrade) {
            return existing;
        }

        let identity = Arc::new(GithubIdentity::new(core, raw, cache));
        users.insert(identity.id().to_string(), Arc::downgrade(&identity));
        identity
    }

    /// Resolve a live identity by natural id.
    pub fn resolve(&self, login: &str) -> Option<Arc<GithubIdentity>> {
        self.users.lock().get(login).and_then(Weak::upgrade)
    }

    /// Number of identities that still have a live owner.
    pub fn live_users(&self) -> usize {
        let mut users = self.users.lock();
        users.retain(|_, user| user.strong_count() > 0);
        users.len()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
