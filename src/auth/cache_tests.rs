//! Tests for the bounded credential cache and the user registry.

use super::*;
use crate::auth::{CoreIdentity, ProfileMap};
use serde_json::json;

fn profile_for(login: &str) -> ProfileMap {
    json!({ "login": login, "id": format!("{}-id", login) })
        .as_object()
        .unwrap()
        .clone()
}

fn core_for(login: &str) -> CoreIdentity {
    CoreIdentity::from_profile(&profile_for(login)).unwrap()
}

// ============================================================================
// BoundedCache Tests
// ============================================================================

mod bounded_cache_tests {
    use super::*;

    /// Verify insert/get round trip within capacity.
    #[test]
    fn test_insert_and_get() {
        let mut cache: BoundedCache<&str, u32> = BoundedCache::new(2);

        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"missing"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.capacity(), 2);
    }

    /// Verify the least-recently-used entry is evicted at capacity, with
    /// lookups refreshing recency.
    #[test]
    fn test_lru_eviction_order() {
        let mut cache: BoundedCache<&str, u32> = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // touch "a" so "b" becomes the eviction candidate
        assert_eq!(cache.get(&"a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    /// Verify capacity zero disables the cache entirely.
    #[test]
    fn test_zero_capacity_disabled() {
        let mut cache: BoundedCache<&str, u32> = BoundedCache::new(0);

        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 0);
    }

    /// Verify inserting an existing key replaces its value without eviction.
    #[test]
    fn test_replacement() {
        let mut cache: BoundedCache<&str, u32> = BoundedCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), Some(2));
    }
}

// ============================================================================
// UserRegistry Tests
// ============================================================================

mod user_registry_tests {
    use super::*;
    use crate::config::CacheConfig;
    use std::sync::Arc;

    /// Verify two resolutions of the same login share one identity.
    #[test]
    fn test_dedup_by_login() {
        let registry = UserRegistry::new();
        let cache = CacheConfig::default();

        let first =
            registry.resolve_or_insert(core_for("arthur"), profile_for("arthur"), &cache);
        let second =
            registry.resolve_or_insert(core_for("arthur"), profile_for("arthur"), &cache);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.live_users(), 1);
    }

    /// Verify distinct logins get distinct identities.
    #[test]
    fn test_distinct_users() {
        let registry = UserRegistry::new();
        let cache = CacheConfig::default();

        let arthur =
            registry.resolve_or_insert(core_for("arthur"), profile_for("arthur"), &cache);
        let robin = registry.resolve_or_insert(core_for("robin"), profile_for("robin"), &cache);

        assert!(!Arc::ptr_eq(&arthur, &robin));
        assert_eq!(registry.live_users(), 2);
    }

    /// Verify registry entries vanish once the last owner releases the
    /// identity, with no explicit cleanup call.
    #[test]
    fn test_weak_cleanup() {
        let registry = UserRegistry::new();
        let cache = CacheConfig::default();

        let arthur =
            registry.resolve_or_insert(core_for("arthur"), profile_for("arthur"), &cache);
        let robin = registry.resolve_or_insert(core_for("robin"), profile_for("robin"), &cache);
        assert_eq!(registry.live_users(), 2);

        drop(arthur);
        assert_eq!(registry.live_users(), 1);
        assert!(registry.resolve("arthur").is_none());
        assert!(registry.resolve("robin").is_some());

        drop(robin);
        assert_eq!(registry.live_users(), 0);
    }

    /// Verify a released login is rebuilt fresh on the next resolution.
    #[test]
    fn test_reinsert_after_release() {
        let registry = UserRegistry::new();
        let cache = CacheConfig::default();

        let first =
            registry.resolve_or_insert(core_for("arthur"), profile_for("arthur"), &cache);
        drop(first);
        assert_eq!(registry.live_users(), 0);

        let second =
            registry.resolve_or_insert(core_for("arthur"), profile_for("arthur"), &cache);
        assert_eq!(registry.live_users(), 1);
        assert!(registry.resolve("arthur").is_some());
        drop(second);
    }
}
