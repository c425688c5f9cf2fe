//! Authenticated identity with its per-resource permission cache.
//!
//! A [`GithubIdentity`] is shared (behind an `Arc`) by every credential that
//! resolves to the same underlying user, so its permission cache is written
//! and read concurrently. Entries are keyed by (organization, repository)
//! and carry their own expiry; an expired entry is indistinguishable from an
//! absent one.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use super::{CoreIdentity, Permission, PermissionSet, ProfileMap};
use crate::config::CacheConfig;

/// Key of one permission grant: the resource coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RepoKey {
    organization: String,
    repository: String,
}

impl RepoKey {
    fn new(organization: &str, repository: &str) -> Self {
        Self {
            organization: organization.to_string(),
            repository: repository.to_string(),
        }
    }
}

/// Expiry of a cached grant.
///
/// `Once` marks a grant that is valid for exactly one consuming read. It is
/// written when the cache tier is disabled or the computed TTL is zero, and
/// it is what makes "authorize, then check exactly once" hold in those
/// configurations.
#[derive(Debug, Clone, Copy)]
enum Expiry {
    At(DateTime<Utc>),
    Once,
}

#[derive(Debug, Clone, Copy)]
struct PermissionEntry {
    granted: PermissionSet,
    expires: Expiry,
}

impl PermissionEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires {
            Expiry::At(instant) => now >= instant,
            Expiry::Once => false,
        }
    }
}

/// Per-identity cache of permission grants with level-dependent TTLs.
///
/// Backed by a sharded map so checks for different resources do not contend.
/// Capacity is enforced lazily: when full, expired entries are swept first,
/// and if the cache is still full one arbitrary entry is dropped so a fresh
/// grant always lands.
#[derive(Debug)]
pub(crate) struct PermissionCache {
    entries: DashMap<RepoKey, PermissionEntry>,
    max_entries: usize,
    write_ttl: Duration,
    other_ttl: Duration,
}

impl PermissionCache {
    fn new(config: &CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: config.auth_max_size,
            write_ttl: config.write_ttl(),
            other_ttl: config.other_ttl(),
        }
    }

    fn ttl_for(&self, grants: PermissionSet) -> Duration {
        if grants.grants_write() {
            self.write_ttl
        } else {
            self.other_ttl
        }
    }

    fn grant(&self, organization: &str, repository: &str, grants: PermissionSet) {
        let key = RepoKey::new(organization, repository);
        let ttl = self.ttl_for(grants);

        if self.max_entries > 0
            && self.entries.len() >= self.max_entries
            && !self.entries.contains_key(&key)
        {
            let now = Utc::now();
            self.entries.retain(|_, entry| !entry.is_expired(now));
            if self.entries.len() >= self.max_entries {
                let victim = self.entries.iter().next().map(|entry| entry.key().clone());
                if let Some(victim) = victim {
                    self.entries.remove(&victim);
                }
            }
        }

        let expires = if self.max_entries == 0 || ttl <= Duration::zero() {
            Expiry::Once
        } else {
            Expiry::At(Utc::now() + ttl)
        };
        self.entries.insert(key, PermissionEntry { granted: grants, expires });
    }

    /// Read the grant for a resource, consuming it if it is one-shot.
    ///
    /// Returns `None` for absent and expired entries alike (fail-closed);
    /// expired entries are pruned on the way out.
    fn take(&self, organization: &str, repository: &str) -> Option<PermissionSet> {
        let key = RepoKey::new(organization, repository);
        let (granted, expires) = {
            let entry = self.entries.get(&key)?;
            (entry.granted, entry.expires)
        };
        match expires {
            Expiry::At(instant) => {
                let now = Utc::now();
                if now >= instant {
                    self.entries
                        .remove_if(&key, |_, entry| entry.is_expired(now));
                    None
                } else {
                    Some(granted)
                }
            }
            // The removal is the consuming read: under concurrency only one
            // reader obtains the entry.
            Expiry::Once => self
                .entries
                .remove_if(&key, |_, entry| matches!(entry.expires, Expiry::Once))
                .map(|(_, entry)| entry.granted),
        }
    }

    /// Whether a live grant exists for the resource, without consuming it.
    fn has_live(&self, organization: &str, repository: &str) -> bool {
        let key = RepoKey::new(organization, repository);
        let now = Utc::now();
        let expired = match self.entries.get(&key) {
            Some(entry) => entry.is_expired(now),
            None => return false,
        };
        if expired {
            self.entries
                .remove_if(&key, |_, entry| entry.is_expired(now));
            return false;
        }
        true
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// An authenticated user identity with cached permission grants.
///
/// Immutable apart from [`authorize`](Self::authorize); one instance is
/// shared by all credentials belonging to the same underlying user, so a
/// permission granted through one credential is visible through the others.
///
/// # Examples
///
/// ```
/// use github_token_auth::{CacheConfig, CoreIdentity, GithubIdentity, Permission, PermissionSet};
///
/// let profile = serde_json::json!({"login": "arthur", "id": 12345678});
/// let profile = profile.as_object().unwrap().clone();
/// let core = CoreIdentity::from_profile(&profile).unwrap();
/// let user = GithubIdentity::new(core, profile, &CacheConfig::default());
///
/// assert!(!user.is_authorized("my-org", "my-repo", Permission::Read));
/// user.authorize("my-org", "my-repo", PermissionSet::read_only());
/// assert!(user.is_authorized("my-org", "my-repo", Permission::Read));
/// assert!(!user.is_authorized("my-org", "my-repo", Permission::Write));
/// ```
#[derive(Debug)]
pub struct GithubIdentity {
    core: CoreIdentity,
    raw: ProfileMap,
    permissions: PermissionCache,
}

impl GithubIdentity {
    /// Build an identity from its projected core, the raw provider payload,
    /// and the cache configuration.
    pub fn new(core: CoreIdentity, raw: ProfileMap, cache: &CacheConfig) -> Self {
        Self {
            core,
            raw,
            permissions: PermissionCache::new(cache),
        }
    }

    /// The natural id (provider login).
    pub fn id(&self) -> &str {
        self.core.login()
    }

    /// The provider's opaque user id.
    pub fn github_id(&self) -> &str {
        self.core.github_id()
    }

    /// Display name.
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Email address, possibly empty.
    pub fn email(&self) -> &str {
        self.core.email()
    }

    /// The projected core identity.
    pub fn core(&self) -> &CoreIdentity {
        &self.core
    }

    /// The raw profile payload the provider returned.
    pub fn profile(&self) -> &ProfileMap {
        &self.raw
    }

    /// The TTL a grant set would be cached with.
    pub fn cache_ttl(&self, grants: PermissionSet) -> Duration {
        self.permissions.ttl_for(grants)
    }

    /// Record a permission grant for a resource.
    ///
    /// Overwrites any prior grant for the same (organization, repository),
    /// resetting its expiry window. The TTL depends on the grant level:
    /// write-capable grants use the write TTL, everything else the other
    /// TTL.
    pub fn authorize(&self, organization: &str, repository: &str, grants: PermissionSet) {
        self.permissions.grant(organization, repository, grants);
    }

    /// Check a permission against the cached grants.
    ///
    /// Absent and expired grants both answer `false`. One-shot grants (zero
    /// TTL or disabled cache tier) are consumed by this call.
    pub fn is_authorized(
        &self,
        organization: &str,
        repository: &str,
        permission: Permission,
    ) -> bool {
        self.permissions
            .take(organization, repository)
            .map(|grants| grants.contains(permission))
            .unwrap_or(false)
    }

    /// The cached grant set for a resource, or the empty set.
    ///
    /// Same expiry rules as [`is_authorized`](Self::is_authorized).
    pub fn permissions(&self, organization: &str, repository: &str) -> PermissionSet {
        self.permissions
            .take(organization, repository)
            .unwrap_or_default()
    }

    /// Whether a live grant exists for the resource, without consuming a
    /// one-shot entry. Used by the authenticator to decide if a provider
    /// permission fetch is needed.
    pub(crate) fn has_live_grant(&self, organization: &str, repository: &str) -> bool {
        self.permissions.has_live(organization, repository)
    }

    /// Number of cached grants.
    pub fn cached_grant_count(&self) -> usize {
        self.permissions.len()
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
