//! The authenticator: credential parsing, the two-tier identity cache, and
//! coalesced provider calls.
//!
//! One `GithubAuthenticator` instance owns all cache state, so independently
//! configured authenticators coexist safely in one process. The flow per
//! request:
//!
//! 1. Extract and parse the `Authorization` header; failures are terminal,
//!    no provider call is made.
//! 2. Resolve the identity through the memoized token cache, keyed by the
//!    credential's digest. Concurrent requests bearing the same credential
//!    collapse into one profile fetch; a cache hit skips the provider
//!    entirely.
//! 3. Deduplicate by natural id through the user registry, so different
//!    credentials of one user share a single identity and permission cache.
//! 4. Ensure the permission grant for the requested resource is live,
//!    fetching it through a single-flight round if not.
//!
//! Provider failures are never cached and are delivered to every waiter of
//! the round that produced them.

use std::sync::Arc;

use tracing::debug;

use super::cache::{BoundedCache, UserRegistry};
use super::identity::GithubIdentity;
use super::{AuthRequest, CoreIdentity, Credential, CredentialDigest, IdentityProvider, PermissionSet};
use crate::client::GithubApiClient;
use crate::config::Config;
use crate::error::{AuthError, ConfigError};
use crate::singleflight::{MemoizedFlight, SingleFlight};

/// Key of one coalesced permission fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PermissionRoundKey {
    login: String,
    organization: String,
    repository: String,
}

type TokenCache = BoundedCache<CredentialDigest, Arc<GithubIdentity>>;

/// Token authenticator with a bounded credential cache and a deduplicating
/// user registry.
///
/// # Examples
///
/// ```no_run
/// use github_token_auth::{AuthRequest, Config, GithubAuthenticator, Permission};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = GithubAuthenticator::from_value(serde_json::json!({}))?;
/// let request = AuthRequest::with_authorization("Bearer my-github-token");
///
/// let identity = auth.authenticate(&request, "my-org", "my-repo").await?;
/// if identity.is_authorized("my-org", "my-repo", Permission::Write) {
///     println!("{} may push", identity.name());
/// }
/// # Ok(())
/// # }
/// ```
pub struct GithubAuthenticator<P: IdentityProvider> {
    provider: Arc<P>,
    config: Config,
    credentials: MemoizedFlight<CredentialDigest, Arc<GithubIdentity>, AuthError, TokenCache>,
    users: UserRegistry,
    permission_rounds: SingleFlight<PermissionRoundKey, PermissionSet, AuthError>,
}

impl<P: IdentityProvider> GithubAuthenticator<P> {
    /// Create an authenticator over an identity provider.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the cache configuration is invalid. This is
    /// the only point where configuration can fail; requests never do.
    pub fn new(provider: P, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let token_cache = BoundedCache::new(config.cache.token_max_size);
        Ok(Self {
            provider: Arc::new(provider),
            config,
            credentials: MemoizedFlight::new(token_cache),
            users: UserRegistry::new(),
            permission_rounds: SingleFlight::new(),
        })
    }

    /// The authenticator configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Authenticate a request and ensure its permission grant for
    /// `organization`/`repository` is cached.
    ///
    /// Returns the shared identity; the caller makes authorization
    /// decisions through [`GithubIdentity::is_authorized`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError` when the header is missing or malformed, or when
    /// the provider rejects the credential or the permission query. Nothing
    /// is cached on failure.
    pub async fn authenticate(
        &self,
        request: &AuthRequest,
        organization: &str,
        repository: &str,
    ) -> Result<Arc<GithubIdentity>, AuthError> {
        let header = request
            .authorization()
            .ok_or(AuthError::MissingAuthorization)?;
        let credential = Credential::from_header(header)?;

        let identity = self.resolve_identity(&credential).await?;
        self.ensure_authorization(&credential, &identity, organization, repository)
            .await?;
        Ok(identity)
    }

    /// Number of credentials currently held by the token cache.
    pub fn cached_token_count(&self) -> usize {
        self.credentials.cache_len()
    }

    /// Number of distinct users with a live identity.
    pub fn live_user_count(&self) -> usize {
        self.users.live_users()
    }

    async fn resolve_identity(
        &self,
        credential: &Credential,
    ) -> Result<Arc<GithubIdentity>, AuthError> {
        let digest = CredentialDigest::of(credential);
        self.credentials
            .get_or_run(digest, move || async move {
                let profile = self.provider.fetch_profile(credential).await?;
                let core = CoreIdentity::from_profile(&profile)?;
                debug!(login = core.login(), "authenticated fresh identity");
                Ok(self
                    .users
                    .resolve_or_insert(core, profile, &self.config.cache))
            })
            .await
    }

    async fn ensure_authorization(
        &self,
        credential: &Credential,
        identity: &Arc<GithubIdentity>,
        organization: &str,
        repository: &str,
    ) -> Result<(), AuthError> {
        if identity.has_live_grant(organization, repository) {
            return Ok(());
        }

        let key = PermissionRoundKey {
            login: identity.id().to_string(),
            organization: organization.to_string(),
            repository: repository.to_string(),
        };
        let grants = self
            .permission_rounds
            .run(key, move || async move {
                let level = self
                    .provider
                    .fetch_permission(credential, identity.id(), organization, repository)
                    .await?;
                let grants = PermissionSet::from(level);
                // Commit inside the round so every follower observes the
                // grant the leader fetched.
                identity.authorize(organization, repository, grants);
                Ok(grants)
            })
            .await?;
        debug!(
            login = identity.id(),
            organization,
            repository,
            grants = ?grants,
            "permission grant refreshed"
        );
        Ok(())
    }
}

impl GithubAuthenticator<GithubApiClient> {
    /// Build an authenticator over the GitHub REST API from a JSON
    /// configuration value. This is the plugin-factory entry point.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the value does not deserialize (an explicit
    /// `"cache": null` included) or the HTTP client cannot be constructed.
    pub fn from_value(options: serde_json::Value) -> Result<Self, ConfigError> {
        let config = Config::from_value(options)?;
        let client = GithubApiClient::new(&config).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
        Self::new(client, config)
    }
}

impl<P: IdentityProvider> std::fmt::Debug for GithubAuthenticator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubAuthenticator")
            .field("config", &self.config)
            .field("cached_tokens", &self.cached_token_count())
            .field("provider", &"<IdentityProvider>")
            .finish()
    }
}

#[cfg(test)]
#[path = "authenticator_tests.rs"]
mod tests;
