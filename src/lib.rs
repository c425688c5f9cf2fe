//! # GitHub Token Auth
//!
//! Token authentication for GitHub-backed services, with coalesced provider
//! calls and bounded authorization caching.
//!
//! This crate provides:
//! - A pluggable authenticator that exchanges a bearer credential for a
//!   shared [`GithubIdentity`] carrying per-repository permission grants
//! - Single-flight coalescing and thread-safe memoization for keyed
//!   asynchronous operations
//! - A bounded LRU credential cache paired with a weak user registry, so
//!   identical users behind different credentials share one permission cache
//!   and evicted identities leave nothing behind
//! - An HTTP identity provider backed by the GitHub REST API
//!
//! # Examples
//!
//! ## Authenticating a request
//!
//! ```rust,no_run
//! use github_token_auth::{AuthRequest, GithubAuthenticator, Permission};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = GithubAuthenticator::from_value(serde_json::json!({
//!     "cache": { "token_max_size": 64 },
//! }))?;
//!
//! let request = AuthRequest::with_authorization("Bearer my-github-token");
//! let identity = auth.authenticate(&request, "my-org", "my-repo").await?;
//!
//! if identity.is_authorized("my-org", "my-repo", Permission::Write) {
//!     println!("{} may push to my-org/my-repo", identity.name());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Working with permission grants
//!
//! ```rust
//! use github_token_auth::{PermissionLevel, PermissionSet, Permission};
//!
//! let grants = PermissionSet::from(PermissionLevel::Read);
//! assert!(grants.contains(Permission::Read));
//! assert!(!grants.grants_write());
//! ```

// Public modules
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod singleflight;

// Re-export commonly used types at crate root for convenience
pub use error::{AuthError, ConfigError, ProviderError};

pub use auth::{
    AuthRequest, BoundedCache, CoreIdentity, Credential, CredentialDigest, GithubAuthenticator,
    GithubIdentity, IdentityProvider, Permission, PermissionLevel, PermissionSet, ProfileMap,
    UserRegistry,
};
pub use client::GithubApiClient;
pub use config::{CacheConfig, Config};
pub use singleflight::{FlightCache, MemoizedFlight, SingleFlight};
