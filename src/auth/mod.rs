//! Identity and permission model for GitHub token authentication.
//!
//! This module provides the core authentication types:
//! - Permission vocabulary ([`Permission`], [`PermissionSet`],
//!   [`PermissionLevel`])
//! - Identity projection from provider payloads ([`CoreIdentity`])
//! - Credential extraction from the `Authorization` header ([`Credential`],
//!   [`CredentialDigest`], [`AuthRequest`])
//! - The identity provider trait interface ([`IdentityProvider`])

use std::collections::HashMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{AuthError, ProviderError};

mod authenticator;
mod cache;
mod identity;

pub use authenticator::GithubAuthenticator;
pub use cache::{BoundedCache, UserRegistry};
pub use identity::GithubIdentity;

/// Raw profile payload as returned by the identity provider.
pub type ProfileMap = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Permission Types
// ============================================================================

/// A single permission on an (organization, repository) resource.
///
/// `Write` is the only write-capable permission; `ReadMeta` and `Read` are
/// read-only tiers with identical TTL treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read repository metadata.
    ReadMeta,
    /// Read repository contents.
    Read,
    /// Write repository contents.
    Write,
}

impl Permission {
    const fn bit(self) -> u8 {
        match self {
            Self::ReadMeta => 0b001,
            Self::Read => 0b010,
            Self::Write => 0b100,
        }
    }
}

/// A set of [`Permission`] values held for one (organization, repository).
///
/// # Examples
///
/// ```
/// use github_token_auth::{Permission, PermissionSet};
///
/// let grants = PermissionSet::read_only();
/// assert!(grants.contains(Permission::Read));
/// assert!(!grants.grants_write());
/// assert!(PermissionSet::all().grants_write());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PermissionSet(u8);

impl PermissionSet {
    /// The empty grant set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// All permissions, including write.
    pub const fn all() -> Self {
        Self(0b111)
    }

    /// The read-only tier: metadata and contents reads.
    pub const fn read_only() -> Self {
        Self(0b011)
    }

    /// Whether `permission` is in the set.
    pub fn contains(self, permission: Permission) -> bool {
        self.0 & permission.bit() != 0
    }

    /// Add a permission to the set.
    pub fn insert(&mut self, permission: Permission) {
        self.0 |= permission.bit();
    }

    /// Whether the set holds write permission.
    pub fn grants_write(self) -> bool {
        self.contains(Permission::Write)
    }

    /// Whether the set holds no permissions.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for permission in [Permission::ReadMeta, Permission::Read, Permission::Write] {
            if self.contains(permission) {
                set.entry(&permission);
            }
        }
        set.finish()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut set = Self::empty();
        for permission in iter {
            set.insert(permission);
        }
        set
    }
}

/// Permission level reported by the provider's collaborator-permission
/// endpoint.
///
/// The vocabulary is closed on the provider side but deserialized leniently:
/// any unrecognized level maps to `Unknown`, which grants nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Admin,
    Write,
    Read,
    None,
    #[serde(other)]
    Unknown,
}

impl From<PermissionLevel> for PermissionSet {
    fn from(level: PermissionLevel) -> Self {
        match level {
            PermissionLevel::Admin | PermissionLevel::Write => Self::all(),
            PermissionLevel::Read => Self::read_only(),
            PermissionLevel::None | PermissionLevel::Unknown => Self::empty(),
        }
    }
}

// ============================================================================
// Identity Projection
// ============================================================================

/// Immutable projection of the provider's user profile.
///
/// Built once from the raw payload by selecting exactly the stable fields;
/// everything else is ignored here (the full payload is retained on
/// [`GithubIdentity`]). `login` is the natural key used to recognize the
/// same underlying user across different credentials.
///
/// # Examples
///
/// ```
/// use github_token_auth::CoreIdentity;
///
/// let profile = serde_json::json!({
///     "login": "kingofthebritons",
///     "id": "12345678",
///     "name": "arthur",
///     "email": "arthur@camelot.gov.uk",
///     "other_field": "ignored",
/// });
/// let core = CoreIdentity::from_profile(profile.as_object().unwrap()).unwrap();
/// assert_eq!(core.login(), "kingofthebritons");
/// assert_eq!(core.github_id(), "12345678");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoreIdentity {
    login: String,
    github_id: String,
    name: String,
    email: String,
}

impl CoreIdentity {
    /// Project a raw profile payload.
    ///
    /// `login` and `id` are required; `id` may arrive as a JSON string or
    /// number. `name` and `email` may be absent or null (the provider hides
    /// private emails) and default to the login and the empty string.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::MalformedPayload` if `login` or `id` is
    /// missing or not a scalar.
    pub fn from_profile(profile: &ProfileMap) -> Result<Self, ProviderError> {
        let login = required_scalar(profile, "login")?;
        let github_id = required_scalar(profile, "id")?;
        let name = optional_scalar(profile, "name").unwrap_or_else(|| login.clone());
        let email = optional_scalar(profile, "email").unwrap_or_default();
        Ok(Self {
            login,
            github_id,
            name,
            email,
        })
    }

    /// The natural key: the provider login.
    pub fn login(&self) -> &str {
        &self.login
    }

    /// The provider's opaque user id, rendered as a string.
    pub fn github_id(&self) -> &str {
        &self.github_id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Email address, possibly empty.
    pub fn email(&self) -> &str {
        &self.email
    }
}

fn scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_scalar(profile: &ProfileMap, field: &str) -> Result<String, ProviderError> {
    profile
        .get(field)
        .and_then(scalar)
        .ok_or_else(|| ProviderError::MalformedPayload {
            message: format!("profile field '{field}' is missing or not a scalar"),
        })
}

fn optional_scalar(profile: &ProfileMap, field: &str) -> Option<String> {
    profile.get(field).and_then(scalar)
}

// ============================================================================
// Credentials
// ============================================================================

/// An opaque bearer credential extracted from the `Authorization` header.
///
/// The secret is never exposed in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Extract the credential from an `Authorization` header value.
    ///
    /// Two provider conventions are recognized, scheme-case-insensitively:
    /// `Bearer <token>` and `Basic <base64 user:token>` (the password half
    /// carries the token).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnsupportedScheme` for any other scheme and
    /// `AuthError::MalformedCredential` when the parameter cannot be
    /// decoded or is empty.
    pub fn from_header(header: &str) -> Result<Self, AuthError> {
        let (scheme, param) =
            header
                .trim()
                .split_once(' ')
                .ok_or_else(|| AuthError::MalformedCredential {
                    message: "authorization header has no parameter".to_string(),
                })?;
        let param = param.trim();

        let token = if scheme.eq_ignore_ascii_case("bearer") {
            param.to_string()
        } else if scheme.eq_ignore_ascii_case("basic") {
            let decoded = BASE64
                .decode(param)
                .map_err(|e| AuthError::MalformedCredential {
                    message: format!("invalid base64 in basic credential: {e}"),
                })?;
            let decoded =
                String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredential {
                    message: "basic credential is not valid UTF-8".to_string(),
                })?;
            let (_, password) =
                decoded
                    .split_once(':')
                    .ok_or_else(|| AuthError::MalformedCredential {
                        message: "basic credential has no password".to_string(),
                    })?;
            password.to_string()
        } else {
            return Err(AuthError::UnsupportedScheme {
                scheme: scheme.to_string(),
            });
        };

        if token.is_empty() {
            return Err(AuthError::MalformedCredential {
                message: "credential token is empty".to_string(),
            });
        }
        Ok(Self(token))
    }

    /// The raw token, for provider requests.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Security: don't expose the secret in debug output
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<REDACTED>").finish()
    }
}

/// SHA-256 digest of a credential, used as the token cache key.
///
/// Caching the digest rather than the secret bounds memory and avoids
/// retaining plaintext tokens beyond the provider call.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialDigest([u8; 32]);

impl CredentialDigest {
    /// Digest a credential.
    pub fn of(credential: &Credential) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(credential.as_str().as_bytes());
        Self(hasher.finalize().into())
    }
}

impl fmt::Debug for CredentialDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialDigest({}..)", hex::encode(&self.0[..4]))
    }
}

// ============================================================================
// Request Facade
// ============================================================================

/// Framework-agnostic view of an incoming HTTP request.
///
/// The authenticator needs exactly one capability from the web framework:
/// the value of the `Authorization` header. Adapters build an `AuthRequest`
/// from whatever request type their framework uses.
///
/// # Examples
///
/// ```
/// use github_token_auth::AuthRequest;
///
/// let request = AuthRequest::with_authorization("Bearer my-token");
/// assert_eq!(request.authorization(), Some("Bearer my-token"));
/// ```
#[derive(Debug, Clone)]
pub struct AuthRequest {
    headers: HashMap<String, String>,
}

impl AuthRequest {
    /// Create a request view from HTTP headers.
    pub fn new(headers: HashMap<String, String>) -> Self {
        Self { headers }
    }

    /// Create a request view carrying only an `Authorization` header.
    pub fn with_authorization(value: impl Into<String>) -> Self {
        Self::new(HashMap::from([("authorization".to_string(), value.into())]))
    }

    /// Get the `Authorization` header value, if present.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get("authorization")
            .or_else(|| self.headers.get("Authorization"))
            .map(|s| s.as_str())
    }
}

// ============================================================================
// Provider Interface
// ============================================================================

/// Contract for the remote identity provider.
///
/// Two opaque operations: exchange a credential for a user profile, and look
/// up the permission level a user holds on a repository. Implementations are
/// expected to be stateless per call; all caching and call coalescing happens
/// in the authenticator.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch the user profile for a credential.
    async fn fetch_profile(&self, credential: &Credential) -> Result<ProfileMap, ProviderError>;

    /// Fetch the permission level `login` holds on
    /// `organization`/`repository`.
    async fn fetch_permission(
        &self,
        credential: &Credential,
        login: &str,
        organization: &str,
        repository: &str,
    ) -> Result<PermissionLevel, ProviderError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
