//! Error types for token authentication and authorization caching.
//!
//! This module defines all error types used throughout the crate. The
//! authentication and provider errors are cloneable on purpose: a coalesced
//! provider call has one leader and many followers, and every follower of a
//! failed round receives the leader's error.

use thiserror::Error;

/// Authentication failures surfaced to the request handler.
///
/// Every variant means "this request is unauthorized"; callers typically map
/// the whole type to a 401 response. Authorization denial is *not* an error:
/// it is expressed by `is_authorized` returning `false`.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The request carried no `Authorization` header.
    #[error("missing authorization header")]
    MissingAuthorization,

    /// The `Authorization` header named a scheme this authenticator does not
    /// recognize.
    #[error("unsupported authorization scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// The `Authorization` header was recognized but its credential could not
    /// be extracted (bad base64, missing token, ...).
    #[error("malformed authorization credential: {message}")]
    MalformedCredential { message: String },

    /// The identity provider rejected the credential or the permission query.
    #[error("identity provider rejected the request: {0}")]
    Provider(#[from] ProviderError),
}

/// Failures while talking to the identity provider.
///
/// Raised by [`IdentityProvider`](crate::auth::IdentityProvider)
/// implementations and translated to [`AuthError`] at the authenticator
/// boundary. Never cached: a later call retries the provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a provider response (network, TLS,
    /// timeout).
    #[error("provider transport error: {message}")]
    Transport { message: String },

    /// The provider response could not be interpreted.
    #[error("malformed provider payload: {message}")]
    MalformedPayload { message: String },
}

impl ProviderError {
    /// Check whether this failure is a rejection by the provider itself, as
    /// opposed to a transport or payload problem.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

/// Invalid authenticator configuration.
///
/// Raised at construction time only; a constructed authenticator never fails
/// a request because of configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration payload could not be deserialized. An explicitly
    /// `null` cache section lands here: the section may be omitted or empty,
    /// but not null.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    /// A cache TTL was negative or not a finite number.
    #[error("cache TTL must be a finite non-negative number: {field} = {value}")]
    InvalidTtl { field: &'static str, value: f64 },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
