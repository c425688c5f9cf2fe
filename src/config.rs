//! Authenticator configuration.
//!
//! Two layers: [`CacheConfig`] holds the cache tuning knobs (sizes and TTLs),
//! [`Config`] adds the provider endpoint and HTTP client settings. Both
//! deserialize with per-field defaults, so an empty configuration is a valid
//! one. Validation happens once, at authenticator construction.

use chrono::Duration;
use serde::Deserialize;

use crate::error::ConfigError;

/// Cache tuning parameters.
///
/// A size of `0` disables the corresponding cache tier: every lookup misses
/// and nothing is retained. TTLs are in seconds; a TTL of `0` is valid and
/// produces one-shot grants (the first authorization check after a grant
/// succeeds, the next one sees the entry as expired).
///
/// # Examples
///
/// ```
/// use github_token_auth::CacheConfig;
///
/// let cache = CacheConfig::default();
/// assert_eq!(cache.token_max_size, 32);
/// assert!(cache.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of credentials kept in the token cache.
    pub token_max_size: usize,
    /// Maximum number of (organization, repository) grants kept per identity.
    pub auth_max_size: usize,
    /// Seconds a grant containing write permission stays valid.
    pub auth_write_ttl: f64,
    /// Seconds any other grant stays valid.
    pub auth_other_ttl: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            token_max_size: 32,
            auth_max_size: 512,
            auth_write_ttl: 900.0,
            auth_other_ttl: 60.0,
        }
    }
}

impl CacheConfig {
    /// Validate the TTL fields.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTtl` if a TTL is negative, NaN, or
    /// infinite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("auth_write_ttl", self.auth_write_ttl),
            ("auth_other_ttl", self.auth_other_ttl),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTtl { field, value });
            }
        }
        Ok(())
    }

    /// TTL applied to grants that include write permission.
    pub fn write_ttl(&self) -> Duration {
        seconds(self.auth_write_ttl)
    }

    /// TTL applied to all other grants.
    pub fn other_ttl(&self) -> Duration {
        seconds(self.auth_other_ttl)
    }
}

fn seconds(value: f64) -> Duration {
    Duration::milliseconds((value * 1000.0) as i64)
}

/// Authenticator configuration.
///
/// Deserializes leniently: missing fields take their defaults, and the
/// `cache` section may be omitted or empty (`{}`). An explicitly `null`
/// cache section is a configuration error, raised at construction time.
///
/// # Examples
///
/// ```
/// use github_token_auth::Config;
///
/// let config = Config::from_value(serde_json::json!({
///     "cache": { "token_max_size": 2 },
/// })).unwrap();
/// assert_eq!(config.cache.token_max_size, 2);
/// assert_eq!(config.api_url, "https://api.github.com");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the identity provider's REST API.
    pub api_url: String,
    /// Value of the `X-GitHub-Api-Version` header; `null` omits the header.
    pub api_version: Option<String>,
    /// User agent for provider requests.
    pub user_agent: String,
    /// Provider request timeout in seconds.
    pub timeout_secs: u64,
    /// Cache tuning parameters.
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            api_version: Some("2022-11-28".to_string()),
            user_agent: "github-token-auth/0.1.0".to_string(),
            timeout_secs: 30,
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Build a configuration from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the value does not deserialize (including a
    /// `"cache": null` override) or fails validation.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::Invalid {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()
    }

    /// Set the provider API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Set or clear the provider API version header.
    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the cache tuning parameters.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
