//! HTTP identity provider backed by the GitHub REST API.
//!
//! Implements [`IdentityProvider`] with two endpoints: `GET /user` exchanges
//! a token for the user profile, and
//! `GET /repos/{org}/{repo}/collaborators/{login}/permission` reports the
//! permission level the user holds on a repository. Transport and decoding
//! problems map to [`ProviderError`]; nothing here retries. Retry policy
//! belongs to the caller's deployment, not this layer.

use serde::Deserialize;

use crate::auth::{Credential, IdentityProvider, PermissionLevel, ProfileMap};
use crate::config::Config;
use crate::error::ProviderError;

/// Response payload of the collaborator-permission endpoint.
#[derive(Debug, Deserialize)]
struct RepoPermission {
    permission: PermissionLevel,
}

/// GitHub REST API client for authentication operations.
///
/// # Examples
///
/// ```no_run
/// use github_token_auth::{Config, GithubApiClient};
///
/// let client = GithubApiClient::new(&Config::default()).unwrap();
/// assert_eq!(client.api_url(), "https://api.github.com");
/// ```
#[derive(Debug, Clone)]
pub struct GithubApiClient {
    http_client: reqwest::Client,
    api_url: String,
    api_version: Option<String>,
}

impl GithubApiClient {
    /// Create a client from the authenticator configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Transport` if the HTTP client cannot be
    /// created.
    pub fn new(config: &Config) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ProviderError::Transport {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    /// The API base URL this client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn get(&self, url: String, credential: &Credential) -> reqwest::RequestBuilder {
        let mut request = self
            .http_client
            .get(url)
            .header("Authorization", format!("Bearer {}", credential.as_str()))
            .header("Accept", "application/vnd.github+json");
        if let Some(version) = &self.api_version {
            request = request.header("X-GitHub-Api-Version", version);
        }
        request
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = request.send().await.map_err(|e| ProviderError::Transport {
            message: format!("HTTP request failed: {}", e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json::<T>().await.map_err(|e| {
            ProviderError::MalformedPayload {
                message: format!("failed to parse provider response: {}", e),
            }
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for GithubApiClient {
    async fn fetch_profile(&self, credential: &Credential) -> Result<ProfileMap, ProviderError> {
        let url = format!("{}/user", self.api_url);
        self.send_json(self.get(url, credential)).await
    }

    async fn fetch_permission(
        &self,
        credential: &Credential,
        login: &str,
        organization: &str,
        repository: &str,
    ) -> Result<PermissionLevel, ProviderError> {
        let url = format!(
            "{}/repos/{}/{}/collaborators/{}/permission",
            self.api_url, organization, repository, login
        );
        let response: RepoPermission = self.send_json(self.get(url, credential)).await?;
        Ok(response.permission)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
