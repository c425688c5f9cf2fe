//! Tests for the GitHub REST API identity provider.

use super::*;
use crate::auth::{Credential, PermissionLevel};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "dummy-github-token";

fn credential() -> Credential {
    Credential::from_header(&format!("Bearer {TOKEN}")).unwrap()
}

async fn client_for(server: &MockServer) -> GithubApiClient {
    let config = Config::default().with_api_url(server.uri());
    GithubApiClient::new(&config).expect("client builds")
}

// ============================================================================
// Profile Endpoint Tests
// ============================================================================

mod fetch_profile_tests {
    use super::*;

    /// Verify the profile request shape and payload pass-through.
    #[tokio::test]
    async fn test_fetch_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("Authorization", format!("Bearer {TOKEN}")))
            .and(header("Accept", "application/vnd.github+json"))
            .and(header("X-GitHub-Api-Version", "2022-11-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "login": "kingofthebritons",
                "id": 12345678,
                "name": "arthur",
                "email": "arthur@camelot.gov.uk",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let profile = client.fetch_profile(&credential()).await.expect("profile");

        assert_eq!(profile["login"], json!("kingofthebritons"));
        assert_eq!(profile["id"], json!(12345678));
    }

    /// Verify a provider rejection maps to a status error.
    #[tokio::test]
    async fn test_fetch_profile_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({ "error": "Forbidden" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.fetch_profile(&credential()).await;

        match result {
            Err(ProviderError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.contains("Forbidden"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    /// Verify an unparseable response maps to a payload error.
    #[tokio::test]
    async fn test_fetch_profile_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client.fetch_profile(&credential()).await;

        assert!(matches!(result, Err(ProviderError::MalformedPayload { .. })));
    }
}

// ============================================================================
// Permission Endpoint Tests
// ============================================================================

mod fetch_permission_tests {
    use super::*;

    async fn mock_permission(server: &MockServer, level: &str) {
        Mock::given(method("GET"))
            .and(path(
                "/repos/my-org/my-repo/collaborators/kingofthebritons/permission",
            ))
            .and(header("Authorization", format!("Bearer {TOKEN}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "permission": level })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    /// Verify the permission request shape and level parsing.
    #[tokio::test]
    async fn test_fetch_permission_admin() {
        let server = MockServer::start().await;
        mock_permission(&server, "admin").await;

        let client = client_for(&server).await;
        let level = client
            .fetch_permission(&credential(), "kingofthebritons", "my-org", "my-repo")
            .await
            .expect("permission");

        assert_eq!(level, PermissionLevel::Admin);
    }

    /// Verify unrecognized permission levels parse leniently.
    #[tokio::test]
    async fn test_fetch_permission_unknown_level() {
        let server = MockServer::start().await;
        mock_permission(&server, "maintain").await;

        let client = client_for(&server).await;
        let level = client
            .fetch_permission(&credential(), "kingofthebritons", "my-org", "my-repo")
            .await
            .expect("permission");

        assert_eq!(level, PermissionLevel::Unknown);
    }

    /// Verify a provider rejection of the permission query maps to a status
    /// error.
    #[tokio::test]
    async fn test_fetch_permission_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/repos/my-org/my-repo/collaborators/kingofthebritons/permission",
            ))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "missing" })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let result = client
            .fetch_permission(&credential(), "kingofthebritons", "my-org", "my-repo")
            .await;

        assert!(matches!(
            result,
            Err(ProviderError::Status { status: 404, .. })
        ));
    }
}

// ============================================================================
// Construction Tests
// ============================================================================

mod construction_tests {
    use super::*;

    /// Verify trailing slashes are trimmed from the API base URL.
    #[test]
    fn test_api_url_normalization() {
        let config = Config::default().with_api_url("https://api.github.com/");
        let client = GithubApiClient::new(&config).expect("client builds");

        assert_eq!(client.api_url(), "https://api.github.com");
    }
}
