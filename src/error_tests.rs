//! Tests for error types.

use super::*;

/// Verify Display output for authentication errors.
#[test]
fn test_auth_error_display() {
    assert_eq!(
        AuthError::MissingAuthorization.to_string(),
        "missing authorization header"
    );
    assert_eq!(
        AuthError::UnsupportedScheme {
            scheme: "Funny".to_string()
        }
        .to_string(),
        "unsupported authorization scheme: Funny"
    );
    assert_eq!(
        AuthError::MalformedCredential {
            message: "bad base64".to_string()
        }
        .to_string(),
        "malformed authorization credential: bad base64"
    );
}

/// Verify provider errors convert into authentication errors.
#[test]
fn test_provider_error_conversion() {
    let provider = ProviderError::Status {
        status: 403,
        message: "Forbidden".to_string(),
    };
    let auth: AuthError = provider.into();
    assert!(matches!(
        auth,
        AuthError::Provider(ProviderError::Status { status: 403, .. })
    ));
    assert!(auth.to_string().contains("403"));
}

/// Verify provider rejection classification.
#[test]
fn test_provider_error_rejection_classification() {
    assert!(ProviderError::Status {
        status: 401,
        message: "nope".to_string()
    }
    .is_rejection());
    assert!(!ProviderError::Transport {
        message: "connection reset".to_string()
    }
    .is_rejection());
    assert!(!ProviderError::MalformedPayload {
        message: "not json".to_string()
    }
    .is_rejection());
}

/// Verify auth and provider errors can be cloned for round fan-out.
#[test]
fn test_errors_are_cloneable() {
    let original = AuthError::Provider(ProviderError::Transport {
        message: "timeout".to_string(),
    });
    let cloned = original.clone();
    assert_eq!(original.to_string(), cloned.to_string());
}

/// Verify config error display mentions the offending TTL field.
#[test]
fn test_config_error_display() {
    let error = ConfigError::InvalidTtl {
        field: "auth_write_ttl",
        value: -1.0,
    };
    assert!(error.to_string().contains("auth_write_ttl"));
    assert!(error.to_string().contains("-1"));
}
