//! Integration tests for the call outcome model
//!
//! Covers decoding of real server error bodies into `ApiError` and the
//! classification the pipeline handlers and the caller-layer retry rely on.

use std::time::Duration;

use callguard_domain::constants::response_codes;
use callguard_domain::{ApiError, PipelineConfig, Scope};

// ============================================================================
// Helpers
// ============================================================================

fn response(status: u16, body: &str) -> ApiError {
    ApiError::from_http_response(status, "Status Reason", body, None)
}

// ============================================================================
// Handler triggers
// ============================================================================

/// Test that a 422 human-verification body exposes the challenge
///
/// Scenario: anonymous signup hits the abuse filter and must solve a captcha
#[test]
fn test_human_verification_body_is_recognised() {
    let error = response(
        422,
        r#"{"Code":9001,"Error":"Human verification required","Details":{"HumanVerificationMethods":["captcha"],"HumanVerificationToken":"t-1"}}"#,
    );

    let details = error.human_verification().expect("challenge should be decoded");
    assert_eq!(details.methods, vec!["captcha".to_string()]);
    assert!(error.is_human_verification_failure());
    assert!(!error.is_retryable(), "422 is resolved by the handler, not the retry policy");
}

/// Test that a 9001 body without methods is not treated as a challenge
#[test]
fn test_human_verification_without_methods_is_plain_error() {
    let error = response(422, r#"{"Code":9001,"Error":"Human verification required"}"#);

    assert!(error.human_verification().is_none());
    assert_eq!(error.app_code(), Some(response_codes::HUMAN_VERIFICATION_REQUIRED));
}

/// Test that a missing-scope 403 exposes only known scopes
#[test]
fn test_missing_scope_body() {
    let error = response(
        403,
        r#"{"Code":9101,"Error":"Password required","Details":{"MissingScopes":["password","locked","self"]}}"#,
    );

    let scopes = error.missing_scopes().expect("scopes should be decoded");
    assert!(scopes.contains(Scope::Password));
    assert!(scopes.contains(Scope::Locked));
    assert_eq!(scopes.scopes.len(), 2);
}

/// Test that force-update codes are terminal and carry the server message
#[test]
fn test_force_update_is_terminal() {
    let error = response(400, r#"{"Code":5003,"Error":"Please update the app"}"#);

    assert!(error.is_force_update());
    assert!(!error.is_retryable());
    assert_eq!(error.to_string(), "HTTP 400: Please update the app");
}

/// Test that a 9002 body exposes the device challenge
#[test]
fn test_device_challenge_body() {
    let error = response(
        422,
        r#"{"Code":9002,"Error":"Device verification required","Details":{"ChallengeType":2,"ChallengePayload":"payload"}}"#,
    );

    let challenge = error.device_challenge().expect("challenge should be decoded");
    assert_eq!(challenge.challenge_type, 2);
    assert_eq!(challenge.payload, "payload");
}

// ============================================================================
// Retry classification
// ============================================================================

/// Test the configured budget against a throttled response
///
/// Scenario: server asks the client to wait longer than the configured
/// maximum; no retry is attempted even on the first try.
#[test]
fn test_throttle_hint_beyond_configured_maximum() {
    let config = PipelineConfig::default();
    let budget = config.retry.budget();

    let short = ApiError::from_http_response(429, "Too Many Requests", "", Some("3"));
    let long = ApiError::from_http_response(
        503,
        "Service Unavailable",
        "",
        Some(&(config.retry.max_retry_after_secs + 1).to_string()),
    );

    assert_eq!(short.retry_after(), Some(Duration::from_secs(3)));
    assert!(budget.allows(&short));
    assert!(!budget.allows(&long));
}

/// Test that an HTML gateway page still classifies by status
#[test]
fn test_non_json_gateway_page() {
    let error = response(504, "<html>gateway timeout</html>");

    assert!(error.detail().is_none());
    assert!(error.is_retryable());
    assert_eq!(error.to_string(), "HTTP 504: Status Reason");
}
