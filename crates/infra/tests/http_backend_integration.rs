//! Integration tests for the reqwest transport
//!
//! **Coverage:**
//! - Session headers on every attempt
//! - Error body, `Retry-After` and decode failure mapping
//! - Refresh and session acquisition driven by `ApiManager`
//! - Potentially-blocked reporting for refused connections
//!
//! **Infrastructure:**
//! - WireMock HTTP server standing in for the API
//! - `InMemorySessionStore` as session provider and listener

mod support;

use std::sync::Arc;
use std::time::Duration;

use callguard_core::{ApiBackend, ApiManager, ApiManagerFactory, SessionBackend, SessionProvider};
use callguard_domain::{ApiError, BackendConfig, SessionId};
use callguard_infra::{HttpApi, HttpBackend, InMemorySessionStore};
use support::{
    authenticated_session, backend_config, bound_backend, user_body, users_call,
    RecordingConnection, APP_VERSION, SESSION, USER_AGENT,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401)
        .set_body_json(serde_json::json!({ "Code": 401, "Error": "Invalid access token" }))
}

// ============================================================================
// Transport mapping
// ============================================================================

/// Validates header handling for the authenticated request scenario.
///
/// Assertions:
/// - Ensures bearer token, session uid, app version and user agent are sent.
/// - Confirms the JSON reply is decoded into the call's type.
#[tokio::test]
async fn test_invoke_sends_session_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/core/v4/users"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("x-pm-uid", SESSION))
        .and(header("x-pm-appversion", APP_VERSION))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("alice")))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, backend) = bound_backend(&server, "access-1");
    let response = backend.invoke(&users_call()).await.expect("user response");

    assert_eq!(response.code, 1000);
    assert_eq!(response.user.name, "alice");
}

/// Validates error mapping for the throttled response scenario.
///
/// Assertions:
/// - Ensures the server message replaces the status reason.
/// - Confirms the `Retry-After` seconds and application code are kept.
#[tokio::test]
async fn test_throttled_response_keeps_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "5")
                .set_body_json(serde_json::json!({ "Code": 10, "Error": "darn!" })),
        )
        .mount(&server)
        .await;

    let (_store, backend) = bound_backend(&server, "access-1");
    let error = backend.invoke(&users_call()).await.unwrap_err();

    assert_eq!(error.to_string(), "HTTP 429: darn!");
    assert_eq!(error.http_code(), Some(429));
    assert_eq!(error.app_code(), Some(10));
    assert_eq!(error.retry_after(), Some(Duration::from_secs(5)));
    assert!(error.is_retryable());
}

/// Validates detail decoding for the human-verification response scenario.
#[tokio::test]
async fn test_human_verification_details_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "Code": 9001,
            "Error": "Human verification required",
            "Details": {
                "HumanVerificationMethods": ["captcha", "email"],
                "HumanVerificationToken": "hv-token"
            }
        })))
        .mount(&server)
        .await;

    let (_store, backend) = bound_backend(&server, "access-1");
    let error = backend.invoke(&users_call()).await.unwrap_err();

    let details = error.human_verification().expect("verification details");
    assert_eq!(details.methods, vec!["captcha".to_string(), "email".to_string()]);
    assert_eq!(details.token.as_deref(), Some("hv-token"));
}

/// Validates the status reason fallback for the non-JSON error body scenario.
#[tokio::test]
async fn test_plain_error_body_uses_status_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let (_store, backend) = bound_backend(&server, "access-1");
    let error = backend.invoke(&users_call()).await.unwrap_err();

    assert_eq!(error, ApiError::http(503, "Service Unavailable"));
}

/// Validates decode failures for the malformed success body scenario.
#[tokio::test]
async fn test_malformed_success_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
        .mount(&server)
        .await;

    let (_store, backend) = bound_backend(&server, "access-1");
    let error = backend.invoke(&users_call()).await.unwrap_err();

    assert!(matches!(error, ApiError::Parse { .. }));
    assert!(!error.is_retryable());
}

// ============================================================================
// Session endpoints
// ============================================================================

/// Validates the refresh request for the token exchange scenario.
#[tokio::test]
async fn test_refresh_session_posts_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/v4/refresh"))
        .and(header("x-pm-uid", SESSION))
        .and(body_partial_json(serde_json::json!({
            "UID": SESSION,
            "RefreshToken": "refresh-1",
            "GrantType": "refresh_token"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "AccessToken": "access-2",
            "RefreshToken": "refresh-2",
            "Scopes": ["full", "mail"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_store, backend) = bound_backend(&server, "access-1");
    let refreshed =
        backend.refresh_session(&authenticated_session("access-1")).await.expect("refresh");

    assert_eq!(refreshed.session_id, SessionId::new(SESSION));
    assert_eq!(refreshed.access_token, "access-2");
    assert_eq!(refreshed.refresh_token, "refresh-2");
    assert_eq!(refreshed.scopes, vec!["full".to_string(), "mail".to_string()]);
    assert!(refreshed.is_authenticated());
}

// ============================================================================
// Through the manager
// ============================================================================

/// Validates end-to-end refresh for the expired access token scenario.
///
/// # Test Steps
/// 1. Store a session whose access token the server rejects
/// 2. Invoke through `ApiManager`
///
/// Assertions:
/// - Ensures the refresh endpoint is hit once and the call succeeds.
/// - Confirms the store now holds the refreshed token.
#[tokio::test]
async fn test_manager_refreshes_expired_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/core/v4/users"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("alice")))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/core/v4/users"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/v4/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "AccessToken": "access-2",
            "RefreshToken": "refresh-2",
            "Scopes": ["full"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, backend) = bound_backend(&server, "access-1");
    let factory = ApiManagerFactory::new(store.clone(), store.clone());
    let manager: ApiManager<HttpApi, HttpBackend> =
        factory.create(backend, Some(SessionId::new(SESSION)));

    let response = manager.invoke(&users_call()).await.expect("user after refresh");

    assert_eq!(response.user.name, "alice");
    let stored = store.get_session(&SessionId::new(SESSION)).await.expect("stored session");
    assert_eq!(stored.access_token, "access-2");
}

/// Validates session acquisition for the anonymous call scenario.
///
/// Assertions:
/// - Ensures an unauthenticated session is requested and stored.
/// - Confirms the retried call carries the new token.
#[tokio::test]
async fn test_unbound_manager_requests_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/core/v4/users"))
        .and(header("authorization", "Bearer anon-access"))
        .and(header("x-pm-uid", "anon-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("guest")))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET")).respond_with(unauthorized()).mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/v4/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "UID": "anon-1",
            "AccessToken": "anon-access",
            "RefreshToken": "anon-refresh",
            "Scopes": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = InMemorySessionStore::new();
    let backend = Arc::new(HttpBackend::new(&backend_config(&server), store.clone(), None).unwrap());
    let factory = ApiManagerFactory::new(store.clone(), store.clone());
    let manager: ApiManager<HttpApi, HttpBackend> = factory.create(backend, None);

    let response = manager.invoke(&users_call()).await.expect("anonymous user");

    assert_eq!(response.user.name, "guest");
    assert_eq!(store.get_session_id(None).await, Some(SessionId::new("anon-1")));
}

/// Validates blocking detection for the refused connection scenario.
///
/// Assertions:
/// - Ensures the connection listener receives the request path and query.
/// - Confirms the caller still gets the connection error.
#[tokio::test]
async fn test_refused_connection_reports_potential_block() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = BackendConfig {
        base_url: format!("http://127.0.0.1:{port}/api/"),
        timeout_secs: 2,
        ..BackendConfig::default()
    };
    let store = InMemorySessionStore::new();
    store.insert(authenticated_session("access-1"));
    let backend = Arc::new(
        HttpBackend::new(&config, store.clone(), Some(SessionId::new(SESSION))).unwrap(),
    );
    let connection = Arc::new(RecordingConnection::default());
    let factory = ApiManagerFactory::new(store.clone(), store.clone())
        .with_connection_listener(connection.clone());
    let manager: ApiManager<HttpApi, HttpBackend> =
        factory.create(backend, Some(SessionId::new(SESSION)));

    let call = callguard_core::ApiCall::new("search", |api: Arc<HttpApi>| async move {
        api.get::<serde_json::Value>("core/v4/users?Page=1").await
    });
    let error = manager.invoke(&call).await.unwrap_err();

    assert!(matches!(error, ApiError::Connection { potentially_blocked: true, .. }));
    assert_eq!(
        *connection.blocked.lock().unwrap(),
        vec![(Some("/api/core/v4/users".to_string()), Some("Page=1".to_string()))]
    );
}
