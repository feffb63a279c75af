//! Shared test helpers for `callguard-core` integration tests.
//!
//! Hand-written mocks for every port: an in-memory session store that
//! records listener calls, a backend whose calls see the current stored
//! token, and listeners with a configurable resolution.

#![allow(dead_code)]

pub mod backend;
pub mod listeners;

use std::collections::VecDeque;
use std::sync::Arc;

use callguard_core::ApiCall;
use callguard_domain::constants::response_codes;
use callguard_domain::{
    ApiError, ApiResult, DetailPayload, DeviceChallenge, ErrorDetail, HumanVerificationDetails,
    MissingScopes, Scope, Session, SessionId, UserId,
};
use parking_lot::Mutex;

pub use backend::{RecordingSessions, TestApi, TestBackend};
pub use listeners::{
    RecordingApiClient, RecordingConnection, RecordingDeviceVerification,
    RecordingHumanVerification, RecordingMissingScope, Resolution,
};

pub const STALE_TOKEN: &str = "stale-token";
pub const FRESH_TOKEN: &str = "fresh-token";
pub const SESSION: &str = "uid-1";
pub const USER: &str = "user-1";

/// Authenticated session whose access token the server no longer accepts.
pub fn stale_session() -> Session {
    Session::unauthenticated(SessionId::new(SESSION), STALE_TOKEN, "refresh-1", vec![])
        .with_user(UserId::new(USER))
}

pub fn session_id() -> SessionId {
    SessionId::new(SESSION)
}

// ============================================================================
// Calls
// ============================================================================

/// Succeeds only with the refreshed token.
pub fn authorized_call() -> ApiCall<TestApi, String> {
    ApiCall::new("authorized", |api: Arc<TestApi>| async move {
        if api.access_token.as_deref() == Some(FRESH_TOKEN) {
            Ok("ok".to_string())
        } else {
            Err(ApiError::http(401, "Invalid access token"))
        }
    })
}

/// Outcomes consumed one per attempt; `Ok("ok")` once exhausted.
pub type Script = Arc<Mutex<VecDeque<ApiResult<String>>>>;

pub fn script(outcomes: Vec<ApiResult<String>>) -> Script {
    Arc::new(Mutex::new(outcomes.into()))
}

pub fn scripted_call(script: Script) -> ApiCall<TestApi, String> {
    ApiCall::new("scripted", move |_api: Arc<TestApi>| {
        let next = script.lock().pop_front();
        async move { next.unwrap_or_else(|| Ok("ok".to_string())) }
    })
}

// ============================================================================
// Server errors
// ============================================================================

pub fn human_verification_error() -> ApiError {
    let detail = ErrorDetail::message(
        response_codes::HUMAN_VERIFICATION_REQUIRED,
        "Human verification required",
    )
    .with_payload(DetailPayload::HumanVerification(HumanVerificationDetails {
        methods: vec!["captcha".into(), "email".into()],
        token: Some("hv-token".into()),
    }));
    ApiError::http_with_detail(422, detail)
}

pub fn human_verification_invalid_error() -> ApiError {
    ApiError::http_with_detail(
        422,
        ErrorDetail::message(
            response_codes::HUMAN_VERIFICATION_INVALID_CODE,
            "Invalid verification token",
        ),
    )
}

pub fn device_verification_error() -> ApiError {
    let detail = ErrorDetail::message(
        response_codes::DEVICE_VERIFICATION_REQUIRED,
        "Device verification required",
    )
    .with_payload(DetailPayload::DeviceVerification(DeviceChallenge {
        challenge_type: 1,
        payload: "challenge".into(),
    }));
    ApiError::http_with_detail(422, detail)
}

pub fn missing_scope_error(scopes: Vec<Scope>) -> ApiError {
    let detail = ErrorDetail::message(response_codes::MISSING_SCOPE, "Missing scope")
        .with_payload(DetailPayload::MissingScopes(MissingScopes::new(scopes)));
    ApiError::http_with_detail(403, detail)
}

pub fn force_update_error() -> ApiError {
    ApiError::http_with_detail(
        400,
        ErrorDetail::message(response_codes::APP_VERSION_BAD, "Please update the app"),
    )
}

pub fn blocked_error() -> ApiError {
    ApiError::potentially_blocked(
        Some("/core/v4/users".into()),
        Some("Page=1".into()),
        "connection reset",
    )
}
