//! Error-body wire format
//!
//! Error responses carry a JSON body of the form
//! `{"Code": 9001, "Error": "...", "Details": {...}}`. `Details` is free-form;
//! only the fields consumed by the pipeline handlers are decoded.

use std::time::Duration;

use serde::Deserialize;

use crate::constants::response_codes;
use crate::errors::Result;
use crate::types::detail::{
    DetailPayload, DeviceChallenge, ErrorDetail, HumanVerificationDetails, MissingScopes, Scope,
};
use crate::types::outcome::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: i32,
    #[serde(default)]
    error: String,
    #[serde(default)]
    details: Option<RawDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDetails {
    #[serde(default)]
    human_verification_methods: Option<Vec<String>>,
    #[serde(default)]
    human_verification_token: Option<String>,
    #[serde(default)]
    challenge_type: Option<u32>,
    #[serde(default)]
    challenge_payload: Option<String>,
    #[serde(default)]
    missing_scopes: Option<Vec<String>>,
}

impl RawDetails {
    fn into_payload(self, code: i32) -> DetailPayload {
        if code == response_codes::HUMAN_VERIFICATION_REQUIRED {
            if let Some(methods) = self.human_verification_methods {
                return DetailPayload::HumanVerification(HumanVerificationDetails {
                    methods,
                    token: self.human_verification_token,
                });
            }
        }

        if code == response_codes::DEVICE_VERIFICATION_REQUIRED {
            if let Some(challenge_type) = self.challenge_type {
                return DetailPayload::DeviceVerification(DeviceChallenge {
                    challenge_type,
                    payload: self.challenge_payload.unwrap_or_default(),
                });
            }
        }

        // Unknown scope names are dropped; an all-unknown list means no payload.
        let scopes: Vec<Scope> = self
            .missing_scopes
            .unwrap_or_default()
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect();
        if !scopes.is_empty() {
            return DetailPayload::MissingScopes(MissingScopes::new(scopes));
        }

        DetailPayload::Message
    }
}

/// Decode a JSON error body into an [`ErrorDetail`].
///
/// # Errors
///
/// Returns [`CallguardError::Decode`](crate::CallguardError::Decode) when the
/// body is not JSON or lacks the `Code` field.
pub fn decode_error_body(body: &str) -> Result<ErrorDetail> {
    let raw: ErrorBody = serde_json::from_str(body)?;
    let payload = raw.details.unwrap_or_default().into_payload(raw.code);
    Ok(ErrorDetail { code: raw.code, error: raw.error, payload })
}

/// Parse a `Retry-After` header given in whole seconds.
///
/// HTTP-date values are not used by the API and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

impl ApiError {
    /// Build an HTTP error from a raw non-success response.
    ///
    /// A body that fails to decode falls back to the status reason as the
    /// message with no detail attached.
    pub fn from_http_response(
        status: u16,
        reason: &str,
        body: &str,
        retry_after: Option<&str>,
    ) -> Self {
        let hint = retry_after.and_then(parse_retry_after);
        match decode_error_body(body) {
            Ok(detail) if !detail.error.is_empty() => {
                ApiError::http_with_detail(status, detail).with_retry_after(hint)
            }
            Ok(detail) => ApiError::Http {
                code: status,
                message: reason.to_string(),
                detail: Some(detail),
                retry_after: hint,
            },
            Err(_) => ApiError::http(status, reason).with_retry_after(hint),
        }
    }
}
