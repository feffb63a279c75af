//! Structured detail attached to HTTP errors
//!
//! The server puts an application code and a human-readable message in every
//! error body. A handful of codes carry a typed payload that one of the
//! pipeline handlers knows how to resolve.

use serde::{Deserialize, Serialize};

use crate::constants::response_codes;
use crate::impl_domain_status_conversions;

/// Application-level error information decoded from an error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Server application code (`Code`).
    pub code: i32,
    /// Human-readable message (`Error`).
    pub error: String,
    pub payload: DetailPayload,
}

impl ErrorDetail {
    /// Detail carrying only a code and message.
    pub fn message(code: i32, error: impl Into<String>) -> Self {
        Self { code, error: error.into(), payload: DetailPayload::Message }
    }

    pub fn with_payload(mut self, payload: DetailPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn human_verification(&self) -> Option<&HumanVerificationDetails> {
        match &self.payload {
            DetailPayload::HumanVerification(details) => Some(details),
            _ => None,
        }
    }

    pub fn device_challenge(&self) -> Option<&DeviceChallenge> {
        match &self.payload {
            DetailPayload::DeviceVerification(challenge) => Some(challenge),
            _ => None,
        }
    }

    pub fn missing_scopes(&self) -> Option<&MissingScopes> {
        match &self.payload {
            DetailPayload::MissingScopes(scopes) => Some(scopes),
            _ => None,
        }
    }

    pub fn is_force_update(&self) -> bool {
        response_codes::FORCE_UPDATE.contains(&self.code)
    }
}

/// Discriminated payload of an [`ErrorDetail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailPayload {
    /// No structured payload, only the message.
    Message,
    HumanVerification(HumanVerificationDetails),
    DeviceVerification(DeviceChallenge),
    MissingScopes(MissingScopes),
}

/// Methods the user may use to pass a human-verification challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanVerificationDetails {
    /// Server method names (`captcha`, `email`, `sms`, ...), in server order.
    pub methods: Vec<String>,
    /// Challenge token to echo back once verified.
    pub token: Option<String>,
}

/// Proof-of-work style challenge the device must solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceChallenge {
    /// Server challenge family identifier.
    pub challenge_type: u32,
    /// Opaque payload handed to the solver.
    pub payload: String,
}

/// Permission scopes the caller lacks for the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingScopes {
    pub scopes: Vec<Scope>,
}

impl MissingScopes {
    pub fn new(scopes: Vec<Scope>) -> Self {
        Self { scopes }
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.scopes.contains(&scope)
    }
}

/// Scopes the pipeline knows how to obtain through a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Account is locked until the user unlocks it.
    Locked,
    /// Recent password confirmation required.
    Password,
}

impl_domain_status_conversions!(Scope {
    Locked => "locked",
    Password => "password",
});

/// Result reported by an external challenge listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeResult {
    /// The condition was resolved; the call may be re-issued.
    Success,
    /// The user declined or the resolution failed.
    Cancel,
}

impl ChallengeResult {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}
