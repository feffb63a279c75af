//! Call outcome model
//!
//! Every API call resolves to an [`ApiResult`]. Failures form a closed set:
//! four connection-class variants raised before a response exists, a parse
//! failure, and HTTP errors carrying the server's structured detail.
//!
//! Classification follows three rules:
//! - connection-class failures (`Connection`, `NoInternet`, `Timeout`) are
//!   transient;
//! - `Certificate` and `Parse` are terminal;
//! - `Http` is transient only for 408, 429 and the 5xx gateway family.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{http, response_codes};
use crate::types::detail::{DeviceChallenge, ErrorDetail, HumanVerificationDetails, MissingScopes};

/// Result of a single API call attempt.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure outcome of an API call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiError {
    /// No response: DNS, TCP or TLS handshake failure.
    #[error("connection failed: {cause}")]
    Connection {
        /// The failure pattern suggests the API host is being blocked.
        potentially_blocked: bool,
        path: Option<String>,
        query: Option<String>,
        cause: String,
    },

    /// The device has no network connectivity.
    #[error("no internet connection")]
    NoInternet,

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout {
        /// A connection was established before the deadline hit.
        was_connected: bool,
    },

    /// Server certificate verification failed.
    #[error("certificate rejected: {cause}")]
    Certificate { cause: String },

    /// The response could not be decoded.
    #[error("malformed response: {cause}")]
    Parse { cause: String },

    /// The server answered with a non-success status.
    #[error("HTTP {code}: {message}")]
    Http {
        code: u16,
        /// Server-supplied message when present, otherwise the status reason.
        message: String,
        detail: Option<ErrorDetail>,
        /// `Retry-After` hint sent with the response.
        retry_after: Option<Duration>,
    },
}

impl ApiError {
    /// HTTP error without structured detail.
    pub fn http(code: u16, message: impl Into<String>) -> Self {
        Self::Http { code, message: message.into(), detail: None, retry_after: None }
    }

    /// HTTP error carrying decoded detail; the detail message becomes the
    /// error message.
    pub fn http_with_detail(code: u16, detail: ErrorDetail) -> Self {
        Self::Http { code, message: detail.error.clone(), detail: Some(detail), retry_after: None }
    }

    pub fn connection(cause: impl Into<String>) -> Self {
        Self::Connection { potentially_blocked: false, path: None, query: None, cause: cause.into() }
    }

    /// Connection failure that may indicate the API host is blocked.
    pub fn potentially_blocked(
        path: Option<String>,
        query: Option<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self::Connection { potentially_blocked: true, path, query, cause: cause.into() }
    }

    pub fn parse(cause: impl Into<String>) -> Self {
        Self::Parse { cause: cause.into() }
    }

    /// Attach a `Retry-After` hint. No-op for non-HTTP errors.
    #[must_use]
    pub fn with_retry_after(mut self, hint: Option<Duration>) -> Self {
        if let Self::Http { retry_after, .. } = &mut self {
            *retry_after = hint;
        }
        self
    }

    /// HTTP status, if this is an HTTP error.
    pub fn http_code(&self) -> Option<u16> {
        match self {
            Self::Http { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            Self::Http { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// Application code from the error body, if any.
    pub fn app_code(&self) -> Option<i32> {
        self.detail().map(|detail| detail.code)
    }

    /// Server `Retry-After` hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Failure happened before any response was received.
    pub fn is_connection_class(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::NoInternet | Self::Timeout { .. })
    }

    /// Whether the generic retry policy may retry this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::NoInternet | Self::Timeout { .. } => true,
            Self::Certificate { .. } | Self::Parse { .. } => false,
            Self::Http { code, .. } => http::RETRYABLE.contains(code),
        }
    }

    /// Whether another attempt should be made now.
    ///
    /// `attempt` counts the retries already performed. A `Retry-After` hint
    /// longer than `max_retry_after` vetoes the retry even on the first
    /// attempt.
    pub fn needs_retry(&self, attempt: u32, max_attempts: u32, max_retry_after: Duration) -> bool {
        if attempt >= max_attempts || !self.is_retryable() {
            return false;
        }
        match self.retry_after() {
            Some(hint) => hint <= max_retry_after,
            None => true,
        }
    }

    /// `Http(401)`.
    pub fn is_unauthorized(&self) -> bool {
        self.http_code() == Some(http::UNAUTHORIZED)
    }

    /// Human-verification challenge carried by this error, if any.
    pub fn human_verification(&self) -> Option<&HumanVerificationDetails> {
        self.detail()
            .filter(|detail| detail.code == response_codes::HUMAN_VERIFICATION_REQUIRED)
            .and_then(ErrorDetail::human_verification)
    }

    /// Device-verification challenge carried by this error, if any.
    pub fn device_challenge(&self) -> Option<&DeviceChallenge> {
        self.detail()
            .filter(|detail| detail.code == response_codes::DEVICE_VERIFICATION_REQUIRED)
            .and_then(ErrorDetail::device_challenge)
    }

    /// Non-empty scope list on a 403.
    pub fn missing_scopes(&self) -> Option<&MissingScopes> {
        if self.http_code() != Some(http::FORBIDDEN) {
            return None;
        }
        self.detail().and_then(ErrorDetail::missing_scopes).filter(|scopes| !scopes.is_empty())
    }

    /// The verification token sent with the request was rejected.
    pub fn is_human_verification_invalid(&self) -> bool {
        self.app_code() == Some(response_codes::HUMAN_VERIFICATION_INVALID_CODE)
    }

    /// A retried call still reports that human verification is required or
    /// that the submitted token is invalid.
    pub fn is_human_verification_failure(&self) -> bool {
        matches!(
            self.app_code(),
            Some(response_codes::HUMAN_VERIFICATION_REQUIRED)
                | Some(response_codes::HUMAN_VERIFICATION_INVALID_CODE)
        )
    }

    /// The server rejected this client build.
    pub fn is_force_update(&self) -> bool {
        self.detail().is_some_and(ErrorDetail::is_force_update)
    }
}

/// Retry allowance for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    /// Retries already performed.
    pub attempt: u32,
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    /// Longest `Retry-After` the caller is willing to wait for.
    pub max_retry_after: Duration,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, max_retry_after: Duration) -> Self {
        Self { attempt: 0, max_attempts, max_retry_after }
    }

    /// Whether `error` may be retried at the current attempt.
    pub fn allows(&self, error: &ApiError) -> bool {
        error.needs_retry(self.attempt, self.max_attempts, self.max_retry_after)
    }

    /// Budget after one more retry.
    #[must_use]
    pub fn consumed(self) -> Self {
        Self { attempt: self.attempt.saturating_add(1), ..self }
    }
}
