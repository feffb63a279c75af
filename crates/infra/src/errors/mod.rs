//! Infrastructure error types
//!
//! Failures raised while constructing adapters. Failures of a call itself
//! are reported as [`callguard_domain::ApiError`]; see [`conversions`] for
//! how transport errors are mapped onto it.

pub mod conversions;

use callguard_common::error::{CommonError, ErrorSeverity};
use callguard_common::impl_error_classification;
use callguard_domain::CallguardError;
use thiserror::Error;

pub use conversions::transport_error;

/// Errors raised by infrastructure adapters
#[derive(Debug, Error)]
pub enum InfraError {
    /// The configured base URL cannot be parsed
    #[error("Invalid base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(InfraError, Common,
    Self::InvalidBaseUrl { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::ClientBuild(_) => {
        retryable: false,
        severity: ErrorSeverity::Critical,
        critical: true,
    }
);

/// Convenience type alias for infrastructure operations
pub type InfraResult<T> = Result<T, InfraError>;

impl From<CallguardError> for InfraError {
    fn from(err: CallguardError) -> Self {
        match err {
            CallguardError::Config(message) => Self::Common(CommonError::config(message)),
            CallguardError::Decode(message) => {
                Self::Common(CommonError::serialization_format("json", message))
            }
            CallguardError::InvalidInput(message) => {
                Self::Common(CommonError::validation("input", message))
            }
            CallguardError::Internal(message) => Self::Common(CommonError::internal(message)),
        }
    }
}

impl From<InfraError> for CallguardError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::InvalidBaseUrl { .. } => Self::Config(err.to_string()),
            InfraError::Common(CommonError::Config { .. }) => Self::Config(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}
