//! Error types used outside of an API call
//!
//! Failures of a call itself are modelled by [`crate::ApiError`]; this type
//! covers configuration and decoding problems raised while setting the
//! pipeline up.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Callguard setup and decoding
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CallguardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Callguard setup operations
pub type Result<T> = std::result::Result<T, CallguardError>;

impl From<serde_json::Error> for CallguardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
