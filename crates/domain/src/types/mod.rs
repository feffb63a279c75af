//! Domain types and models

pub mod detail;
pub mod outcome;
pub mod session;
pub mod wire;

pub use detail::{
    ChallengeResult, DetailPayload, DeviceChallenge, ErrorDetail, HumanVerificationDetails,
    MissingScopes, Scope,
};
pub use outcome::{ApiError, ApiResult, RetryBudget};
pub use session::{ClientId, Session, SessionId, TokenRecovery, UserId};
pub use wire::{decode_error_body, parse_retry_after};
