//! Error-handler chain
//!
//! Each handler looks at a failed call and either resolves the condition and
//! re-issues the call once, or leaves the error untouched. The manager runs
//! the handlers in a fixed order, threading the latest outcome through.

pub mod connection;
pub mod device_verification;
pub mod force_update;
pub mod human_verification;
pub mod missing_scope;
pub mod token;

use async_trait::async_trait;
use callguard_domain::ApiError;

use crate::call::CallContext;

pub use connection::ConnectionErrorHandler;
pub use device_verification::DeviceVerificationHandler;
pub use force_update::ForceUpdateHandler;
pub use human_verification::{HumanVerificationInvalidHandler, HumanVerificationNeededHandler};
pub use missing_scope::MissingScopeHandler;
pub use token::TokenErrorHandler;

/// What a handler did with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The error was not resolved; the next handler sees it unchanged.
    PassThrough,
    /// The call was re-issued; its outcome replaces the error.
    Reinvoked,
}

/// Re-issues the call a handler is working on.
#[async_trait]
pub trait Reinvoke: Send + Sync {
    /// Run the call once more. A second request returns the first outcome
    /// without touching the backend.
    async fn reinvoke(&self) -> Result<(), ApiError>;
}

/// A single recovery step of the chain
#[async_trait]
pub trait ApiErrorHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        error: &ApiError,
        ctx: &CallContext,
        retry: &dyn Reinvoke,
    ) -> HandlerOutcome;
}

/// Re-issue the call if the listener resolved the condition.
pub(crate) async fn reinvoke_on_success(
    result: callguard_domain::ChallengeResult,
    retry: &dyn Reinvoke,
) -> HandlerOutcome {
    if result.is_success() {
        // The outcome is picked up by the manager.
        let _ = retry.reinvoke().await;
        HandlerOutcome::Reinvoked
    } else {
        HandlerOutcome::PassThrough
    }
}
