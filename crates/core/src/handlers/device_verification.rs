//! Device-verification handler

use std::sync::Arc;

use async_trait::async_trait;
use callguard_domain::{ApiError, ChallengeResult, SessionId};
use tracing::{debug, info};

use super::{reinvoke_on_success, ApiErrorHandler, HandlerOutcome, Reinvoke};
use crate::call::CallContext;
use crate::ports::{DeviceVerificationListener, SessionProvider};
use crate::single_flight::SingleFlight;

/// Shared registry of open device challenges, one per session.
pub type DeviceVerificationRegistry = SingleFlight<SessionId, ChallengeResult>;

/// Hands a device challenge to the listener and retries once it is solved.
///
/// Challenges are bound to a session: the manager's own, or the
/// unauthenticated one for unbound calls. Without either the error passes
/// through.
pub struct DeviceVerificationHandler {
    provider: Arc<dyn SessionProvider>,
    listener: Arc<dyn DeviceVerificationListener>,
    registry: Arc<DeviceVerificationRegistry>,
}

impl DeviceVerificationHandler {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        listener: Arc<dyn DeviceVerificationListener>,
        registry: Arc<DeviceVerificationRegistry>,
    ) -> Self {
        Self { provider, listener, registry }
    }

    async fn resolve_session(&self, ctx: &CallContext) -> Option<SessionId> {
        match &ctx.session_id {
            Some(id) => Some(id.clone()),
            None => self.provider.get_session_id(None).await,
        }
    }
}

#[async_trait]
impl ApiErrorHandler for DeviceVerificationHandler {
    fn name(&self) -> &'static str {
        "device_verification"
    }

    async fn handle(
        &self,
        error: &ApiError,
        ctx: &CallContext,
        retry: &dyn Reinvoke,
    ) -> HandlerOutcome {
        let Some(challenge) = error.device_challenge() else {
            return HandlerOutcome::PassThrough;
        };
        let Some(session_id) = self.resolve_session(ctx).await else {
            debug!(call = %ctx.name, "device challenge without a session");
            return HandlerOutcome::PassThrough;
        };

        let listener = Arc::clone(&self.listener);
        let challenge = challenge.clone();
        let solve_for = session_id.clone();
        let solve = self.registry.run(session_id, None, move || async move {
            info!(session = %solve_for, challenge_type = challenge.challenge_type, "device verification needed");
            listener.on_device_verification(&solve_for, &challenge).await
        });

        let result = tokio::select! {
            () = ctx.cancellation.cancelled() => return HandlerOutcome::PassThrough,
            result = solve => result,
        };
        reinvoke_on_success(result, retry).await
    }
}
