//! Human-verification handlers
//!
//! `HumanVerificationNeededHandler` prompts the user once per client id and
//! re-issues the call after a successful challenge. Calls failing while a
//! prompt is open wait for it; a failure after it closed opens a new one.
//! `HumanVerificationInvalidHandler` only reports a rejected verification
//! token.

use std::sync::Arc;

use async_trait::async_trait;
use callguard_domain::{ApiError, ChallengeResult, ClientId};
use tracing::{debug, info};

use super::{ApiErrorHandler, HandlerOutcome, Reinvoke};
use crate::call::CallContext;
use crate::ports::{ClientIdProvider, HumanVerificationListener};
use crate::single_flight::SingleFlight;

/// Shared registry of open human-verification prompts.
pub type HumanVerificationRegistry = SingleFlight<ClientId, ChallengeResult>;

pub struct HumanVerificationNeededHandler {
    client_ids: Arc<dyn ClientIdProvider>,
    listener: Arc<dyn HumanVerificationListener>,
    registry: Arc<HumanVerificationRegistry>,
}

impl HumanVerificationNeededHandler {
    pub fn new(
        client_ids: Arc<dyn ClientIdProvider>,
        listener: Arc<dyn HumanVerificationListener>,
        registry: Arc<HumanVerificationRegistry>,
    ) -> Self {
        Self { client_ids, listener, registry }
    }
}

#[async_trait]
impl ApiErrorHandler for HumanVerificationNeededHandler {
    fn name(&self) -> &'static str {
        "human_verification_needed"
    }

    async fn handle(
        &self,
        error: &ApiError,
        ctx: &CallContext,
        retry: &dyn Reinvoke,
    ) -> HandlerOutcome {
        let Some(details) = error.human_verification() else {
            return HandlerOutcome::PassThrough;
        };
        let Some(client_id) = self.client_ids.get_client_id(ctx.session_id.as_ref()).await else {
            debug!(call = %ctx.name, "no client id for human verification");
            return HandlerOutcome::PassThrough;
        };

        let listener = Arc::clone(&self.listener);
        let prompt_client = client_id.clone();
        let details = details.clone();
        let prompt = self.registry.run(client_id.clone(), None, move || async move {
            info!(client = %prompt_client, methods = ?details.methods, "human verification needed");
            listener.on_human_verification_needed(&prompt_client, &details).await
        });

        let result = tokio::select! {
            () = ctx.cancellation.cancelled() => return HandlerOutcome::PassThrough,
            result = prompt => result,
        };
        if !result.is_success() {
            debug!(client = %client_id, "human verification declined");
            return HandlerOutcome::PassThrough;
        }

        match retry.reinvoke().await {
            Err(retried) if retried.is_human_verification_failure() => {
                self.listener.on_human_verification_failed(&client_id).await;
            }
            _ => self.listener.on_human_verification_passed(&client_id).await,
        }
        HandlerOutcome::Reinvoked
    }
}

pub struct HumanVerificationInvalidHandler {
    client_ids: Arc<dyn ClientIdProvider>,
    listener: Arc<dyn HumanVerificationListener>,
}

impl HumanVerificationInvalidHandler {
    pub fn new(
        client_ids: Arc<dyn ClientIdProvider>,
        listener: Arc<dyn HumanVerificationListener>,
    ) -> Self {
        Self { client_ids, listener }
    }
}

#[async_trait]
impl ApiErrorHandler for HumanVerificationInvalidHandler {
    fn name(&self) -> &'static str {
        "human_verification_invalid"
    }

    async fn handle(
        &self,
        error: &ApiError,
        ctx: &CallContext,
        _retry: &dyn Reinvoke,
    ) -> HandlerOutcome {
        if error.is_human_verification_invalid() {
            if let Some(client_id) = self.client_ids.get_client_id(ctx.session_id.as_ref()).await {
                self.listener.on_human_verification_invalid(&client_id).await;
            }
        }
        HandlerOutcome::PassThrough
    }
}
