//! Missing-scope handler
//!
//! A `403` listing scopes the session lacks is resolved by asking the
//! listener to obtain them (unlock the account, confirm the password).
//! Concurrent requests for the same user share one prompt.

use std::sync::Arc;

use async_trait::async_trait;
use callguard_domain::{ApiError, ChallengeResult, UserId};
use tracing::info;

use super::{reinvoke_on_success, ApiErrorHandler, HandlerOutcome, Reinvoke};
use crate::call::CallContext;
use crate::ports::{MissingScopeListener, SessionProvider};
use crate::single_flight::SingleFlight;

pub type MissingScopeRegistry = SingleFlight<Option<UserId>, ChallengeResult>;

pub struct MissingScopeHandler {
    provider: Arc<dyn SessionProvider>,
    listener: Arc<dyn MissingScopeListener>,
    registry: Arc<MissingScopeRegistry>,
}

impl MissingScopeHandler {
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        listener: Arc<dyn MissingScopeListener>,
        registry: Arc<MissingScopeRegistry>,
    ) -> Self {
        Self { provider, listener, registry }
    }
}

#[async_trait]
impl ApiErrorHandler for MissingScopeHandler {
    fn name(&self) -> &'static str {
        "missing_scope"
    }

    async fn handle(
        &self,
        error: &ApiError,
        ctx: &CallContext,
        retry: &dyn Reinvoke,
    ) -> HandlerOutcome {
        let Some(scopes) = error.missing_scopes() else {
            return HandlerOutcome::PassThrough;
        };
        let user_id = match &ctx.session_id {
            Some(session_id) => self.provider.get_user_id(session_id).await,
            None => None,
        };

        let listener = Arc::clone(&self.listener);
        let scopes = scopes.clone();
        let owner = user_id.clone();
        let prompt = self.registry.run(user_id, None, move || async move {
            info!(user = ?owner, scopes = ?scopes.scopes, "missing scope");
            listener.on_missing_scope(owner.as_ref(), &scopes).await
        });

        let result = tokio::select! {
            () = ctx.cancellation.cancelled() => return HandlerOutcome::PassThrough,
            result = prompt => result,
        };
        reinvoke_on_success(result, retry).await
    }
}
