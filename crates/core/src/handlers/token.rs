//! Token handler
//!
//! Recovers from `401 Unauthorized` by refreshing the bound session, or by
//! requesting a new unauthenticated session when none exists. Refreshes are
//! single-flight per session, so a burst of concurrent 401s costs one round
//! trip to the session endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use callguard_domain::constants::http;
use callguard_domain::{ApiError, ApiResult, Session, SessionId, TokenRecovery};
use tracing::{debug, info, warn};

use super::{ApiErrorHandler, HandlerOutcome, Reinvoke};
use crate::call::CallContext;
use crate::ports::{SessionBackend, SessionListener, SessionProvider};
use crate::single_flight::SingleFlight;

/// Registry key: a session to refresh, or `None` for acquiring the
/// unauthenticated session.
pub type TokenKey = Option<SessionId>;

/// Shared registry of in-flight refresh/acquire operations.
pub type TokenRegistry = SingleFlight<TokenKey, ApiResult<Session>>;

pub struct TokenErrorHandler {
    backend: Arc<dyn SessionBackend>,
    provider: Arc<dyn SessionProvider>,
    listener: Arc<dyn SessionListener>,
    registry: Arc<TokenRegistry>,
    recovery: TokenRecovery,
}

impl TokenErrorHandler {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        provider: Arc<dyn SessionProvider>,
        listener: Arc<dyn SessionListener>,
        registry: Arc<TokenRegistry>,
        recovery: TokenRecovery,
    ) -> Self {
        Self { backend, provider, listener, registry, recovery }
    }

    async fn refresh(&self, session: Session, ctx: &CallContext) -> ApiResult<Session> {
        let backend = Arc::clone(&self.backend);
        let listener = Arc::clone(&self.listener);
        let key = Some(session.session_id.clone());

        self.registry
            .run(key, Some(ctx.issued_at), move || async move {
                match backend.refresh_session(&session).await {
                    Ok(refreshed) => {
                        info!(session = %refreshed.session_id, "session token refreshed");
                        listener.on_session_token_refreshed(&refreshed).await;
                        Ok(refreshed)
                    }
                    Err(error) => {
                        if let Some(code) = terminal_refresh_failure(&error) {
                            warn!(session = %session.session_id, code, "refresh rejected, forcing logout");
                            listener.on_session_force_logout(&session, code).await;
                        } else {
                            debug!(session = %session.session_id, %error, "refresh failed transiently");
                        }
                        Err(error)
                    }
                }
            })
            .await
    }

    async fn acquire(&self, ctx: &CallContext) -> ApiResult<Session> {
        let backend = Arc::clone(&self.backend);
        let listener = Arc::clone(&self.listener);

        self.registry
            .run(None, Some(ctx.issued_at), move || async move {
                match backend.request_session().await {
                    Ok(session) => {
                        info!(session = %session.session_id, "unauthenticated session created");
                        listener.on_session_token_created(&session).await;
                        Ok(session)
                    }
                    Err(error) => {
                        warn!(%error, "requesting a session failed");
                        Err(error)
                    }
                }
            })
            .await
    }

    async fn recover(&self, ctx: &CallContext) -> Option<ApiResult<Session>> {
        let session_id = match &ctx.session_id {
            Some(id) => Some(id.clone()),
            None => self.provider.get_session_id(None).await,
        };

        match session_id {
            Some(id) => match self.provider.get_session(&id).await {
                Some(session) => Some(self.refresh(session, ctx).await),
                None => {
                    debug!(session = %id, "bound session no longer stored");
                    None
                }
            },
            None if self.recovery == TokenRecovery::RefreshOrRequest => {
                Some(self.acquire(ctx).await)
            }
            None => None,
        }
    }
}

/// HTTP code to report with a force logout, when the refresh failure means
/// the session can never be refreshed.
fn terminal_refresh_failure(error: &ApiError) -> Option<u16> {
    error
        .http_code()
        .filter(|code| (400..500).contains(code))
        .filter(|code| *code != http::REQUEST_TIMEOUT && *code != http::TOO_MANY_REQUESTS)
}

#[async_trait]
impl ApiErrorHandler for TokenErrorHandler {
    fn name(&self) -> &'static str {
        "token"
    }

    async fn handle(
        &self,
        error: &ApiError,
        ctx: &CallContext,
        retry: &dyn Reinvoke,
    ) -> HandlerOutcome {
        if !error.is_unauthorized() {
            return HandlerOutcome::PassThrough;
        }

        let recovered = tokio::select! {
            () = ctx.cancellation.cancelled() => {
                debug!(call = %ctx.name, "token recovery cancelled");
                return HandlerOutcome::PassThrough;
            }
            recovered = self.recover(ctx) => recovered,
        };

        match recovered {
            Some(Ok(_)) => {
                // The outcome is picked up by the manager.
                let _ = retry.reinvoke().await;
                HandlerOutcome::Reinvoked
            }
            Some(Err(_)) | None => HandlerOutcome::PassThrough,
        }
    }
}
