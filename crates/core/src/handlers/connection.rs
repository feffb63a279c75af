//! Anti-blocking connection handler

use std::sync::Arc;

use async_trait::async_trait;
use callguard_domain::ApiError;
use tracing::warn;

use super::{ApiErrorHandler, HandlerOutcome, Reinvoke};
use crate::call::CallContext;
use crate::ports::ApiConnectionListener;

/// Reports connection failures that look like the API is being blocked.
/// Never retries.
pub struct ConnectionErrorHandler {
    listener: Arc<dyn ApiConnectionListener>,
}

impl ConnectionErrorHandler {
    pub fn new(listener: Arc<dyn ApiConnectionListener>) -> Self {
        Self { listener }
    }
}

#[async_trait]
impl ApiErrorHandler for ConnectionErrorHandler {
    fn name(&self) -> &'static str {
        "connection"
    }

    async fn handle(
        &self,
        error: &ApiError,
        ctx: &CallContext,
        _retry: &dyn Reinvoke,
    ) -> HandlerOutcome {
        if let ApiError::Connection { potentially_blocked: true, path, query, cause } = error {
            warn!(call = %ctx.name, path = ?path, "API potentially blocked");
            self.listener.on_potentially_blocked(path.as_deref(), query.as_deref(), cause).await;
        }
        HandlerOutcome::PassThrough
    }
}
