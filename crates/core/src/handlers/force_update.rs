//! Force-update handler

use std::sync::Arc;

use async_trait::async_trait;
use callguard_domain::ApiError;
use tracing::warn;

use super::{ApiErrorHandler, HandlerOutcome, Reinvoke};
use crate::call::CallContext;
use crate::ports::ApiClient;

/// Tells the application its build was rejected. The error is terminal.
pub struct ForceUpdateHandler {
    client: Arc<dyn ApiClient>,
}

impl ForceUpdateHandler {
    pub fn new(client: Arc<dyn ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApiErrorHandler for ForceUpdateHandler {
    fn name(&self) -> &'static str {
        "force_update"
    }

    async fn handle(
        &self,
        error: &ApiError,
        _ctx: &CallContext,
        _retry: &dyn Reinvoke,
    ) -> HandlerOutcome {
        if let ApiError::Http { message, .. } = error {
            if error.is_force_update() {
                warn!(code = ?error.app_code(), "client version rejected");
                self.client.force_update(message).await;
            }
        }
        HandlerOutcome::PassThrough
    }
}
