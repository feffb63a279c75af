//! Caller-layer retry around [`ApiManager`]
//!
//! The manager only resolves side-channel conditions. Transient failures
//! (connection loss, timeouts, 408/429/5xx) are retried here with backoff,
//! each attempt running the full handler chain again.

use std::time::Duration;

use callguard_common::error::CommonResult;
use callguard_common::resilience::{
    Jitter, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryPolicy,
};
use callguard_domain::{ApiError, ApiResult, RetrySettings};

use crate::call::ApiCall;
use crate::manager::ApiManager;
use crate::ports::ApiBackend;

/// Retry policy over [`ApiError`] driven by `needs_retry`.
///
/// A server `Retry-After` hint replaces the computed backoff.
#[derive(Debug, Clone, Copy)]
pub struct ApiRetryPolicy {
    max_attempts: u32,
    max_retry_after: Duration,
    retry_connection_errors: bool,
}

impl ApiRetryPolicy {
    pub fn new(max_attempts: u32, max_retry_after: Duration) -> Self {
        Self { max_attempts, max_retry_after, retry_connection_errors: true }
    }

    /// Stop at the first connection, timeout or no-network failure.
    #[must_use]
    pub fn without_connection_retries(mut self) -> Self {
        self.retry_connection_errors = false;
        self
    }
}

impl RetryPolicy<ApiError> for ApiRetryPolicy {
    fn should_retry(&self, error: &ApiError, attempt: u32) -> RetryDecision {
        if !self.retry_connection_errors && error.is_connection_class() {
            return RetryDecision::Stop;
        }
        if !error.needs_retry(attempt, self.max_attempts, self.max_retry_after) {
            return RetryDecision::Stop;
        }
        match error.retry_after() {
            Some(hint) => RetryDecision::RetryAfter(hint),
            None => RetryDecision::Retry,
        }
    }
}

/// Wraps a manager with the generic retry policy.
pub struct RetryingInvoker<Api, B> {
    manager: ApiManager<Api, B>,
    executor: RetryExecutor<ApiRetryPolicy>,
    no_connection_retries: RetryExecutor<ApiRetryPolicy>,
}

impl<Api, B> RetryingInvoker<Api, B>
where
    Api: Send + Sync + 'static,
    B: ApiBackend<Api>,
{
    /// # Errors
    /// Returns `CommonError::Config` when the backoff settings are invalid.
    pub fn new(manager: ApiManager<Api, B>, settings: &RetrySettings) -> CommonResult<Self> {
        let config = RetryConfig::builder()
            .max_attempts(settings.max_attempts.saturating_add(1))
            .exponential_backoff(settings.initial_backoff(), 2.0, settings.max_backoff())
            .jitter(Jitter::Equal)
            .build()?;
        Self::with_config(manager, config, settings)
    }

    /// Use an explicit executor configuration.
    ///
    /// # Errors
    /// Returns `CommonError::Config` when `config` is invalid.
    pub fn with_config(
        manager: ApiManager<Api, B>,
        config: RetryConfig,
        settings: &RetrySettings,
    ) -> CommonResult<Self> {
        let policy = ApiRetryPolicy::new(settings.max_attempts, settings.max_retry_after());
        Ok(Self {
            manager,
            executor: RetryExecutor::new(config.clone(), policy)?,
            no_connection_retries: RetryExecutor::new(config, policy.without_connection_retries())?,
        })
    }

    pub fn manager(&self) -> &ApiManager<Api, B> {
        &self.manager
    }

    /// Invoke `call`, retrying transient failures.
    ///
    /// # Errors
    /// Returns the last `ApiError` once the policy stops or attempts run out.
    pub async fn invoke<T>(&self, call: &ApiCall<Api, T>) -> ApiResult<T>
    where
        T: Send + 'static,
    {
        self.run(&self.executor, call).await
    }

    /// Like [`invoke`](Self::invoke), but connection-class failures are
    /// returned at once. Server errors are still retried.
    ///
    /// # Errors
    /// Returns the last `ApiError` once the policy stops or attempts run out.
    pub async fn invoke_without_connection_retries<T>(
        &self,
        call: &ApiCall<Api, T>,
    ) -> ApiResult<T>
    where
        T: Send + 'static,
    {
        self.run(&self.no_connection_retries, call).await
    }

    async fn run<T>(
        &self,
        executor: &RetryExecutor<ApiRetryPolicy>,
        call: &ApiCall<Api, T>,
    ) -> ApiResult<T>
    where
        T: Send + 'static,
    {
        executor.execute(|| self.manager.invoke(call)).await.map_err(RetryError::into_last_error)
    }
}
