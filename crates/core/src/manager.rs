//! API manager - single entry point for executing calls
//!
//! Invokes the backend and, on failure, threads the error through the
//! handler chain. Each handler may re-issue the call once; the latest
//! outcome is what the next handler sees and what the caller receives.
//! The manager never retries on its own. Calls made while the network
//! monitor reports no connectivity fail with `NoInternet` without reaching
//! the backend.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callguard_domain::constants::http;
use callguard_domain::{ApiError, ApiResult, SessionId};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::call::{ApiCall, CallContext};
use crate::handlers::{ApiErrorHandler, HandlerOutcome, Reinvoke};
use crate::ports::{AlwaysConnected, ApiBackend, NetworkMonitor};

/// Shared `429 Too Many Requests` window.
///
/// After a 429 carrying `Retry-After`, calls fail fast with that error until
/// the window elapses.
#[derive(Debug, Default)]
pub struct RequestGate {
    blocked: Mutex<Option<(Instant, ApiError)>>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The throttling error to fail with, if the window is still open. Its
    /// `Retry-After` is the remaining wait.
    pub fn check(&self) -> Option<ApiError> {
        let mut blocked = self.blocked.lock();
        let (until, error) = blocked.as_ref()?;
        let now = Instant::now();
        if now < *until {
            Some(error.clone().with_retry_after(Some(*until - now)))
        } else {
            *blocked = None;
            None
        }
    }

    /// Open the window if `result` is a 429 with a hint.
    pub fn observe<T>(&self, result: &ApiResult<T>) {
        let Err(error) = result else { return };
        if error.http_code() != Some(http::TOO_MANY_REQUESTS) {
            return;
        }
        if let Some(wait) = error.retry_after().filter(|wait| !wait.is_zero()) {
            debug!(?wait, "too many requests, closing gate");
            *self.blocked.lock() = Some((Instant::now() + wait, error.clone()));
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        let blocked = self.blocked.lock();
        let (until, _) = blocked.as_ref()?;
        until.checked_duration_since(Instant::now()).filter(|left| !left.is_zero())
    }
}

/// Executes calls for one session against one backend.
pub struct ApiManager<Api, B> {
    backend: Arc<B>,
    session_id: Option<SessionId>,
    handlers: Arc<[Arc<dyn ApiErrorHandler>]>,
    gate: Arc<RequestGate>,
    network: Arc<dyn NetworkMonitor>,
    _api: PhantomData<fn() -> Api>,
}

impl<Api, B> Clone for ApiManager<Api, B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            session_id: self.session_id.clone(),
            handlers: Arc::clone(&self.handlers),
            gate: Arc::clone(&self.gate),
            network: Arc::clone(&self.network),
            _api: PhantomData,
        }
    }
}

impl<Api, B> ApiManager<Api, B>
where
    Api: Send + Sync + 'static,
    B: ApiBackend<Api>,
{
    pub fn new(
        backend: Arc<B>,
        session_id: Option<SessionId>,
        handlers: Vec<Arc<dyn ApiErrorHandler>>,
        gate: Arc<RequestGate>,
    ) -> Self {
        Self {
            backend,
            session_id,
            handlers: handlers.into(),
            gate,
            network: Arc::new(AlwaysConnected),
            _api: PhantomData,
        }
    }

    /// Fail calls with `NoInternet` while `monitor` reports no connectivity.
    #[must_use]
    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network = monitor;
        self
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Execute `call`, recovering from the conditions the handlers know.
    ///
    /// # Errors
    /// Returns the final `ApiError` when the call fails and no handler could
    /// resolve it, or when the re-issued call fails again.
    pub async fn invoke<T>(&self, call: &ApiCall<Api, T>) -> ApiResult<T>
    where
        T: Send + 'static,
    {
        self.invoke_with_cancellation(call, CancellationToken::new()).await
    }

    /// Like [`invoke`](Self::invoke), but handler waits stop as soon as
    /// `cancellation` fires; the error being handled is then returned.
    ///
    /// # Errors
    /// See [`invoke`](Self::invoke).
    #[instrument(skip_all, fields(call = %call.name(), session = ?self.session_id))]
    pub async fn invoke_with_cancellation<T>(
        &self,
        call: &ApiCall<Api, T>,
        cancellation: CancellationToken,
    ) -> ApiResult<T>
    where
        T: Send + 'static,
    {
        if !self.network.is_connected() {
            debug!("no network, call not sent");
            return Err(ApiError::NoInternet);
        }

        if let Some(throttled) = self.gate.check() {
            debug!(retry_after = ?throttled.retry_after(), "request gate closed");
            return Err(throttled);
        }

        let ctx = CallContext::new(call.name(), self.session_id.clone(), cancellation);
        let mut result = self.backend.invoke(call).await;
        self.gate.observe(&result);

        for handler in self.handlers.iter() {
            let error = match &result {
                Ok(_) => break,
                Err(error) => error.clone(),
            };

            let reinvoker = Reinvoker::new(self.backend.as_ref(), call);
            if handler.handle(&error, &ctx, &reinvoker).await == HandlerOutcome::Reinvoked {
                debug!(handler = handler.name(), "call re-issued");
                result = reinvoker.into_result().unwrap_or(Err(error));
                self.gate.observe(&result);
            }
        }

        if let Err(error) = &result {
            debug!(%error, "call failed");
        }
        result
    }
}

/// One-shot re-invocation handed to a handler.
struct Reinvoker<'a, Api, B, T> {
    backend: &'a B,
    call: &'a ApiCall<Api, T>,
    slot: Mutex<Option<ApiResult<T>>>,
}

impl<'a, Api, B, T> Reinvoker<'a, Api, B, T> {
    fn new(backend: &'a B, call: &'a ApiCall<Api, T>) -> Self {
        Self { backend, call, slot: Mutex::new(None) }
    }

    fn into_result(self) -> Option<ApiResult<T>> {
        self.slot.into_inner()
    }
}

fn summarize<T>(result: &ApiResult<T>) -> Result<(), ApiError> {
    result.as_ref().map(|_| ()).map_err(Clone::clone)
}

#[async_trait]
impl<'a, Api, B, T> Reinvoke for Reinvoker<'a, Api, B, T>
where
    Api: Send + Sync + 'static,
    B: ApiBackend<Api>,
    T: Send + 'static,
{
    async fn reinvoke(&self) -> Result<(), ApiError> {
        let previous = self.slot.lock().as_ref().map(summarize);
        if let Some(summary) = previous {
            return summary;
        }
        let result = self.backend.invoke(self.call).await;
        let summary = summarize(&result);
        *self.slot.lock() = Some(result);
        summary
    }
}
