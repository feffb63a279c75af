//! API call description and per-call context

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use callguard_domain::{ApiResult, SessionId};
use futures::future::{BoxFuture, FutureExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type CallFn<Api, T> = dyn Fn(Arc<Api>) -> BoxFuture<'static, ApiResult<T>> + Send + Sync;

/// A re-issuable request against the API surface `Api`.
///
/// The closure is invoked once per attempt with the surface the backend
/// prepared for that attempt (current tokens, headers), so retries always
/// run with fresh session state.
pub struct ApiCall<Api, T> {
    name: Arc<str>,
    func: Arc<CallFn<Api, T>>,
}

impl<Api, T> ApiCall<Api, T>
where
    Api: Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new<F, Fut>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(Arc<Api>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<T>> + Send + 'static,
    {
        Self { name: name.into(), func: Arc::new(move |api| func(api).boxed()) }
    }

    /// Run one attempt against `api`.
    pub fn execute(&self, api: Arc<Api>) -> BoxFuture<'static, ApiResult<T>> {
        (self.func)(api)
    }
}

impl<Api, T> ApiCall<Api, T> {
    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<Api, T> Clone for ApiCall<Api, T> {
    fn clone(&self) -> Self {
        Self { name: Arc::clone(&self.name), func: Arc::clone(&self.func) }
    }
}

impl<Api, T> fmt::Debug for ApiCall<Api, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCall").field("name", &self.name).finish_non_exhaustive()
    }
}

/// What handlers know about the call whose error they are looking at.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub name: String,
    /// Session the manager is bound to.
    pub session_id: Option<SessionId>,
    /// When the first attempt was issued.
    pub issued_at: Instant,
    pub cancellation: CancellationToken,
}

impl CallContext {
    pub fn new(
        name: impl Into<String>,
        session_id: Option<SessionId>,
        cancellation: CancellationToken,
    ) -> Self {
        Self { name: name.into(), session_id, issued_at: Instant::now(), cancellation }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
