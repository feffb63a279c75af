//! Pipeline context - wires the adapters into a ready-to-use pipeline

use std::sync::Arc;

use callguard_common::error::CommonResult;
use callguard_common::observability::{init_tracing, LogFormat};
use callguard_core::{ApiManager, ApiManagerFactory, RetryingInvoker};
use callguard_domain::{PipelineConfig, SessionId};
use tracing::info;

use crate::errors::InfraResult;
use crate::http::{HttpApi, HttpBackend};
use crate::session::InMemorySessionStore;

/// Holds the configuration, the session store and the manager factory.
///
/// Listeners are installed with [`PipelineContext::with_factory`]; every
/// manager created afterwards shares the factory's single-flight registries
/// and request gate.
pub struct PipelineContext {
    pub config: PipelineConfig,
    pub sessions: Arc<InMemorySessionStore>,
    factory: ApiManagerFactory,
    backend: HttpBackend,
}

impl PipelineContext {
    /// Build the context from a validated configuration.
    ///
    /// # Errors
    /// Returns an [`crate::InfraError`] if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: PipelineConfig) -> InfraResult<Self> {
        config.validate()?;

        let sessions = InMemorySessionStore::new();
        let backend = HttpBackend::new(&config.backend, sessions.clone(), None)?;
        let factory =
            ApiManagerFactory::new(sessions.clone(), sessions.clone()).with_config(&config);

        info!(base_url = %backend.base_url(), "pipeline context ready");
        Ok(Self { config, sessions, factory, backend })
    }

    /// Install the tracing subscriber described by the logging section.
    ///
    /// # Errors
    /// Returns `CommonError::Config` if a subscriber is already installed or
    /// the level directive is invalid.
    pub fn init_logging(&self) -> CommonResult<()> {
        let format = if self.config.logging.json { LogFormat::Json } else { LogFormat::Pretty };
        init_tracing(&self.config.logging.level, format)
    }

    pub fn factory(&self) -> &ApiManagerFactory {
        &self.factory
    }

    /// Reconfigure the factory, e.g. to install listeners.
    #[must_use]
    pub fn with_factory(
        mut self,
        configure: impl FnOnce(ApiManagerFactory) -> ApiManagerFactory,
    ) -> Self {
        self.factory = configure(self.factory);
        self
    }

    /// Manager for `session_id`, or for the unauthenticated session.
    pub fn manager(&self, session_id: Option<SessionId>) -> ApiManager<HttpApi, HttpBackend> {
        let backend = Arc::new(self.backend.for_session(session_id.clone()));
        self.factory.create(backend, session_id)
    }

    /// Manager wrapped with the configured caller-layer retry.
    ///
    /// # Errors
    /// Returns an [`crate::InfraError`] if the retry settings are inconsistent.
    pub fn retrying(
        &self,
        session_id: Option<SessionId>,
    ) -> InfraResult<RetryingInvoker<HttpApi, HttpBackend>> {
        Ok(RetryingInvoker::new(self.manager(session_id), &self.config.retry)?)
    }
}
