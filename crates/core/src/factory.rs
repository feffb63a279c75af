//! Factory wiring the handler chain for each manager
//!
//! The factory owns everything that must be shared between managers: the
//! collaborators, the single-flight registries and the request gate. Two
//! managers created by the same factory for the same session therefore never
//! refresh concurrently.

use std::sync::Arc;

use callguard_domain::{PipelineConfig, SessionId, TokenRecovery};

use crate::handlers::device_verification::DeviceVerificationRegistry;
use crate::handlers::human_verification::HumanVerificationRegistry;
use crate::handlers::missing_scope::MissingScopeRegistry;
use crate::handlers::token::TokenRegistry;
use crate::handlers::{
    ApiErrorHandler, ConnectionErrorHandler, DeviceVerificationHandler, ForceUpdateHandler,
    HumanVerificationInvalidHandler, HumanVerificationNeededHandler, MissingScopeHandler,
    TokenErrorHandler,
};
use crate::manager::{ApiManager, RequestGate};
use crate::ports::{
    AlwaysConnected, ApiBackend, ApiClient, ApiConnectionListener, ClientIdProvider,
    DeviceVerificationListener, HumanVerificationListener, MissingScopeListener, NetworkMonitor,
    NoopListener, SessionBackend, SessionClientIds, SessionListener, SessionProvider,
};

#[derive(Default)]
struct Registries {
    token: Arc<TokenRegistry>,
    human_verification: Arc<HumanVerificationRegistry>,
    device_verification: Arc<DeviceVerificationRegistry>,
    missing_scope: Arc<MissingScopeRegistry>,
}

/// Creates [`ApiManager`]s sharing one set of collaborators and registries.
pub struct ApiManagerFactory {
    token_recovery: TokenRecovery,
    session_provider: Arc<dyn SessionProvider>,
    session_listener: Arc<dyn SessionListener>,
    client_ids: Arc<dyn ClientIdProvider>,
    human_verification: Arc<dyn HumanVerificationListener>,
    device_verification: Arc<dyn DeviceVerificationListener>,
    missing_scope: Arc<dyn MissingScopeListener>,
    connection: Arc<dyn ApiConnectionListener>,
    api_client: Arc<dyn ApiClient>,
    network: Arc<dyn NetworkMonitor>,
    registries: Registries,
    gate: Arc<RequestGate>,
}

impl ApiManagerFactory {
    /// Factory with the session collaborators; every other listener declines
    /// its challenge until replaced with a `with_*` method.
    pub fn new(
        session_provider: Arc<dyn SessionProvider>,
        session_listener: Arc<dyn SessionListener>,
    ) -> Self {
        let noop = Arc::new(NoopListener);
        Self {
            token_recovery: TokenRecovery::default(),
            client_ids: Arc::new(SessionClientIds::new(Arc::clone(&session_provider))),
            session_provider,
            session_listener,
            human_verification: noop.clone(),
            device_verification: noop.clone(),
            missing_scope: noop.clone(),
            connection: noop.clone(),
            api_client: noop,
            network: Arc::new(AlwaysConnected),
            registries: Registries::default(),
            gate: Arc::new(RequestGate::new()),
        }
    }

    /// Apply the session section of `config`.
    pub fn with_config(mut self, config: &PipelineConfig) -> Self {
        self.token_recovery = config.session.token_recovery;
        self
    }

    pub fn with_token_recovery(mut self, recovery: TokenRecovery) -> Self {
        self.token_recovery = recovery;
        self
    }

    pub fn with_client_ids(mut self, provider: Arc<dyn ClientIdProvider>) -> Self {
        self.client_ids = provider;
        self
    }

    pub fn with_human_verification(mut self, listener: Arc<dyn HumanVerificationListener>) -> Self {
        self.human_verification = listener;
        self
    }

    pub fn with_device_verification(
        mut self,
        listener: Arc<dyn DeviceVerificationListener>,
    ) -> Self {
        self.device_verification = listener;
        self
    }

    pub fn with_missing_scope(mut self, listener: Arc<dyn MissingScopeListener>) -> Self {
        self.missing_scope = listener;
        self
    }

    pub fn with_connection_listener(mut self, listener: Arc<dyn ApiConnectionListener>) -> Self {
        self.connection = listener;
        self
    }

    pub fn with_api_client(mut self, client: Arc<dyn ApiClient>) -> Self {
        self.api_client = client;
        self
    }

    /// Connectivity check run before every call.
    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network = monitor;
        self
    }

    /// The `429` window shared by all managers of this factory.
    pub fn request_gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    /// Manager for `session_id` (or the unauthenticated session) with the
    /// built-in handler chain.
    pub fn create<Api, B>(&self, backend: Arc<B>, session_id: Option<SessionId>) -> ApiManager<Api, B>
    where
        Api: Send + Sync + 'static,
        B: ApiBackend<Api> + 'static,
    {
        self.create_with_handlers(backend, session_id, Vec::new())
    }

    /// Like [`create`](Self::create), with `extra` handlers run after the
    /// built-in chain.
    pub fn create_with_handlers<Api, B>(
        &self,
        backend: Arc<B>,
        session_id: Option<SessionId>,
        extra: Vec<Arc<dyn ApiErrorHandler>>,
    ) -> ApiManager<Api, B>
    where
        Api: Send + Sync + 'static,
        B: ApiBackend<Api> + 'static,
    {
        let session_backend: Arc<dyn SessionBackend> = backend.clone();
        let mut handlers = self.builtin_handlers(session_backend);
        handlers.extend(extra);
        ApiManager::new(backend, session_id, handlers, Arc::clone(&self.gate))
            .with_network_monitor(Arc::clone(&self.network))
    }

    fn builtin_handlers(&self, backend: Arc<dyn SessionBackend>) -> Vec<Arc<dyn ApiErrorHandler>> {
        vec![
            Arc::new(TokenErrorHandler::new(
                backend,
                Arc::clone(&self.session_provider),
                Arc::clone(&self.session_listener),
                Arc::clone(&self.registries.token),
                self.token_recovery,
            )),
            Arc::new(HumanVerificationInvalidHandler::new(
                Arc::clone(&self.client_ids),
                Arc::clone(&self.human_verification),
            )),
            Arc::new(HumanVerificationNeededHandler::new(
                Arc::clone(&self.client_ids),
                Arc::clone(&self.human_verification),
                Arc::clone(&self.registries.human_verification),
            )),
            Arc::new(DeviceVerificationHandler::new(
                Arc::clone(&self.session_provider),
                Arc::clone(&self.device_verification),
                Arc::clone(&self.registries.device_verification),
            )),
            Arc::new(MissingScopeHandler::new(
                Arc::clone(&self.session_provider),
                Arc::clone(&self.missing_scope),
                Arc::clone(&self.registries.missing_scope),
            )),
            Arc::new(ConnectionErrorHandler::new(Arc::clone(&self.connection))),
            Arc::new(ForceUpdateHandler::new(Arc::clone(&self.api_client))),
        ]
    }
}
