//! Port interfaces for the API pipeline
//!
//! These traits define the boundaries between the pipeline and the
//! collaborators that own sessions, talk to the network and interact with
//! the user. Implementations live in `callguard-infra` or in the embedding
//! application.

use std::sync::Arc;

use async_trait::async_trait;
use callguard_domain::{
    ApiResult, ChallengeResult, ClientId, DeviceChallenge, HumanVerificationDetails,
    MissingScopes, Session, SessionId, UserId,
};

use crate::call::ApiCall;

/// Read access to stored sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current session for `session_id`, if one is stored.
    async fn get_session(&self, session_id: &SessionId) -> Option<Session>;

    /// Session owned by `user_id`, or the unauthenticated session when
    /// `user_id` is `None`.
    async fn get_session_id(&self, user_id: Option<&UserId>) -> Option<SessionId>;

    /// User owning `session_id`, if the session is authenticated.
    async fn get_user_id(&self, session_id: &SessionId) -> Option<UserId>;
}

/// Notified whenever the pipeline changes session state
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// A new unauthenticated session was obtained.
    async fn on_session_token_created(&self, session: &Session);

    /// The tokens of an existing session were replaced.
    async fn on_session_token_refreshed(&self, session: &Session);

    /// Refreshing failed terminally; the session must be discarded.
    async fn on_session_force_logout(&self, session: &Session, http_code: u16);
}

/// Resolves human-verification challenges
#[async_trait]
pub trait HumanVerificationListener: Send + Sync {
    /// Ask the user to pass the challenge. Resolves once they succeed or give up.
    async fn on_human_verification_needed(
        &self,
        client_id: &ClientId,
        details: &HumanVerificationDetails,
    ) -> ChallengeResult;

    async fn on_human_verification_passed(&self, client_id: &ClientId);

    async fn on_human_verification_failed(&self, client_id: &ClientId);

    /// The verification token attached to a request was rejected.
    async fn on_human_verification_invalid(&self, _client_id: &ClientId) {}
}

/// Resolves device-verification challenges
#[async_trait]
pub trait DeviceVerificationListener: Send + Sync {
    async fn on_device_verification(
        &self,
        session_id: &SessionId,
        challenge: &DeviceChallenge,
    ) -> ChallengeResult;
}

/// Obtains permission scopes the session lacks
#[async_trait]
pub trait MissingScopeListener: Send + Sync {
    async fn on_missing_scope(
        &self,
        user_id: Option<&UserId>,
        scopes: &MissingScopes,
    ) -> ChallengeResult;
}

/// Observes connection failures that look like the API host is blocked
#[async_trait]
pub trait ApiConnectionListener: Send + Sync {
    async fn on_potentially_blocked(&self, path: Option<&str>, query: Option<&str>, cause: &str);
}

/// Application hooks triggered by the server
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// The server no longer accepts this client build.
    async fn force_update(&self, message: &str);
}

/// Supplies the verification key for a call
#[async_trait]
pub trait ClientIdProvider: Send + Sync {
    async fn get_client_id(&self, session_id: Option<&SessionId>) -> Option<ClientId>;
}

/// Session endpoints of the transport
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Obtain a new unauthenticated session.
    async fn request_session(&self) -> ApiResult<Session>;

    /// Exchange the refresh token of `session` for a new token pair.
    async fn refresh_session(&self, session: &Session) -> ApiResult<Session>;
}

/// Transport executing calls against a typed API surface
#[async_trait]
pub trait ApiBackend<Api>: SessionBackend
where
    Api: Send + Sync + 'static,
{
    /// Execute one attempt of `call`.
    async fn invoke<T>(&self, call: &ApiCall<Api, T>) -> ApiResult<T>
    where
        T: Send + 'static;
}

/// Keys verification prompts by the session the call runs under.
///
/// Unbound calls use the unauthenticated session; with none stored they get
/// no client id and their verification errors pass through.
pub struct SessionClientIds {
    sessions: Arc<dyn SessionProvider>,
}

impl SessionClientIds {
    pub fn new(sessions: Arc<dyn SessionProvider>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl ClientIdProvider for SessionClientIds {
    async fn get_client_id(&self, session_id: Option<&SessionId>) -> Option<ClientId> {
        let session_id = match session_id {
            Some(id) => id.clone(),
            None => self.sessions.get_session_id(None).await?,
        };
        Some(ClientId::Account(session_id))
    }
}

/// Reports whether the device currently has network access.
pub trait NetworkMonitor: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Monitor for hosts without connectivity tracking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnected;

impl NetworkMonitor for AlwaysConnected {
    fn is_connected(&self) -> bool {
        true
    }
}

/// Listener that declines every challenge and ignores notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

#[async_trait]
impl HumanVerificationListener for NoopListener {
    async fn on_human_verification_needed(
        &self,
        _client_id: &ClientId,
        _details: &HumanVerificationDetails,
    ) -> ChallengeResult {
        ChallengeResult::Cancel
    }

    async fn on_human_verification_passed(&self, _client_id: &ClientId) {}

    async fn on_human_verification_failed(&self, _client_id: &ClientId) {}
}

#[async_trait]
impl DeviceVerificationListener for NoopListener {
    async fn on_device_verification(
        &self,
        _session_id: &SessionId,
        _challenge: &DeviceChallenge,
    ) -> ChallengeResult {
        ChallengeResult::Cancel
    }
}

#[async_trait]
impl MissingScopeListener for NoopListener {
    async fn on_missing_scope(
        &self,
        _user_id: Option<&UserId>,
        _scopes: &MissingScopes,
    ) -> ChallengeResult {
        ChallengeResult::Cancel
    }
}

#[async_trait]
impl ApiConnectionListener for NoopListener {
    async fn on_potentially_blocked(
        &self,
        _path: Option<&str>,
        _query: Option<&str>,
        _cause: &str,
    ) {
    }
}

#[async_trait]
impl ApiClient for NoopListener {
    async fn force_update(&self, _message: &str) {}
}
