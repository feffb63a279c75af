//! In-memory session store
//!
//! Serves the core session ports from a concurrent map. Token listener
//! callbacks write straight back into the map, so the next attempt of a call
//! sees the refreshed token.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use callguard_core::{SessionListener, SessionProvider};
use callguard_domain::{Session, SessionId, UserId};

/// Sessions keyed by id, shared by every manager of an application.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<SessionId, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert or replace a session.
    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.session_id.clone(), session);
    }

    pub fn remove(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions.remove(session_id).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionStore {
    async fn get_session(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    /// `None` looks up the unauthenticated session.
    async fn get_session_id(&self, user_id: Option<&UserId>) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|entry| entry.value().user_id.as_ref() == user_id)
            .map(|entry| entry.key().clone())
    }

    async fn get_user_id(&self, session_id: &SessionId) -> Option<UserId> {
        self.sessions.get(session_id).and_then(|entry| entry.value().user_id.clone())
    }
}

#[async_trait]
impl SessionListener for InMemorySessionStore {
    async fn on_session_token_created(&self, session: &Session) {
        info!(session = %session.session_id, "session created");
        self.insert(session.clone());
    }

    async fn on_session_token_refreshed(&self, session: &Session) {
        debug!(session = %session.session_id, "session tokens updated");
        self.insert(session.clone());
    }

    async fn on_session_force_logout(&self, session: &Session, http_code: u16) {
        info!(session = %session.session_id, http_code, "session force logged out");
        self.remove(&session.session_id);
    }
}
