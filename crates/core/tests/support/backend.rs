//! Mock session store and backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callguard_core::{ApiBackend, ApiCall, SessionBackend, SessionListener, SessionProvider};
use callguard_domain::{ApiError, ApiResult, Session, SessionId, UserId};
use parking_lot::Mutex;

use super::FRESH_TOKEN;

/// In-memory session store recording every listener notification.
#[derive(Default)]
pub struct RecordingSessions {
    sessions: Mutex<HashMap<SessionId, Session>>,
    pub created: Mutex<Vec<Session>>,
    pub refreshed: Mutex<Vec<Session>>,
    pub logouts: Mutex<Vec<(SessionId, u16)>>,
}

impl RecordingSessions {
    pub fn with_session(session: Session) -> Arc<Self> {
        let store = Self::default();
        store.sessions.lock().insert(session.session_id.clone(), session);
        Arc::new(store)
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Session used by calls bound to `session_id`, or the unauthenticated
    /// session for unbound calls.
    pub fn current(&self, session_id: Option<&SessionId>) -> Option<Session> {
        let sessions = self.sessions.lock();
        match session_id {
            Some(id) => sessions.get(id).cloned(),
            None => sessions.values().find(|session| !session.is_authenticated()).cloned(),
        }
    }

    pub fn refreshed_count(&self) -> usize {
        self.refreshed.lock().len()
    }

    pub fn logout_count(&self) -> usize {
        self.logouts.lock().len()
    }
}

#[async_trait]
impl SessionProvider for RecordingSessions {
    async fn get_session(&self, session_id: &SessionId) -> Option<Session> {
        self.sessions.lock().get(session_id).cloned()
    }

    async fn get_session_id(&self, user_id: Option<&UserId>) -> Option<SessionId> {
        let sessions = self.sessions.lock();
        sessions
            .values()
            .find(|session| session.user_id.as_ref() == user_id)
            .map(|session| session.session_id.clone())
    }

    async fn get_user_id(&self, session_id: &SessionId) -> Option<UserId> {
        self.sessions.lock().get(session_id).and_then(|session| session.user_id.clone())
    }
}

#[async_trait]
impl SessionListener for RecordingSessions {
    async fn on_session_token_created(&self, session: &Session) {
        self.sessions.lock().insert(session.session_id.clone(), session.clone());
        self.created.lock().push(session.clone());
    }

    async fn on_session_token_refreshed(&self, session: &Session) {
        self.sessions.lock().insert(session.session_id.clone(), session.clone());
        self.refreshed.lock().push(session.clone());
    }

    async fn on_session_force_logout(&self, session: &Session, http_code: u16) {
        self.sessions.lock().remove(&session.session_id);
        self.logouts.lock().push((session.session_id.clone(), http_code));
    }
}

/// API surface handed to calls: the token the backend would send.
#[derive(Debug)]
pub struct TestApi {
    pub access_token: Option<String>,
}

/// Backend whose calls observe the stored session at invocation time.
pub struct TestBackend {
    sessions: Arc<RecordingSessions>,
    session_id: Option<SessionId>,
    refresh_delay: Duration,
    refresh_failure: Option<ApiError>,
    pub invocations: AtomicUsize,
    pub refreshes: AtomicUsize,
    pub requests: AtomicUsize,
}

impl TestBackend {
    pub fn new(sessions: Arc<RecordingSessions>, session_id: Option<SessionId>) -> Self {
        Self {
            sessions,
            session_id,
            refresh_delay: Duration::ZERO,
            refresh_failure: None,
            invocations: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn with_refresh_failure(mut self, error: ApiError) -> Self {
        self.refresh_failure = Some(error);
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionBackend for TestBackend {
    async fn request_session(&self) -> ApiResult<Session> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(Session::unauthenticated(SessionId::new("anon-1"), FRESH_TOKEN, "anon-refresh", vec![]))
    }

    async fn refresh_session(&self, session: &Session) -> ApiResult<Session> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        match &self.refresh_failure {
            Some(error) => Err(error.clone()),
            None => Ok(session.refresh_with(FRESH_TOKEN, "refresh-2", session.scopes.clone())),
        }
    }
}

#[async_trait]
impl ApiBackend<TestApi> for TestBackend {
    async fn invoke<T>(&self, call: &ApiCall<TestApi, T>) -> ApiResult<T>
    where
        T: Send + 'static,
    {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let access_token =
            self.sessions.current(self.session_id.as_ref()).map(|session| session.access_token);
        call.execute(Arc::new(TestApi { access_token })).await
    }
}
