//! Shared helpers for `callguard-infra` integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use callguard_core::{ApiCall, ApiConnectionListener};
use callguard_domain::{BackendConfig, Session, SessionId, UserId};
use callguard_infra::{HttpApi, HttpBackend, InMemorySessionStore};
use serde::Deserialize;
use std::sync::Mutex;
use wiremock::MockServer;

pub const SESSION: &str = "uid-1";
pub const APP_VERSION: &str = "tests@1.0.0";
pub const USER_AGENT: &str = "callguard-tests";

/// Transport settings pointing at the mock server's `/api/` prefix.
pub fn backend_config(server: &MockServer) -> BackendConfig {
    BackendConfig {
        base_url: format!("{}/api", server.uri()),
        timeout_secs: 5,
        app_version: APP_VERSION.to_string(),
        user_agent: USER_AGENT.to_string(),
        ..BackendConfig::default()
    }
}

pub fn authenticated_session(access_token: &str) -> Session {
    Session::unauthenticated(SessionId::new(SESSION), access_token, "refresh-1", vec![])
        .with_user(UserId::new("user-1"))
}

/// Store holding one authenticated session and a backend bound to it.
pub fn bound_backend(
    server: &MockServer,
    access_token: &str,
) -> (Arc<InMemorySessionStore>, Arc<HttpBackend>) {
    let store = InMemorySessionStore::new();
    store.insert(authenticated_session(access_token));
    let backend = HttpBackend::new(&backend_config(server), store.clone(), Some(SessionId::new(SESSION)))
        .expect("backend");
    (store, Arc::new(backend))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserResponse {
    pub code: i32,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub name: String,
}

pub fn users_call() -> ApiCall<HttpApi, UserResponse> {
    ApiCall::new("get_user", |api: Arc<HttpApi>| async move { api.get("core/v4/users").await })
}

pub fn user_body(name: &str) -> serde_json::Value {
    serde_json::json!({ "Code": 1000, "User": { "Name": name } })
}

#[derive(Default)]
pub struct RecordingConnection {
    pub blocked: Mutex<Vec<(Option<String>, Option<String>)>>,
}

#[async_trait]
impl ApiConnectionListener for RecordingConnection {
    async fn on_potentially_blocked(&self, path: Option<&str>, query: Option<&str>, _cause: &str) {
        self.blocked.lock().unwrap().push((path.map(str::to_string), query.map(str::to_string)));
    }
}
