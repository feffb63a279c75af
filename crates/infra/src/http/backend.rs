//! reqwest-backed transport
//!
//! [`HttpBackend`] resolves the session of the manager it serves before every
//! attempt, so a call re-issued after a refresh carries the new token.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use callguard_core::{ApiBackend, ApiCall, SessionBackend, SessionProvider};
use callguard_domain::{ApiError, ApiResult, BackendConfig, Session, SessionId};

use super::api::HttpApi;
use crate::errors::{InfraError, InfraResult};

const APP_VERSION_HEADER: &str = "x-pm-appversion";
const SESSION_UID_HEADER: &str = "x-pm-uid";
const DEFAULT_ACCEPT: &str = "application/vnd.protonmail.v1+json";

/// Transport for one manager, bound to an optional session.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    config: BackendConfig,
    sessions: Arc<dyn SessionProvider>,
    session_id: Option<SessionId>,
}

impl HttpBackend {
    /// Build a backend from transport settings.
    ///
    /// # Errors
    /// Returns [`InfraError::InvalidBaseUrl`] for an unparsable base URL and
    /// [`InfraError::ClientBuild`] when the HTTP client cannot be created.
    pub fn new(
        config: &BackendConfig,
        sessions: Arc<dyn SessionProvider>,
        session_id: Option<SessionId>,
    ) -> InfraResult<Self> {
        let base_url = normalize_base_url(&config.base_url)?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .no_proxy()
            .build()?;

        Ok(Self { client, base_url, config: config.clone(), sessions, session_id })
    }

    /// Same transport and connection pool, bound to another session.
    pub fn for_session(&self, session_id: Option<SessionId>) -> Self {
        Self { session_id, ..self.clone() }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Stored session for this backend: the bound one, or the unauthenticated
    /// session when unbound.
    async fn current_session(&self) -> Option<Session> {
        let session_id = match &self.session_id {
            Some(id) => Some(id.clone()),
            None => self.sessions.get_session_id(None).await,
        }?;
        self.sessions.get_session(&session_id).await
    }

    fn api(&self, session: Option<&Session>, with_token: bool) -> HttpApi {
        HttpApi::new(self.client.clone(), self.base_url.clone(), self.headers(session, with_token))
    }

    fn headers(&self, session: Option<&Session>, with_token: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        insert_header(&mut headers, HeaderName::from_static(APP_VERSION_HEADER), &self.config.app_version);

        if let Some(session) = session {
            if !session.session_id.as_str().is_empty() {
                insert_header(
                    &mut headers,
                    HeaderName::from_static(SESSION_UID_HEADER),
                    session.session_id.as_str(),
                );
            }
            if with_token && !session.access_token.is_empty() {
                insert_header(&mut headers, AUTHORIZATION, &format!("Bearer {}", session.access_token));
            }
        }
        headers
    }
}

fn normalize_base_url(raw: &str) -> InfraResult<Url> {
    let fixed = if raw.ends_with('/') { raw.to_string() } else { format!("{raw}/") };
    Url::parse(&fixed)
        .map_err(|err| InfraError::InvalidBaseUrl { url: raw.to_string(), reason: err.to_string() })
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, "skipping header with invalid value"),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RefreshRequest<'a> {
    #[serde(rename = "UID")]
    uid: &'a str,
    refresh_token: &'a str,
    response_type: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TokenResponse {
    #[serde(rename = "UID", default)]
    uid: Option<String>,
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    scopes: Vec<String>,
}

#[async_trait]
impl SessionBackend for HttpBackend {
    #[instrument(skip_all)]
    async fn request_session(&self) -> ApiResult<Session> {
        let api = self.api(None, false);
        let response: TokenResponse = api
            .post(&self.config.request_session_path, &serde_json::json!({}))
            .await?;

        let uid = response.uid.unwrap_or_default();
        if uid.is_empty() {
            return Err(ApiError::parse("session response carries no UID"));
        }
        info!("unauthenticated session issued");
        Ok(Session::unauthenticated(
            SessionId::new(uid),
            response.access_token,
            response.refresh_token,
            response.scopes,
        ))
    }

    #[instrument(skip_all, fields(session = %session.session_id))]
    async fn refresh_session(&self, session: &Session) -> ApiResult<Session> {
        let api = self.api(Some(session), false);
        let request = RefreshRequest {
            uid: session.session_id.as_str(),
            refresh_token: &session.refresh_token,
            response_type: "token",
            grant_type: "refresh_token",
        };
        let response: TokenResponse = api.post(&self.config.refresh_session_path, &request).await?;

        debug!(scopes = response.scopes.len(), "session tokens refreshed");
        Ok(session.refresh_with(response.access_token, response.refresh_token, response.scopes))
    }
}

#[async_trait]
impl ApiBackend<HttpApi> for HttpBackend {
    #[instrument(skip_all, fields(call = call.name(), session = ?self.session_id))]
    async fn invoke<T>(&self, call: &ApiCall<HttpApi, T>) -> ApiResult<T>
    where
        T: Send + 'static,
    {
        let session = self.current_session().await;
        if session.is_none() {
            debug!("no stored session, sending call without credentials");
        }
        call.execute(Arc::new(self.api(session.as_ref(), true))).await
    }
}
