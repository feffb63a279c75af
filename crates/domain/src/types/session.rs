//! Session and client identity types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Opaque server-issued session identifier (the `UID`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the user owning an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key correlating a call with the context a verification prompt belongs to.
///
/// Authenticated calls are keyed by their session; anonymous calls by the
/// cookie session the transport maintains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ClientId {
    Account(SessionId),
    Cookie(String),
}

impl ClientId {
    pub fn account(session_id: SessionId) -> Self {
        Self::Account(session_id)
    }

    pub fn cookie(id: impl Into<String>) -> Self {
        Self::Cookie(id.into())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account:{id}"),
            Self::Cookie(id) => write!(f, "cookie:{id}"),
        }
    }
}

/// Bearer/refresh token pair bound to a session id.
///
/// A session without a user is *unauthenticated* (issued by
/// `request_session`); one with a user is *authenticated*. Refreshing keeps
/// the id and replaces the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

impl Session {
    /// Create an unauthenticated session.
    pub fn unauthenticated(
        session_id: SessionId,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            session_id,
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            scopes,
            user_id: None,
        }
    }

    /// Bind the session to its owning user.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Same session with a new token pair and scope set.
    pub fn refresh_with(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            session_id: self.session_id.clone(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            scopes,
            user_id: self.user_id.clone(),
        }
    }
}

// Tokens never reach log output.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("scopes", &self.scopes)
            .field("user_id", &self.user_id)
            .finish()
    }
}

fn redact(token: &str) -> String {
    if token.is_empty() {
        String::new()
    } else {
        format!("<redacted:{}>", token.len())
    }
}

/// What the token handler may do on a 401 when no session is bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRecovery {
    /// Refresh an existing session, or request a new unauthenticated one.
    #[default]
    RefreshOrRequest,
    /// Only ever refresh; never mint an unauthenticated session.
    RefreshOnly,
}

impl_domain_status_conversions!(TokenRecovery {
    RefreshOrRequest => "refresh_or_request",
    RefreshOnly => "refresh_only",
});
