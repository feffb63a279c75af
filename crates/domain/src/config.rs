//! Pipeline configuration structures
//!
//! Loaded by `callguard_infra::config::loader` from the environment or a
//! TOML/JSON file. Every section has defaults, so a partial file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RETRY_AFTER_SECS,
    DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_REFRESH_SESSION_PATH, DEFAULT_REQUEST_SESSION_PATH,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::errors::{CallguardError, Result};
use crate::types::outcome::RetryBudget;
use crate::types::session::TokenRecovery;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl PipelineConfig {
    /// Reject values the pipeline cannot run with.
    ///
    /// # Errors
    /// Returns `CallguardError::Config` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(CallguardError::Config(format!(
                "retry.initial_backoff_ms ({}) exceeds retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }
        if self.backend.timeout_secs == 0 {
            return Err(CallguardError::Config("backend.timeout_secs must be positive".into()));
        }
        if self.backend.base_url.trim().is_empty() {
            return Err(CallguardError::Config("backend.base_url must not be empty".into()));
        }
        Ok(())
    }
}

/// Caller-layer retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt.
    pub max_attempts: u32,
    /// Longest server `Retry-After` hint honoured, in seconds.
    pub max_retry_after_secs: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetrySettings {
    pub fn max_retry_after(&self) -> Duration {
        Duration::from_secs(self.max_retry_after_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Fresh budget for one logical call.
    pub fn budget(&self) -> RetryBudget {
        RetryBudget::new(self.max_attempts, self.max_retry_after())
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            max_retry_after_secs: DEFAULT_MAX_RETRY_AFTER_SECS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Session recovery settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub token_recovery: TokenRecovery,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Sent as `x-pm-appversion`.
    pub app_version: String,
    pub user_agent: String,
    pub request_session_path: String,
    pub refresh_session_path: String,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost/api/".to_string(),
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            app_version: concat!("callguard@", env!("CARGO_PKG_VERSION")).to_string(),
            user_agent: concat!("callguard/", env!("CARGO_PKG_VERSION")).to_string(),
            request_session_path: DEFAULT_REQUEST_SESSION_PATH.to_string(),
            refresh_session_path: DEFAULT_REFRESH_SESSION_PATH.to_string(),
        }
    }
}
