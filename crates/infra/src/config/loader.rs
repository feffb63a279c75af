//! Configuration loader
//!
//! Loads pipeline configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file from the working directory, if present
//! 2. Attempts to load from environment variables
//! 3. If `CALLGUARD_BASE_URL` is unset, falls back to loading from file
//! 4. Searches multiple paths for config files (TOML or JSON)
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `CALLGUARD_BASE_URL`: API base URL (required for env loading)
//! - `CALLGUARD_TIMEOUT_SECS`: Request timeout in seconds
//! - `CALLGUARD_APP_VERSION`: Value of the `x-pm-appversion` header
//! - `CALLGUARD_USER_AGENT`: Value of the `User-Agent` header
//! - `CALLGUARD_MAX_RETRY_ATTEMPTS`: Retries after the first attempt
//! - `CALLGUARD_MAX_RETRY_AFTER_SECS`: Longest `Retry-After` honoured
//! - `CALLGUARD_INITIAL_BACKOFF_MS` / `CALLGUARD_MAX_BACKOFF_MS`: Backoff
//!   bounds
//! - `CALLGUARD_TOKEN_RECOVERY`: `refresh_or_request` or `refresh_only`
//! - `CALLGUARD_LOG_LEVEL`: Default log filter directive
//! - `CALLGUARD_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./callguard.toml` or `./callguard.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use callguard_domain::{CallguardError, PipelineConfig, Result, TokenRecovery};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["callguard.toml", "callguard.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the base URL is
/// not configured there, falls back to loading from a config file.
///
/// # Errors
/// Returns `CallguardError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<PipelineConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `CALLGUARD_BASE_URL` must be set; every other variable falls back to the
/// defaults of [`PipelineConfig`].
///
/// # Errors
/// Returns `CallguardError::Config` if the base URL is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();

    config.backend.base_url = env_var("CALLGUARD_BASE_URL")?;
    config.backend.timeout_secs = env_parse("CALLGUARD_TIMEOUT_SECS", config.backend.timeout_secs)?;
    if let Ok(app_version) = std::env::var("CALLGUARD_APP_VERSION") {
        config.backend.app_version = app_version;
    }
    if let Ok(user_agent) = std::env::var("CALLGUARD_USER_AGENT") {
        config.backend.user_agent = user_agent;
    }

    config.retry.max_attempts =
        env_parse("CALLGUARD_MAX_RETRY_ATTEMPTS", config.retry.max_attempts)?;
    config.retry.max_retry_after_secs =
        env_parse("CALLGUARD_MAX_RETRY_AFTER_SECS", config.retry.max_retry_after_secs)?;
    config.retry.initial_backoff_ms =
        env_parse("CALLGUARD_INITIAL_BACKOFF_MS", config.retry.initial_backoff_ms)?;
    config.retry.max_backoff_ms = env_parse("CALLGUARD_MAX_BACKOFF_MS", config.retry.max_backoff_ms)?;

    if let Ok(recovery) = std::env::var("CALLGUARD_TOKEN_RECOVERY") {
        config.session.token_recovery = parse_token_recovery(&recovery)?;
    }

    if let Ok(level) = std::env::var("CALLGUARD_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("CALLGUARD_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CallguardError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<PipelineConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CallguardError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => discover_config_paths().ok_or_else(|| {
            CallguardError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CallguardError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`). Missing
/// sections and fields take their defaults.
///
/// # Errors
/// Returns `CallguardError::Config` if format is invalid or parsing fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<PipelineConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CallguardError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CallguardError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(CallguardError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Search standard locations for a configuration file
///
/// Searches the current working directory first, then the directory of the
/// running executable.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn discover_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn parse_token_recovery(value: &str) -> Result<TokenRecovery> {
    value.trim().replace('-', "_").parse().map_err(CallguardError::Config)
}

/// Get required environment variable
///
/// # Errors
/// Returns `CallguardError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CallguardError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Parse an optional environment variable, using `default` when unset.
///
/// # Errors
/// Returns `CallguardError::Config` if the variable is set but invalid.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CallguardError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
