//! Tracing subscriber setup
//!
//! Every crate in the workspace logs through `tracing` macros with structured
//! fields. Binaries and test harnesses call [`init_tracing`] once to install a
//! `tracing-subscriber` formatter. `RUST_LOG` always wins over the configured
//! level so operators can raise verbosity without touching config files.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::{CommonError, CommonResult};

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, single line per event.
    #[default]
    Pretty,
    /// Newline-delimited JSON, one object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(CommonError::config_field(
                "logging.format",
                format!("unknown log format '{other}'"),
            )),
        }
    }
}

/// Build the filter used by [`init_tracing`].
///
/// `RUST_LOG` takes precedence; otherwise `level` is parsed as a filter
/// directive (`"info"`, `"callguard_core=debug,warn"`, ...).
///
/// # Errors
/// Returns `CommonError::Config` if `level` is not a valid directive.
pub fn env_filter(level: &str) -> CommonResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| CommonError::config_field("logging.level", e.to_string()))
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Returns `CommonError::Config` if the level directive is invalid or a
/// global subscriber has already been installed.
pub fn init_tracing(level: &str, format: LogFormat) -> CommonResult<()> {
    let filter = env_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true)).try_init(),
    };

    result.map_err(|e| CommonError::config(format!("tracing already initialised: {e}")))
}
