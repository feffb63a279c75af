//! # Callguard Infrastructure
//!
//! Infrastructure implementations of the core pipeline ports.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport (`HttpBackend`, `HttpApi`)
//! - Configuration loading from the environment or TOML/JSON files
//! - An in-memory session store
//!
//! ## Architecture
//! - Implements traits defined in `callguard-core`
//! - Depends on `callguard-common`, `callguard-domain` and `callguard-core`
//! - Contains all "impure" code (network and filesystem I/O)

pub mod config;
pub mod context;
pub mod errors;
pub mod http;
pub mod session;

// Re-export commonly used items
pub use context::PipelineContext;
pub use errors::{InfraError, InfraResult};
pub use http::{HttpApi, HttpBackend};
pub use session::InMemorySessionStore;
