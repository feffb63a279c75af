//! # Callguard Domain
//!
//! Domain types and models for the resilient API-execution pipeline.
//!
//! This crate contains:
//! - The call outcome model (`ApiError`, `ApiResult`) and its classification
//! - Structured server error details (verification challenges, scopes)
//! - Wire decoding of error bodies and `Retry-After` hints
//! - Session, user and client identifiers
//! - Configuration structures and the domain error type
//!
//! ## Architecture
//! - No dependencies on other Callguard crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
