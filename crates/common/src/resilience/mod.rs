//! Resilience patterns for transient failures
//!
//! This module provides the **generic** retry executor used by the caller
//! layer of the API pipeline:
//! - configurable backoff strategies (fixed, linear, exponential)
//! - jitter to spread out synchronised retries
//! - a [`RetryPolicy`] seam so each domain decides what is retryable and can
//!   substitute a server-supplied delay for the computed backoff
//!
//! The executor knows nothing about HTTP or sessions; `callguard-core`
//! implements `RetryPolicy` for its outcome type.

pub mod retry;

pub use retry::{
    BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError,
    RetryExecutor, RetryPolicy, RetryResult,
};
