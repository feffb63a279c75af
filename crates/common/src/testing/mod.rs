//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: async waiting helpers for concurrency tests
//!
//! Downstream crates enable the `test-utils` feature from their
//! `[dev-dependencies]`.
//!
//! ```rust,ignore
//! use callguard_common::testing::poll_until;
//!
//! let ready = poll_until(Duration::from_secs(1), Duration::from_millis(5), || async {
//!     listener.calls() == 1
//! })
//! .await;
//! assert!(ready);
//! ```

pub mod async_utils;

pub use async_utils::{poll_until, timeout_ok};
