//! # Callguard Core
//!
//! The resilient API-execution pipeline.
//!
//! This crate contains:
//! - Port interfaces (traits) for sessions, listeners and the transport
//! - The handler chain recovering from auth, verification, scope, blocking
//!   and version errors
//! - `ApiManager`, the single entry point for executing calls
//! - Keyed single-flight execution backing refresh and prompt de-duplication
//! - Caller-layer retry with backoff and `Retry-After` support
//!
//! ## Architecture Principles
//! - Only depends on `callguard-common` and `callguard-domain`
//! - No HTTP or storage code
//! - All external collaborators via traits

pub mod call;
pub mod factory;
pub mod handlers;
pub mod manager;
pub mod ports;
pub mod retrying;
pub mod single_flight;

pub use call::{ApiCall, CallContext};
pub use factory::ApiManagerFactory;
pub use handlers::{ApiErrorHandler, HandlerOutcome, Reinvoke};
pub use manager::{ApiManager, RequestGate};
pub use ports::{
    AlwaysConnected, ApiBackend, ApiClient, ApiConnectionListener, ClientIdProvider,
    DeviceVerificationListener, HumanVerificationListener, MissingScopeListener, NetworkMonitor,
    NoopListener, SessionBackend, SessionClientIds, SessionListener, SessionProvider,
};
pub use retrying::{ApiRetryPolicy, RetryingInvoker};
pub use single_flight::SingleFlight;
