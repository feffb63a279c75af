//! HTTP transport for the pipeline
//!
//! - [`HttpBackend`]: implements the core `ApiBackend`/`SessionBackend`
//!   ports on top of `reqwest`
//! - [`HttpApi`]: the request surface a call closure receives for one attempt

pub mod api;
pub mod backend;

pub use api::HttpApi;
pub use backend::HttpBackend;
