//! Wire constants
//!
//! HTTP statuses and server application codes the pipeline reacts to.

/// HTTP status codes with pipeline-specific meaning.
pub mod http {
    pub const UNAUTHORIZED: u16 = 401;
    pub const FORBIDDEN: u16 = 403;
    pub const REQUEST_TIMEOUT: u16 = 408;
    pub const UNPROCESSABLE: u16 = 422;
    pub const TOO_MANY_REQUESTS: u16 = 429;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    pub const BAD_GATEWAY: u16 = 502;
    pub const SERVICE_UNAVAILABLE: u16 = 503;
    pub const GATEWAY_TIMEOUT: u16 = 504;

    /// Statuses the generic retry policy considers transient.
    pub const RETRYABLE: [u16; 6] = [
        REQUEST_TIMEOUT,
        TOO_MANY_REQUESTS,
        INTERNAL_SERVER_ERROR,
        BAD_GATEWAY,
        SERVICE_UNAVAILABLE,
        GATEWAY_TIMEOUT,
    ];
}

/// Application error codes carried in the `Code` field of an error body.
pub mod response_codes {
    pub const APP_VERSION_BAD: i32 = 5003;
    pub const API_VERSION_INVALID: i32 = 5005;
    pub const HUMAN_VERIFICATION_REQUIRED: i32 = 9001;
    pub const DEVICE_VERIFICATION_REQUIRED: i32 = 9002;
    pub const MISSING_SCOPE: i32 = 9101;
    pub const HUMAN_VERIFICATION_INVALID_CODE: i32 = 12087;

    /// Codes that mean the client build is no longer accepted.
    pub const FORCE_UPDATE: [i32; 2] = [APP_VERSION_BAD, API_VERSION_INVALID];
}

// Retry defaults
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 2;
pub const DEFAULT_MAX_RETRY_AFTER_SECS: u64 = 60;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

// Transport defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_SESSION_PATH: &str = "auth/v4/sessions";
pub const DEFAULT_REFRESH_SESSION_PATH: &str = "auth/v4/refresh";
