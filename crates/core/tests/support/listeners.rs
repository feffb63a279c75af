//! Recording listener mocks.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use callguard_core::{
    ApiClient, ApiConnectionListener, DeviceVerificationListener, HumanVerificationListener,
    MissingScopeListener,
};
use callguard_domain::{
    ChallengeResult, ClientId, DeviceChallenge, HumanVerificationDetails, MissingScopes, SessionId,
    UserId,
};
use parking_lot::Mutex;

/// How a challenge listener answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Succeed,
    Cancel,
    /// Never answers; only cancellation ends the wait.
    Hang,
}

impl Resolution {
    async fn resolve(self, delay: Duration, resolved: &AtomicBool) -> ChallengeResult {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self {
            Self::Succeed => {
                resolved.store(true, Ordering::SeqCst);
                ChallengeResult::Success
            }
            Self::Cancel => ChallengeResult::Cancel,
            Self::Hang => std::future::pending().await,
        }
    }
}

pub struct RecordingHumanVerification {
    resolution: Resolution,
    delay: Duration,
    /// Set once the listener reports success.
    pub resolved: Arc<AtomicBool>,
    pub needed: AtomicUsize,
    pub passed: AtomicUsize,
    pub failed: AtomicUsize,
    pub invalid: AtomicUsize,
    pub prompted: Mutex<Vec<ClientId>>,
}

impl RecordingHumanVerification {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            delay: Duration::ZERO,
            resolved: Arc::new(AtomicBool::new(false)),
            needed: AtomicUsize::new(0),
            passed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            invalid: AtomicUsize::new(0),
            prompted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HumanVerificationListener for RecordingHumanVerification {
    async fn on_human_verification_needed(
        &self,
        client_id: &ClientId,
        _details: &HumanVerificationDetails,
    ) -> ChallengeResult {
        self.needed.fetch_add(1, Ordering::SeqCst);
        self.prompted.lock().push(client_id.clone());
        self.resolution.resolve(self.delay, &self.resolved).await
    }

    async fn on_human_verification_passed(&self, _client_id: &ClientId) {
        self.passed.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_human_verification_failed(&self, _client_id: &ClientId) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_human_verification_invalid(&self, _client_id: &ClientId) {
        self.invalid.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct RecordingDeviceVerification {
    resolution: Resolution,
    resolved: AtomicBool,
    pub challenges: Mutex<Vec<(SessionId, DeviceChallenge)>>,
}

impl RecordingDeviceVerification {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution, resolved: AtomicBool::new(false), challenges: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl DeviceVerificationListener for RecordingDeviceVerification {
    async fn on_device_verification(
        &self,
        session_id: &SessionId,
        challenge: &DeviceChallenge,
    ) -> ChallengeResult {
        self.challenges.lock().push((session_id.clone(), challenge.clone()));
        self.resolution.resolve(Duration::ZERO, &self.resolved).await
    }
}

pub struct RecordingMissingScope {
    resolution: Resolution,
    resolved: AtomicBool,
    pub requests: Mutex<Vec<(Option<UserId>, MissingScopes)>>,
}

impl RecordingMissingScope {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution, resolved: AtomicBool::new(false), requests: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl MissingScopeListener for RecordingMissingScope {
    async fn on_missing_scope(
        &self,
        user_id: Option<&UserId>,
        scopes: &MissingScopes,
    ) -> ChallengeResult {
        self.requests.lock().push((user_id.cloned(), scopes.clone()));
        self.resolution.resolve(Duration::ZERO, &self.resolved).await
    }
}

#[derive(Default)]
pub struct RecordingConnection {
    pub blocked: Mutex<Vec<(Option<String>, Option<String>, String)>>,
}

#[async_trait]
impl ApiConnectionListener for RecordingConnection {
    async fn on_potentially_blocked(&self, path: Option<&str>, query: Option<&str>, cause: &str) {
        self.blocked.lock().push((
            path.map(str::to_string),
            query.map(str::to_string),
            cause.to_string(),
        ));
    }
}

#[derive(Default)]
pub struct RecordingApiClient {
    pub updates: Mutex<Vec<String>>,
}

#[async_trait]
impl ApiClient for RecordingApiClient {
    async fn force_update(&self, message: &str) {
        self.updates.lock().push(message.to_string());
    }
}
