//! Example: Fetching the current user through the resilient pipeline
//!
//! Loads configuration (environment first, then `callguard.toml`), installs
//! logging, stores a session and issues one call with caller-layer retry.
//!
//! # Setup
//!
//! ```bash
//! export CALLGUARD_BASE_URL=https://mail.example.test/api/
//! export CALLGUARD_UID=... CALLGUARD_ACCESS_TOKEN=... CALLGUARD_REFRESH_TOKEN=...
//! cargo run -p callguard-infra --example fetch_user
//! ```

use std::sync::Arc;

use callguard_core::ApiCall;
use callguard_domain::{Session, SessionId, UserId};
use callguard_infra::{config, HttpApi, PipelineContext};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let context = PipelineContext::new(config::load()?)?;
    context.init_logging()?;

    let session_id = SessionId::new(std::env::var("CALLGUARD_UID")?);
    context.sessions.insert(
        Session::unauthenticated(
            session_id.clone(),
            std::env::var("CALLGUARD_ACCESS_TOKEN")?,
            std::env::var("CALLGUARD_REFRESH_TOKEN")?,
            vec![],
        )
        .with_user(UserId::new("example-user")),
    );

    let invoker = context.retrying(Some(session_id))?;
    let call = ApiCall::new("get_user", |api: Arc<HttpApi>| async move {
        api.get::<serde_json::Value>("core/v4/users").await
    });

    match invoker.invoke(&call).await {
        Ok(user) => tracing::info!(%user, "fetched user"),
        Err(error) => tracing::error!(%error, "request failed"),
    }
    Ok(())
}
