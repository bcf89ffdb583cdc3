//! Events server
//!
//! Receives Slack Events API callbacks and hands link-bearing messages to the
//! [`Relay`](crate::relay::Relay).
//!
//! # Routes
//!
//! - `POST /slack/events` - Slack Events API callback (signature verified)
//! - `GET /health` - Health check

use crate::config::Config;
use crate::error::{Error, Result};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error_response;
pub mod routes;
pub mod state;

pub use state::AppState;

/// Create the router
///
/// Only `/slack/events` sits behind signature verification; `/health` stays
/// open for load balancers.
pub fn create_router(state: AppState, signing_secret: &str) -> Router {
    let signing_secret: Arc<str> = Arc::from(signing_secret);

    let slack = Router::new()
        .route("/slack/events", post(routes::slack_events))
        .route_layer(middleware::from_fn_with_state(
            signing_secret,
            auth::verify_slack_signature,
        ));

    Router::new()
        .route("/health", get(routes::health_check))
        .merge(slack)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the events endpoint on the configured bind address until `shutdown` resolves
///
/// # Example
///
/// ```no_run
/// use pikpak_relay::api::{AppState, start_server};
/// use pikpak_relay::Config;
///
/// # async fn example(state: AppState) -> pikpak_relay::Result<()> {
/// let config = Config::default();
/// start_server(state, &config, pikpak_relay::shutdown_signal()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_server<F>(state: AppState, config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.bind_address;
    let app = create_router(state, &config.slack.signing_secret);

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;

    tracing::info!(address = %bind_address, "events server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(Error::Io)?;

    tracing::info!("events server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
