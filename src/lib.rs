//! # pikpak-relay
//!
//! Chat-to-cloud offline download relay. Links posted in a Slack channel
//! (magnet, ed2k, http/https) are submitted as offline downloads to a PikPak
//! drive, tracked until they finish, and answered in the message's thread with
//! one line per link: a public share link, a pending notice, or the error.
//!
//! ## Architecture
//!
//! - [`pikpak`] - drive client: session, folder resolution, submission, sharing
//! - [`tracker`] - bounded completion polling
//! - [`relay`] - per-message orchestration and report rendering
//! - [`chat`] - reply sink and the Slack adapter
//! - [`api`] - Slack Events API endpoint
//!
//! ## Quick Start
//!
//! ```no_run
//! use pikpak_relay::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!
//!     // Logs in, serves the events endpoint, stops on SIGINT/SIGTERM
//!     pikpak_relay::run(config).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Slack events server
pub mod api;
/// Chat transport
pub mod chat;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Link extraction
pub mod extract;
/// PikPak drive client
pub mod pikpak;
/// Message relay and report rendering
pub mod relay;
/// Retry logic with exponential backoff
pub mod retry;
/// Offline service abstraction
pub mod service;
/// Completion tracking
pub mod tracker;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use chat::{ReplySink, SlackClient};
pub use config::Config;
pub use error::{
    ApiError, AuthError, Error, ErrorDetail, ResolutionError, Result, SubmissionError,
    ToHttpStatus,
};
pub use extract::LinkExtractor;
pub use pikpak::PikPakClient;
pub use relay::{LinkReport, Relay};
pub use service::OfflineService;
pub use tracker::CompletionTracker;
pub use types::{
    ChatMessage, DownloadJob, Event, FileId, FolderId, FolderPath, JobId, JobOutcome, TaskStatus,
};

use std::sync::Arc;

/// Run the relay until a termination signal arrives
///
/// Logs in to PikPak (retrying transient failures), then serves the Slack
/// events endpoint. A login that still fails is returned as an error so the
/// binary exits non-zero.
///
/// # Errors
/// Login failure, an unusable configuration, or the listener failing to bind.
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let client = Arc::new(PikPakClient::new(&config.pikpak)?);
    retry::with_retry(&config.retry, || client.login()).await?;
    tracing::info!(
        offline_path = %client.offline_path(),
        link_concurrency = config.relay.link_concurrency,
        "relay ready"
    );

    let relay = Arc::new(Relay::new(client, &config));
    let sink = Arc::new(SlackClient::new(&config.slack, config.retry.clone())?);

    let mut events = relay.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(?event, "relay event");
        }
    });

    let state = api::AppState::new(relay, sink);
    api::start_server(state, &config, shutdown_signal()).await
}

/// Resolves on SIGTERM or Ctrl+C
///
/// Where SIGTERM cannot be registered only Ctrl+C ends the relay.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("interrupted, shutting down"),
        _ = terminate => tracing::info!("terminated, shutting down"),
    }
}
