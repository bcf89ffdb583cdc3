//! Slack Events API handler

use crate::api::AppState;
use crate::chat::slack::EventEnvelope;
use crate::error::Error;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Header Slack sets when redelivering an event it considers unacknowledged
///
/// A redelivery may be the only copy that reached us, so it is relayed unless
/// its `event_id` was already accepted.
pub const RETRY_NUM_HEADER: &str = "x-slack-retry-num";

/// POST /slack/events - Slack Events API callback
///
/// Answers `url_verification` challenges. Plain user messages are handed to the
/// relay on a background task so Slack gets its acknowledgment within its
/// three second window; the relay replies into the thread on its own. Events
/// whose `event_id` was already accepted are acknowledged and skipped.
pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => return Error::Serialization(e).into_response(),
    };

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        EventEnvelope::EventCallback { event, event_id } => {
            if let Some(id) = event_id.as_deref() {
                if !state.seen.insert(id) {
                    tracing::debug!(
                        event_id = id,
                        retry = ?headers.get(RETRY_NUM_HEADER),
                        "dropping redelivered Slack event"
                    );
                    return StatusCode::OK.into_response();
                }
            }
            if let Some(message) = event.into_chat_message() {
                let relay = state.relay.clone();
                let sink = state.sink.clone();
                tokio::spawn(async move {
                    if let Err(e) = relay.handle_message(&message, sink.as_ref()).await {
                        tracing::error!(
                            channel = %message.channel_id,
                            thread = %message.thread_id,
                            error = %e,
                            "failed to deliver report"
                        );
                    }
                });
            }
            StatusCode::OK.into_response()
        }
        EventEnvelope::Unsupported => StatusCode::OK.into_response(),
    }
}
