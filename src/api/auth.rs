//! Request signature middleware for the Slack events endpoint
//!
//! Slack signs every request with the app's signing secret. Requests with a
//! missing, stale or mismatching `X-Slack-Signature` are answered with
//! 401 Unauthorized and never reach the handler.

use crate::chat::slack::verify_signature;
use crate::error::ApiError;
use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Largest request body accepted for signature verification
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "x-slack-signature";
/// Header carrying the signing timestamp (Unix seconds)
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Middleware that rejects requests not signed with `signing_secret`
///
/// The body is buffered to compute the signature and handed on unchanged.
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware};
/// use pikpak_relay::api::auth::verify_slack_signature;
/// use std::sync::Arc;
///
/// let secret: Arc<str> = Arc::from("signing-secret");
/// let router: Router = Router::new()
///     .layer(middleware::from_fn_with_state(secret, verify_slack_signature));
/// ```
pub async fn verify_slack_signature(
    State(signing_secret): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let (Some(signature), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER))
    else {
        return unauthorized_response("Missing Slack signature headers");
    };

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(ApiError::bad_request("Request body too large")),
            )
                .into_response();
        }
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    if !verify_signature(&signing_secret, &timestamp, &bytes, &signature, now) {
        tracing::warn!(path = %parts.uri.path(), "rejected request with invalid Slack signature");
        return unauthorized_response("Invalid Slack signature");
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn unauthorized_response(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(message))).into_response()
}
