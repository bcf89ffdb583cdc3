//! Slack adapter
//!
//! Outbound: [`SlackClient`] posts thread replies through `chat.postMessage`.
//! Inbound: [`EventEnvelope`] decodes Events API callbacks and
//! [`verify_signature`] checks the `X-Slack-Signature` header.

use super::ReplySink;
use crate::config::{RetryConfig, SlackConfig};
use crate::error::{Error, Result};
use crate::retry::{IsRetryable, with_retry};
use crate::types::ChatMessage;
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::fmt;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Oldest request timestamp accepted by [`verify_signature`]
pub const MAX_REQUEST_AGE: Duration = Duration::from_secs(5 * 60);

/// Client for the Slack Web API
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackClient {
    /// Create a client from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &SlackConfig, retry: RetryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            retry,
        })
    }

    /// Post `text` into a thread, once
    pub async fn post_message(&self, channel: &str, thread_ts: &str, text: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(&json!({
                "channel": channel,
                "thread_ts": thread_ts,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ApiReply = response.json().await?;
        if reply.ok {
            Ok(())
        } else {
            Err(Error::Chat(
                reply.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }
}

/// A failed `chat.postMessage`
///
/// Posting is not idempotent: a timed out or 5xx request may still have landed
/// in the thread. Only failures where Slack cannot have posted are retried.
#[derive(Debug)]
struct PostFailure(Error);

impl IsRetryable for PostFailure {
    fn is_retryable(&self) -> bool {
        match &self.0 {
            Error::Network(e) => {
                e.is_connect() || e.status().is_some_and(|s| s.as_u16() == 429)
            }
            Error::Remote { status, .. } => *status == 429,
            Error::Chat(code) => code == "ratelimited",
            _ => false,
        }
    }
}

impl fmt::Display for PostFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[async_trait]
impl ReplySink for SlackClient {
    async fn reply(&self, text: &str, channel_id: &str, thread_id: &str) -> Result<()> {
        with_retry(&self.retry, || async move {
            self.post_message(channel_id, thread_id, text)
                .await
                .map_err(PostFailure)
        })
        .await
        .map_err(|PostFailure(e)| e)
    }
}

/// Events API request body
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    /// Endpoint ownership check sent when the request URL is configured
    UrlVerification {
        /// Value to echo back
        challenge: String,
    },
    /// A subscribed event
    EventCallback {
        /// The event itself
        event: MessageEvent,
        /// Workspace-unique id, identical across redeliveries
        #[serde(default)]
        event_id: Option<String>,
    },
    /// Anything else (app rate limiting notices, ...)
    #[serde(other)]
    Unsupported,
}

/// The fields of a Slack event used by the relay
#[derive(Debug, Default, Deserialize)]
pub struct MessageEvent {
    /// Event type, `message` for channel messages
    #[serde(rename = "type")]
    pub kind: String,
    /// Set for edits, joins, bot posts and other non-plain messages
    #[serde(default)]
    pub subtype: Option<String>,
    /// Set when a bot (including this one) posted the message
    #[serde(default)]
    pub bot_id: Option<String>,
    /// Message text, with links in `<url|label>` markup
    #[serde(default)]
    pub text: Option<String>,
    /// Channel id
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp, which doubles as its id
    #[serde(default)]
    pub ts: Option<String>,
    /// Parent message timestamp when posted inside a thread
    #[serde(default)]
    pub thread_ts: Option<String>,
}

impl MessageEvent {
    /// Convert a plain user message into a [`ChatMessage`]
    ///
    /// Replies go to the enclosing thread, or start one on the message itself.
    pub fn into_chat_message(self) -> Option<ChatMessage> {
        if self.kind != "message" || self.subtype.is_some() || self.bot_id.is_some() {
            return None;
        }
        let channel_id = self.channel.filter(|c| !c.is_empty())?;
        let ts = self.ts.filter(|t| !t.is_empty())?;
        let thread_id = self.thread_ts.filter(|t| !t.is_empty()).unwrap_or(ts);

        Some(ChatMessage {
            text: self.text.unwrap_or_default(),
            channel_id,
            thread_id,
        })
    }
}

/// Check a request signature against the signing secret
///
/// `signature` is the `X-Slack-Signature` header (`v0=<hex>`), computed as
/// HMAC-SHA256 over `v0:{timestamp}:{body}`. Requests whose timestamp is more
/// than [`MAX_REQUEST_AGE`] away from `now_secs` are rejected.
pub fn verify_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now_secs: u64,
) -> bool {
    let Ok(ts) = timestamp.trim().parse::<u64>() else {
        return false;
    };
    if now_secs.abs_diff(ts) > MAX_REQUEST_AGE.as_secs() {
        return false;
    }

    let Some(expected) = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
    else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(signing_secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("v0:{}:", timestamp).as_bytes());
    mac.update(body);
    // Constant-time comparison
    mac.verify_slice(&expected).is_ok()
}

/// Compute the `X-Slack-Signature` value for a request
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|e| Error::Other(format!("invalid signing secret: {}", e)))?;
    mac.update(format!("v0:{}:", timestamp).as_bytes());
    mac.update(body);
    Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}
