//! Chat transport
//!
//! Inbound messages arrive as [`ChatMessage`](crate::types::ChatMessage); replies
//! leave through a [`ReplySink`]. [`slack`] implements both sides for Slack.

pub mod slack;

pub use slack::SlackClient;

use crate::error::Result;
use async_trait::async_trait;

/// Delivers text into a chat thread
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Post `text` into `thread_id` of `channel_id`
    async fn reply(&self, text: &str, channel_id: &str, thread_id: &str) -> Result<()>;
}
