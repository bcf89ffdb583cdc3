//! Route handlers for the events server
//!
//! - [`events`] - Slack Events API callbacks
//! - [`system`] - Health check

mod events;
mod system;

pub use events::*;
pub use system::*;
