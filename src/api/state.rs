//! Application state for the events server

use crate::chat::ReplySink;
use crate::relay::Relay;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

/// Number of Slack event ids remembered for redelivery detection
pub const SEEN_EVENTS_CAPACITY: usize = 1024;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clones).
#[derive(Clone)]
pub struct AppState {
    /// Processes messages that carry links
    pub relay: Arc<Relay>,

    /// Where acknowledgments and reports are posted
    pub sink: Arc<dyn ReplySink>,

    /// Event ids already handed to the relay
    pub seen: Arc<SeenEvents>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(relay: Arc<Relay>, sink: Arc<dyn ReplySink>) -> Self {
        Self {
            relay,
            sink,
            seen: Arc::new(SeenEvents::new(SEEN_EVENTS_CAPACITY)),
        }
    }
}

/// Bounded set of recently accepted event ids, oldest evicted first
#[derive(Debug)]
pub struct SeenEvents {
    capacity: usize,
    inner: Mutex<SeenInner>,
}

#[derive(Debug, Default)]
struct SeenInner {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenEvents {
    /// Remember at most `capacity` ids
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(SeenInner::default()),
        }
    }

    /// Record `event_id`; returns `false` if it was already recorded
    pub fn insert(&self, event_id: &str) -> bool {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if inner.ids.contains(event_id) {
            return false;
        }

        if inner.order.len() >= self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.ids.remove(&oldest);
            }
        }
        inner.order.push_back(event_id.to_string());
        inner.ids.insert(event_id.to_string());
        true
    }
}
