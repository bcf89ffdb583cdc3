//! Message relay
//!
//! [`Relay`] turns one chat message into one consolidated report: links are
//! extracted, acknowledged, pushed through the offline service (resolve →
//! submit → track → share) and rendered one line per link, in extraction order.
//! A failure on one link becomes a failed line for that link only.

pub mod report;

pub use report::{LinkReport, acknowledgment, render_line, render_report};

use crate::chat::ReplySink;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::LinkExtractor;
use crate::service::OfflineService;
use crate::tracker::CompletionTracker;
use crate::types::{ChatMessage, DownloadJob, Event, JobOutcome};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

/// Key of a conversation thread: (channel id, thread id)
type ThreadKey = (String, String);

/// Orchestrates link processing for incoming chat messages
pub struct Relay {
    service: Arc<dyn OfflineService>,
    tracker: CompletionTracker,
    extractor: LinkExtractor,
    link_concurrency: usize,
    event_tx: broadcast::Sender<Event>,
    /// One lock per active thread so ack and report of two messages never interleave
    thread_locks: std::sync::Mutex<HashMap<ThreadKey, Arc<Mutex<()>>>>,
}

impl Relay {
    /// Build a relay over `service` using the tracking, relay and Slack sections of `config`
    pub fn new(service: Arc<dyn OfflineService>, config: &Config) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        Self {
            service,
            tracker: CompletionTracker::from_config(&config.tracking),
            extractor: LinkExtractor::new(&config.slack.ignored_hosts),
            link_concurrency: config.relay.link_concurrency.max(1),
            event_tx,
            thread_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to job lifecycle events
    ///
    /// A subscriber that falls more than 1000 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The extractor used for incoming messages
    pub fn extractor(&self) -> &LinkExtractor {
        &self.extractor
    }

    /// Handle one chat message, replying into its thread
    ///
    /// Messages without links are ignored: no remote call and no reply. Returns the
    /// number of links processed.
    ///
    /// # Errors
    /// Only a failure to deliver the final report is returned; per-link failures
    /// are part of the report.
    pub async fn handle_message(&self, message: &ChatMessage, sink: &dyn ReplySink) -> Result<usize> {
        let links = self.extractor.extract(&message.text);
        if links.is_empty() {
            return Ok(0);
        }

        let key = (message.channel_id.clone(), message.thread_id.clone());
        let thread_lock = self.thread_lock(&key);
        let guard = thread_lock.lock().await;

        tracing::info!(
            channel = %message.channel_id,
            thread = %message.thread_id,
            links = links.len(),
            "processing chat message"
        );

        if let Err(e) = sink
            .reply(&acknowledgment(links.len()), &message.channel_id, &message.thread_id)
            .await
        {
            tracing::warn!(channel = %message.channel_id, error = %e, "acknowledgment not delivered");
        }

        let reports = self.process_links(&links).await;
        let delivered = sink
            .reply(&render_report(&reports), &message.channel_id, &message.thread_id)
            .await;

        drop(guard);
        self.release_thread_lock(&key, thread_lock);

        delivered.map(|()| reports.len())
    }

    /// Process `links` into one report each, in the same order
    pub async fn process_links(&self, links: &[String]) -> Vec<LinkReport> {
        stream::iter(links.iter().cloned())
            .map(|link| async move { self.guarded_process_link(&link).await })
            .buffered(self.link_concurrency)
            .collect()
            .await
    }

    async fn guarded_process_link(&self, link: &str) -> LinkReport {
        match AssertUnwindSafe(self.process_link(link)).catch_unwind().await {
            Ok(report) => report,
            Err(_) => {
                tracing::error!(link, "link processing panicked");
                self.emit_event(Event::JobFailed {
                    link: link.to_string(),
                    error: "internal error".to_string(),
                });
                LinkReport::failed(link, "internal error")
            }
        }
    }

    async fn process_link(&self, link: &str) -> LinkReport {
        let job = match self.submit_link(link).await {
            Ok(job) => job,
            Err(e) => {
                let error = failure_text(&e);
                tracing::warn!(link, error = %e, "link failed before tracking");
                self.emit_event(Event::JobFailed {
                    link: link.to_string(),
                    error: error.clone(),
                });
                return LinkReport::failed(link, error);
            }
        };

        self.emit_event(Event::JobSubmitted {
            link: link.to_string(),
            job_id: job.job_id.clone(),
            name: job.display_name.clone(),
        });

        let outcome = self.tracker.track(self.service.as_ref(), &job).await;
        let share_url = match &outcome {
            JobOutcome::Complete { file_id, .. } => self.service.share_link(file_id).await,
            _ => None,
        };

        self.emit_event(match &outcome {
            JobOutcome::Complete { file_id, name } => Event::JobCompleted {
                link: link.to_string(),
                file_id: file_id.clone(),
                name: name.clone(),
            },
            JobOutcome::Failed { error, .. } => Event::JobFailed {
                link: link.to_string(),
                error: error.clone(),
            },
            JobOutcome::TimedOut { .. } => Event::JobTimedOut {
                link: link.to_string(),
                job_id: job.job_id.clone(),
            },
        });

        LinkReport {
            link: link.to_string(),
            outcome,
            share_url,
        }
    }

    async fn submit_link(&self, link: &str) -> Result<DownloadJob> {
        let destination = self.service.resolve_destination().await?;
        self.service.submit(link, destination.as_ref()).await
    }

    fn emit_event(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    fn thread_lock(&self, key: &ThreadKey) -> Arc<Mutex<()>> {
        let mut locks = self
            .thread_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    fn release_thread_lock(&self, key: &ThreadKey, lock: Arc<Mutex<()>>) {
        let mut locks = self
            .thread_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // The map and `lock` are the only holders: nobody else is waiting on this thread
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn active_threads(&self) -> usize {
        self.thread_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Error text shown on a failed line
fn failure_text(error: &Error) -> String {
    match error {
        Error::Submission(e) => e.cause.to_string(),
        other => other.to_string(),
    }
}
