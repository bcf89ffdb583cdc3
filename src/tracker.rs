//! Completion tracking for submitted offline downloads
//!
//! A job moves `Pending → Complete | Failed | TimedOut`. Jobs that already carry
//! a file id are complete without polling. Otherwise the task listing is fetched
//! every `poll_interval` until the job's phase is terminal or the accumulated
//! wait reaches `max_wait`. A failed fetch is one [`PollCycle::Transient`]
//! cycle: it is logged, counts against the budget, and the loop continues.

use crate::config::TrackingConfig;
use crate::error::Error;
use crate::service::OfflineService;
use crate::types::{DownloadJob, JobOutcome, TaskStatus, link_display_name};
use std::time::Duration;

/// Result of one poll cycle
#[derive(Debug)]
pub enum PollCycle {
    /// The job reached a terminal state
    Terminal(JobOutcome),
    /// No match or an inconclusive phase; carries a newer name if one was seen
    Pending(Option<String>),
    /// The task listing could not be fetched this cycle
    Transient(Error),
}

/// True when a phase/status text signals completion
pub fn phase_is_complete(phase: &str) -> bool {
    phase.to_ascii_uppercase().contains("COMPLETE")
}

/// True when a phase/status text signals an error
pub fn phase_is_failed(phase: &str) -> bool {
    let phase = phase.to_ascii_uppercase();
    phase.contains("ERROR") || phase.contains("FAIL")
}

/// Classify a task entry; `None` while it is still running
///
/// A completed entry without a file id is inconclusive: there is nothing to share yet.
pub fn classify(task: &TaskStatus, fallback_name: &str) -> Option<JobOutcome> {
    let name = task
        .name
        .clone()
        .unwrap_or_else(|| fallback_name.to_string());

    if phase_is_failed(&task.phase) {
        let error = task
            .message
            .clone()
            .unwrap_or_else(|| task.phase.clone());
        return Some(JobOutcome::Failed { name, error });
    }

    if phase_is_complete(&task.phase) {
        return task.file_id.clone().map(|file_id| JobOutcome::Complete { file_id, name });
    }

    None
}

/// Interpret one task-list fetch for `job`
pub fn poll_cycle(
    listing: crate::error::Result<Vec<TaskStatus>>,
    job: &DownloadJob,
    fallback_name: &str,
) -> PollCycle {
    let tasks = match listing {
        Ok(tasks) => tasks,
        Err(e) => return PollCycle::Transient(e),
    };

    match tasks.iter().find(|t| t.id == job.job_id) {
        Some(task) => match classify(task, fallback_name) {
            Some(outcome) => PollCycle::Terminal(outcome),
            None => PollCycle::Pending(task.name.clone()),
        },
        None => PollCycle::Pending(None),
    }
}

/// Bounded poller for offline jobs
#[derive(Clone, Debug)]
pub struct CompletionTracker {
    poll_interval: Duration,
    max_wait: Duration,
}

impl CompletionTracker {
    /// Create a tracker with explicit timings
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait,
        }
    }

    /// Create a tracker from configuration
    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.poll_interval, config.max_wait)
    }

    /// Delay between polls
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Total tracking budget per job
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Track `job` until it is terminal or the budget is spent
    ///
    /// Suspends on a tokio timer between polls; other tasks keep running.
    pub async fn track(&self, service: &dyn OfflineService, job: &DownloadJob) -> JobOutcome {
        let mut name = if job.display_name.is_empty() {
            link_display_name(&job.link)
        } else {
            job.display_name.clone()
        };

        if let Some(file_id) = &job.file_id {
            return JobOutcome::Complete {
                file_id: file_id.clone(),
                name,
            };
        }

        let mut elapsed = Duration::ZERO;
        let mut polls: u32 = 0;

        loop {
            tokio::time::sleep(self.poll_interval).await;
            elapsed += self.poll_interval;
            polls += 1;

            match poll_cycle(service.list_tasks().await, job, &name) {
                PollCycle::Terminal(outcome) => {
                    tracing::info!(
                        job_id = %job.job_id,
                        polls,
                        elapsed_secs = elapsed.as_secs_f64(),
                        terminal = ?outcome,
                        "offline job finished"
                    );
                    return outcome;
                }
                PollCycle::Pending(latest_name) => {
                    if let Some(latest) = latest_name.filter(|n| !n.is_empty()) {
                        name = latest;
                    }
                    tracing::debug!(job_id = %job.job_id, polls, "offline job still pending");
                }
                PollCycle::Transient(e) => {
                    tracing::warn!(
                        job_id = %job.job_id,
                        polls,
                        error = %e,
                        "task listing failed, will poll again"
                    );
                }
            }

            if elapsed >= self.max_wait {
                tracing::info!(
                    job_id = %job.job_id,
                    polls,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "gave up tracking offline job"
                );
                return JobOutcome::TimedOut { name };
            }
        }
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::from_config(&TrackingConfig::default())
    }
}
