//! Core types for pikpak-relay

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum characters of a link used as a display name fallback
pub const NAME_FALLBACK_CHARS: usize = 80;

/// Slash-delimited destination folder, parsed once from configuration
///
/// Empty segments are dropped, so `"/a//b/"` and `"a/b"` are the same path.
/// The empty path designates the drive root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FolderPath(Vec<String>);

impl FolderPath {
    /// Parse a slash-delimited path
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('/')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Path segments, outermost first
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True when the path designates the drive root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for FolderPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<FolderPath> for String {
    fn from(path: FolderPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// Opaque folder handle issued by the drive; the root is the empty string
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(pub String);

impl FolderId {
    /// The drive root
    pub fn root() -> Self {
        Self(String::new())
    }

    /// True for the drive root
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Offline task identifier
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a stored file
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A submitted offline download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Remote task id (empty when the service completed synchronously without a task)
    pub job_id: JobId,
    /// Resulting file, known immediately only for synchronous completions
    pub file_id: Option<FileId>,
    /// Name reported by the service at submission time
    pub display_name: String,
    /// The link this job was created from
    pub link: String,
}

impl DownloadJob {
    /// True when the service already produced the file at submission time
    pub fn is_complete(&self) -> bool {
        self.file_id.is_some()
    }
}

/// Snapshot of one remote offline task from the task listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskStatus {
    /// Task id
    pub id: JobId,
    /// Phase/status text, e.g. "PHASE_TYPE_RUNNING"
    pub phase: String,
    /// Resulting file, if the service already assigned one
    pub file_id: Option<FileId>,
    /// Best available name (file name, then task name)
    pub name: Option<String>,
    /// Error or progress message
    pub message: Option<String>,
}

/// Final state of a tracked job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The file is stored on the drive
    Complete {
        /// Resulting file
        file_id: FileId,
        /// Resolved file name
        name: String,
    },
    /// The service reported an error, or the job never got submitted
    Failed {
        /// Best available name
        name: String,
        /// Error text shown to the user
        error: String,
    },
    /// Tracking gave up; the remote job may still finish later
    TimedOut {
        /// Best available name
        name: String,
    },
}

impl JobOutcome {
    /// Name carried by the outcome
    pub fn name(&self) -> &str {
        match self {
            JobOutcome::Complete { name, .. }
            | JobOutcome::Failed { name, .. }
            | JobOutcome::TimedOut { name } => name,
        }
    }

    /// Complete and Failed are terminal; TimedOut is a local give-up
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobOutcome::TimedOut { .. })
    }
}

/// Inbound chat message handed to the relay
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    /// Raw message text
    pub text: String,
    /// Channel the message was posted in
    pub channel_id: String,
    /// Thread to reply into (the message itself when it starts a thread)
    pub thread_id: String,
}

/// Lifecycle event broadcast to subscribers
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A link was accepted by the drive
    JobSubmitted {
        /// Source link
        link: String,
        /// Remote task id
        job_id: JobId,
        /// Name reported at submission
        name: String,
    },

    /// The file is stored on the drive
    JobCompleted {
        /// Source link
        link: String,
        /// Resulting file
        file_id: FileId,
        /// Resolved name
        name: String,
    },

    /// The job failed or could not be submitted
    JobFailed {
        /// Source link
        link: String,
        /// Error text
        error: String,
    },

    /// Tracking gave up before the job finished
    JobTimedOut {
        /// Source link
        link: String,
        /// Remote task id
        job_id: JobId,
    },
}

/// Short display name for a link: its first characters
pub fn link_display_name(link: &str) -> String {
    link.chars().take(NAME_FALLBACK_CHARS).collect()
}
