//! JSON request and response bodies of the PikPak user and drive APIs.

use crate::types::{FileId, JobId, TaskStatus};
use serde::{Deserialize, Serialize};

/// `POST /v1/auth/signin`
#[derive(Debug, Serialize)]
pub(crate) struct SigninRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /v1/auth/token`
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
}

/// Token pair returned by signin and refresh
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Error body shared by both APIs
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorBody {
    /// Human-readable message from an error response body, falling back to the raw text
    pub(crate) fn message_from(body: &[u8]) -> String {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        parsed
            .error_description
            .filter(|s| !s.is_empty())
            .or(parsed.error.filter(|s| !s.is_empty()))
            .unwrap_or_else(|| {
                let raw = String::from_utf8_lossy(body);
                raw.chars().take(200).collect()
            })
    }
}

/// A drive entry (file or folder)
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct FileEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub trashed: bool,
}

/// `GET /drive/v1/files`
#[derive(Debug, Deserialize)]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// An offline task as reported by submission and by the task listing
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct TaskEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phase: String,
    /// Older listings report the phase here
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TaskEntry {
    pub(crate) fn into_status(self) -> TaskStatus {
        let name = non_empty(self.file_name).or(non_empty(Some(self.name)));
        TaskStatus {
            id: JobId(self.id),
            phase: non_empty(Some(self.phase))
                .or(non_empty(self.status))
                .unwrap_or_default(),
            file_id: non_empty(self.file_id).map(FileId),
            name,
            message: non_empty(self.message),
        }
    }
}

/// `GET /drive/v1/tasks`
#[derive(Debug, Deserialize)]
pub(crate) struct TaskList {
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// `POST /drive/v1/files` response, for both folder creation and URL submission
///
/// The service fills `file`, `task`, or both (with `file` sometimes `null`).
#[derive(Debug, Deserialize)]
pub(crate) struct CreateFileResponse {
    #[serde(default)]
    pub file: Option<FileEntry>,
    #[serde(default)]
    pub task: Option<TaskEntry>,
}

/// Decoded submission reply
#[derive(Debug)]
pub(crate) enum SubmitReply {
    /// The file already exists on the drive
    Stored(FileEntry),
    /// An offline task was queued
    Queued(TaskEntry),
}

impl CreateFileResponse {
    /// Decode by field priority: a stored `file` wins over a `task`
    pub(crate) fn into_submit_reply(self) -> Option<SubmitReply> {
        match (self.file, self.task) {
            (Some(file), _) if !file.id.is_empty() => Some(SubmitReply::Stored(file)),
            (_, Some(task)) if !task.id.is_empty() => Some(SubmitReply::Queued(task)),
            _ => None,
        }
    }
}

/// `POST /drive/v1/share`
#[derive(Debug, Serialize)]
pub(crate) struct ShareRequest<'a> {
    pub file_ids: [&'a str; 1],
    pub share_to: &'static str,
    pub expiration_days: i32,
    pub pass_code_option: &'static str,
}

/// Share reply; the URL field name has changed across API versions
#[derive(Debug, Deserialize)]
pub(crate) struct ShareResponse {
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default)]
    pub share_link: Option<String>,
}

impl ShareResponse {
    /// First non-empty URL in field priority order
    pub(crate) fn url(self) -> Option<String> {
        non_empty(self.share_url).or(non_empty(self.share_link))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
