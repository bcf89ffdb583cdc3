//! Offline download submission and task listing.

use super::wire::{CreateFileResponse, SubmitReply, TaskList};
use super::{FILE_KIND, MAX_PAGES, PAGE_LIMIT, PikPakClient};
use crate::error::{Error, Result, SubmissionError};
use crate::tracker::phase_is_complete;
use crate::types::{DownloadJob, FileId, FolderId, JobId, TaskStatus, link_display_name};
use reqwest::Method;
use serde_json::json;

const TASK_PHASE_FILTER: &str = r#"{"phase":{"in":"PHASE_TYPE_RUNNING,PHASE_TYPE_ERROR,PHASE_TYPE_COMPLETE,PHASE_TYPE_PENDING"}}"#;

impl PikPakClient {
    /// Submit `link` as an offline download
    ///
    /// Without a destination the drive's default download folder is used. The
    /// returned job already carries a file id when the drive had the content
    /// stored and completed the request synchronously.
    ///
    /// # Errors
    /// [`Error::Submission`] wrapping the network, auth or validation failure.
    pub async fn submit(&self, link: &str, destination: Option<&FolderId>) -> Result<DownloadJob> {
        let folder_type = match destination {
            Some(_) => "",
            None => "DOWNLOAD",
        };
        let mut body = json!({
            "kind": FILE_KIND,
            "name": "",
            "upload_type": "UPLOAD_TYPE_URL",
            "url": { "url": link },
            "folder_type": folder_type,
        });
        if let Some(parent) = destination {
            body["parent_id"] = json!(parent.as_str());
        }

        let reply: CreateFileResponse = self
            .session
            .authorized_request(Method::POST, &self.drive_url("files"), &[], Some(&body))
            .await
            .map_err(|cause| submission_error(link, cause))?;

        let job = match reply.into_submit_reply() {
            Some(SubmitReply::Stored(file)) => DownloadJob {
                job_id: JobId::default(),
                display_name: non_empty_or_link(file.name, link),
                file_id: Some(FileId(file.id)),
                link: link.to_string(),
            },
            Some(SubmitReply::Queued(task)) => {
                let status = task.into_status();
                let file_id = status
                    .file_id
                    .filter(|_| phase_is_complete(&status.phase));
                DownloadJob {
                    job_id: status.id,
                    file_id,
                    display_name: non_empty_or_link(status.name.unwrap_or_default(), link),
                    link: link.to_string(),
                }
            }
            None => {
                return Err(submission_error(
                    link,
                    Error::Other("response carried neither a file nor a task".to_string()),
                ));
            }
        };

        tracing::info!(
            link,
            job_id = %job.job_id,
            name = %job.display_name,
            complete = job.is_complete(),
            "submitted offline download"
        );
        Ok(job)
    }

    /// All offline tasks currently known to the drive
    pub async fn list_tasks(&self) -> Result<Vec<TaskStatus>> {
        let url = self.drive_url("tasks");
        let mut tasks = Vec::new();
        let mut page_token = String::new();

        for _ in 0..MAX_PAGES {
            let query = [
                ("type", "offline".to_string()),
                ("filters", TASK_PHASE_FILTER.to_string()),
                ("page_token", page_token.clone()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            let page: TaskList = self
                .session
                .authorized_request(Method::GET, &url, &query, None)
                .await?;

            tasks.extend(page.tasks.into_iter().map(|t| t.into_status()));

            match page.next_page_token {
                Some(next) if !next.is_empty() && next != page_token => page_token = next,
                _ => break,
            }
        }

        Ok(tasks)
    }
}

fn submission_error(link: &str, cause: Error) -> Error {
    SubmissionError {
        link: link.to_string(),
        cause: Box::new(cause),
    }
    .into()
}

fn non_empty_or_link(name: String, link: &str) -> String {
    if name.trim().is_empty() {
        link_display_name(link)
    } else {
        name
    }
}
