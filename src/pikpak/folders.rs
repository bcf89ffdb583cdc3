//! Destination folder resolution.
//!
//! Walks a [`FolderPath`] from the drive root, descending into an existing
//! child folder with the segment's name or creating it. A failure on any
//! segment aborts the walk; downloading into a partially resolved parent is
//! never attempted.

use super::wire::{CreateFileResponse, FileEntry, FileList};
use super::{FOLDER_KIND, MAX_PAGES, PAGE_LIMIT, PikPakClient};
use crate::error::{Error, ResolutionError, Result};
use crate::types::{FolderId, FolderPath};
use reqwest::Method;
use serde_json::json;

const FOLDER_FILTER: &str = r#"{"trashed":{"eq":false},"kind":{"eq":"drive#folder"}}"#;

impl PikPakClient {
    /// Resolve `path` to a folder id, creating missing segments
    ///
    /// The root path resolves to [`FolderId::root`] without any request.
    ///
    /// # Errors
    /// [`Error::Resolution`] naming the segment whose listing or creation failed.
    pub async fn resolve_folder(&self, path: &FolderPath) -> Result<FolderId> {
        if path.is_root() {
            return Ok(FolderId::root());
        }

        let _guard = self.folder_lock.lock().await;
        let mut current = FolderId::root();
        for segment in path.segments() {
            current = self
                .child_folder(&current, segment)
                .await
                .map_err(|cause| ResolutionError {
                    segment: segment.clone(),
                    cause: Box::new(cause),
                })?;
        }

        tracing::debug!(path = %path, folder_id = %current, "resolved destination folder");
        Ok(current)
    }

    /// Non-trashed child folders of `parent`
    pub async fn list_folders(&self, parent: &FolderId) -> Result<Vec<(FolderId, String)>> {
        let url = self.drive_url("files");
        let mut folders = Vec::new();
        let mut page_token = String::new();

        for _ in 0..MAX_PAGES {
            let query = [
                ("parent_id", parent.as_str().to_string()),
                ("filters", FOLDER_FILTER.to_string()),
                ("page_token", page_token.clone()),
                ("limit", PAGE_LIMIT.to_string()),
            ];
            let page: FileList = self
                .session
                .authorized_request(Method::GET, &url, &query, None)
                .await?;

            folders.extend(
                page.files
                    .into_iter()
                    .filter(is_live_folder)
                    .map(|f| (FolderId(f.id), f.name)),
            );

            match page.next_page_token {
                Some(next) if !next.is_empty() && next != page_token => page_token = next,
                _ => break,
            }
        }

        Ok(folders)
    }

    /// Create a folder named `name` under `parent`
    pub async fn create_folder(&self, parent: &FolderId, name: &str) -> Result<FolderId> {
        let body = json!({
            "kind": FOLDER_KIND,
            "name": name,
            "parent_id": parent.as_str(),
        });
        let created: CreateFileResponse = self
            .session
            .authorized_request(Method::POST, &self.drive_url("files"), &[], Some(&body))
            .await?;

        let id = created
            .file
            .map(|f| f.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Other("folder creation returned no file id".to_string()))?;

        tracing::info!(name, parent = %parent, folder_id = %id, "created folder");
        Ok(FolderId(id))
    }

    async fn child_folder(&self, parent: &FolderId, name: &str) -> Result<FolderId> {
        let existing = self
            .list_folders(parent)
            .await?
            .into_iter()
            .find(|(_, folder_name)| folder_name == name);

        match existing {
            Some((id, _)) => Ok(id),
            None => self.create_folder(parent, name).await,
        }
    }
}

fn is_live_folder(entry: &FileEntry) -> bool {
    !entry.trashed && entry.kind == FOLDER_KIND && !entry.id.is_empty()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pikpak::test_support::logged_in_client;
    use crate::service::OfflineService;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn root_path_makes_no_drive_calls() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server, "").await;

        Mock::given(path("/drive/v1/files"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let id = client.resolve_folder(&FolderPath::default()).await.unwrap();
        assert!(id.is_root());
        assert_eq!(client.resolve_destination().await.unwrap(), None);
    }

    #[tokio::test]
    async fn existing_folders_are_descended_into() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server, "/Downloads/slack").await;

        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .and(query_param("parent_id", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [
                    {"id": "trashed", "name": "Downloads", "kind": FOLDER_KIND, "trashed": true},
                    {"id": "file", "name": "Downloads", "kind": "drive#file"},
                    {"id": "dl", "name": "Downloads", "kind": FOLDER_KIND}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .and(query_param("parent_id", "dl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"id": "sl", "name": "slack", "kind": FOLDER_KIND}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drive/v1/files"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let id = client.resolve_destination().await.unwrap();
        assert_eq!(id, Some(FolderId("sl".to_string())));
    }

    #[tokio::test]
    async fn missing_segments_are_created() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server, "/Downloads/slack").await;

        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .and(query_param("parent_id", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"id": "dl", "name": "Downloads", "kind": FOLDER_KIND}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .and(query_param("parent_id", "dl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drive/v1/files"))
            .and(body_partial_json(json!({
                "kind": FOLDER_KIND,
                "name": "slack",
                "parent_id": "dl"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": {"id": "new-sl", "name": "slack", "kind": FOLDER_KIND}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client
            .resolve_folder(&FolderPath::parse("Downloads/slack"))
            .await
            .unwrap();
        assert_eq!(id, FolderId("new-sl".to_string()));
    }

    #[tokio::test]
    async fn resolving_twice_does_not_duplicate_folders() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server, "/inbox").await;

        // First listing is empty, later listings see the created folder
        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"id": "inbox-id", "name": "inbox", "kind": FOLDER_KIND}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/drive/v1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file": {"id": "inbox-id", "name": "inbox", "kind": FOLDER_KIND}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let first = client.resolve_destination().await.unwrap();
        let second = client.resolve_destination().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, Some(FolderId("inbox-id".to_string())));
    }

    #[tokio::test]
    async fn listing_follows_page_tokens() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server, "").await;

        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .and(query_param("page_token", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"id": "b", "name": "B", "kind": FOLDER_KIND}],
                "next_page_token": ""
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .and(query_param("page_token", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "files": [{"id": "a", "name": "A", "kind": FOLDER_KIND}],
                "next_page_token": "p2"
            })))
            .mount(&server)
            .await;

        let folders = client.list_folders(&FolderId::root()).await.unwrap();
        let names: Vec<_> = folders.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[tokio::test]
    async fn listing_failure_names_the_segment() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server, "/Downloads").await;

        Mock::given(method("GET"))
            .and(path("/drive/v1/files"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        match client.resolve_destination().await {
            Err(Error::Resolution(ResolutionError { segment, cause })) => {
                assert_eq!(segment, "Downloads");
                assert!(matches!(*cause, Error::Remote { status: 503, .. }));
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
    }
}
