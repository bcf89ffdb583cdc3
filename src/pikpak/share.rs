//! Public share links.

use super::PikPakClient;
use super::wire::{ShareRequest, ShareResponse};
use crate::types::FileId;
use reqwest::Method;

impl PikPakClient {
    /// Create a public, non-expiring, passcode-free share for `file_id`
    ///
    /// Returns `None` when the drive declines or the request fails; callers
    /// treat that as a completed download without a link.
    pub async fn share_link(&self, file_id: &FileId) -> Option<String> {
        let request = ShareRequest {
            file_ids: [file_id.0.as_str()],
            share_to: "publiclink",
            expiration_days: -1,
            pass_code_option: "NOT_REQUIRED",
        };
        let body = match serde_json::to_value(&request) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(file_id = %file_id, error = %e, "cannot encode share request");
                return None;
            }
        };

        let result = self
            .session
            .authorized_request::<ShareResponse>(
                Method::POST,
                &self.drive_url("share"),
                &[],
                Some(&body),
            )
            .await;

        match result {
            Ok(response) => {
                let url = response.url();
                if url.is_none() {
                    tracing::warn!(file_id = %file_id, "share response carried no URL");
                }
                url
            }
            Err(e) => {
                tracing::warn!(file_id = %file_id, error = %e, "share link unavailable");
                None
            }
        }
    }
}
