//! Offline download service abstraction
//!
//! The relay and the completion tracker only talk to the remote drive through
//! [`OfflineService`]. [`PikPakClient`](crate::pikpak::PikPakClient) is the
//! production implementation; tests substitute in-memory fakes.

use crate::error::Result;
use crate::types::{DownloadJob, FileId, FolderId, TaskStatus};
use async_trait::async_trait;

/// Remote drive operations needed to turn a link into a shared file
#[async_trait]
pub trait OfflineService: Send + Sync {
    /// Resolve the configured destination folder
    ///
    /// Returns `None` when downloads go to the drive's default location. Folders
    /// missing on the drive are created.
    async fn resolve_destination(&self) -> Result<Option<FolderId>>;

    /// Submit a link as an offline download into `destination`
    async fn submit(&self, link: &str, destination: Option<&FolderId>) -> Result<DownloadJob>;

    /// Current offline task listing
    async fn list_tasks(&self) -> Result<Vec<TaskStatus>>;

    /// Public, non-expiring share URL for a stored file
    ///
    /// Any failure yields `None`; a missing share link is not an error.
    async fn share_link(&self, file_id: &FileId) -> Option<String>;
}
