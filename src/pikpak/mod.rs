//! PikPak drive client
//!
//! [`PikPakClient`] implements [`OfflineService`] on top of the PikPak user and
//! drive APIs:
//!
//! - [`session`] - login, token refresh and authorized requests
//! - [`folders`] - destination path resolution with create-if-missing
//! - [`offline`] - offline download submission and task listing
//! - [`share`] - public share links
//!
//! # Example
//!
//! ```no_run
//! use pikpak_relay::config::PikPakConfig;
//! use pikpak_relay::pikpak::PikPakClient;
//! use pikpak_relay::service::OfflineService;
//!
//! # async fn example() -> pikpak_relay::Result<()> {
//! let config = PikPakConfig {
//!     username: "user@example.com".to_string(),
//!     password: "secret".to_string(),
//!     ..Default::default()
//! };
//! let client = PikPakClient::new(&config)?;
//! client.login().await?;
//!
//! let job = client.submit("magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef", None).await?;
//! println!("submitted {}", job.job_id);
//! # Ok(())
//! # }
//! ```

pub mod folders;
pub mod offline;
pub mod session;
pub mod share;
pub(crate) mod wire;

pub use session::SessionManager;

use crate::config::PikPakConfig;
use crate::error::{Error, Result};
use crate::service::OfflineService;
use crate::types::{DownloadJob, FileId, FolderId, FolderPath, TaskStatus};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Client id of the PikPak web client
pub const CLIENT_ID: &str = "YNxT9w7GMdWvEOKa";
/// Client secret of the PikPak web client
pub const CLIENT_SECRET: &str = "dbw2OtmVEeuUvIptb1Coyg";

pub(crate) const FOLDER_KIND: &str = "drive#folder";
pub(crate) const FILE_KIND: &str = "drive#file";

/// Page size used for folder and task listings
pub(crate) const PAGE_LIMIT: u32 = 100;
/// Upper bound on pages fetched by one listing
pub(crate) const MAX_PAGES: usize = 20;

/// PikPak offline download client
pub struct PikPakClient {
    session: SessionManager,
    api_base: String,
    offline_path: FolderPath,
    /// Serializes folder resolution so concurrent messages never create duplicates
    folder_lock: Mutex<()>,
}

impl PikPakClient {
    /// Create a client from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &PikPakConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("pikpak-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            session: SessionManager::new(
                http,
                config.user_base.clone(),
                config.username.clone(),
                config.password.clone(),
            ),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            offline_path: config.offline_path.clone(),
            folder_lock: Mutex::new(()),
        })
    }

    /// Log in with the configured account
    pub async fn login(&self) -> Result<()> {
        self.session.login().await
    }

    /// Authentication state shared by all requests
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Configured destination folder
    pub fn offline_path(&self) -> &FolderPath {
        &self.offline_path
    }

    pub(crate) fn drive_url(&self, endpoint: &str) -> String {
        format!("{}/drive/v1/{}", self.api_base, endpoint)
    }
}

#[async_trait]
impl OfflineService for PikPakClient {
    async fn resolve_destination(&self) -> Result<Option<FolderId>> {
        if self.offline_path.is_root() {
            return Ok(None);
        }
        let id = self.resolve_folder(&self.offline_path).await?;
        Ok(Some(id).filter(|id| !id.is_root()))
    }

    async fn submit(&self, link: &str, destination: Option<&FolderId>) -> Result<DownloadJob> {
        PikPakClient::submit(self, link, destination).await
    }

    async fn list_tasks(&self) -> Result<Vec<TaskStatus>> {
        PikPakClient::list_tasks(self).await
    }

    async fn share_link(&self, file_id: &FileId) -> Option<String> {
        PikPakClient::share_link(self, file_id).await
    }
}
