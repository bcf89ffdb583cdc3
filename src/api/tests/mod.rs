use super::*;
use crate::chat::ReplySink;
use crate::chat::slack::sign;
use crate::relay::Relay;
use crate::service::OfflineService;
use crate::types::{DownloadJob, FileId, FolderId, JobId, TaskStatus};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tower::ServiceExt;


const SECRET: &str = "api-test-secret";

/// Drive that stores every link synchronously
#[derive(Default)]
struct InstantDrive {
    submitted: Mutex<Vec<String>>,
}

#[async_trait]
impl OfflineService for InstantDrive {
    async fn resolve_destination(&self) -> Result<Option<FolderId>> {
        Ok(None)
    }

    async fn submit(&self, link: &str, _destination: Option<&FolderId>) -> Result<DownloadJob> {
        self.submitted.lock().unwrap().push(link.to_string());
        Ok(DownloadJob {
            job_id: JobId::default(),
            file_id: Some(FileId("F1".to_string())),
            display_name: "stored.iso".to_string(),
            link: link.to_string(),
        })
    }

    async fn list_tasks(&self) -> Result<Vec<TaskStatus>> {
        Ok(Vec::new())
    }

    async fn share_link(&self, _file_id: &FileId) -> Option<String> {
        Some("https://mypikpak.com/s/F1".to_string())
    }
}

#[derive(Default)]
struct RecordingSink {
    replies: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn reply(&self, text: &str, channel_id: &str, thread_id: &str) -> Result<()> {
        self.replies.lock().unwrap().push((
            text.to_string(),
            channel_id.to_string(),
            thread_id.to_string(),
        ));
        Ok(())
    }
}

struct Harness {
    app: Router,
    drive: Arc<InstantDrive>,
    sink: Arc<RecordingSink>,
    relay: Arc<Relay>,
}

fn harness() -> Harness {
    let drive = Arc::new(InstantDrive::default());
    let sink = Arc::new(RecordingSink::default());
    let relay = Arc::new(Relay::new(drive.clone(), &Config::default()));
    let state = AppState::new(relay.clone(), sink.clone());

    Harness {
        app: create_router(state, SECRET),
        drive,
        sink,
        relay,
    }
}

fn signed_event(body: &str) -> Request<Body> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .to_string();

    Request::builder()
        .method("POST")
        .uri("/slack/events")
        .header("content-type", "application/json")
        .header(auth::TIMESTAMP_HEADER, &timestamp)
        .header(
            auth::SIGNATURE_HEADER,
            sign(SECRET, &timestamp, body.as_bytes()).unwrap(),
        )
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_server_spawns_and_stops_on_shutdown() {
    let h = harness();
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    config.slack.signing_secret = SECRET.to_string();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let state = AppState::new(h.relay.clone(), h.sink.clone());
    let server = tokio::spawn(async move {
        start_server(state, &config, async move {
            stop_rx.await.ok();
        })
        .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}
