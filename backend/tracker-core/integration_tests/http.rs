use crate::helpers::{config_path, free_udp_port, ports_patch, store_with};

use tracker_core::config::EyeTrackConfig;
use tracker_core::osc::WorkerState;
use tracker_core::tracker::NoopTracker;
use tracker_core::{Etvr, EtvrStatus, http};

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

struct TestServer {
    base: String,
    etvr: Arc<Etvr>,
    _dir: TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with(&dir, ports_patch(free_udp_port(), free_udp_port())).await;
        let etvr = Arc::new(Etvr::with_store(store, Arc::new(NoopTracker)).await.unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let app = http::router(Arc::clone(&etvr));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            etvr,
            _dir: dir,
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base)
    }

    async fn get(&self, route: &str) -> reqwest::Response {
        reqwest::get(self.url(route)).await.unwrap()
    }

    async fn post(&self, route: &str, body: Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(route))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn given_running_server_when_config_requested_then_full_snapshot_returned() {
    let server = TestServer::spawn().await;

    let response = server.get("/etvr/config").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: EyeTrackConfig = response.json().await.unwrap();
    assert_eq!(body, server.etvr.config().snapshot().await);
}

/// **VALUE**: A valid partial update is applied, persisted and visible on the next GET.
#[tokio::test]
async fn given_valid_partial_update_when_posted_then_applied_and_persisted() {
    // GIVEN: A running server
    let server = TestServer::spawn().await;

    // WHEN: Posting a nested partial update
    let response = server
        .post("/etvr/config", json!({ "osc": { "mirror_eyes": true } }))
        .await;

    // THEN: Accepted, applied and on disk
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = server.get("/etvr/config").await.json().await.unwrap();
    assert_eq!(body["osc"]["mirror_eyes"], json!(true));
    assert_eq!(body["osc"]["sending_port"], json!(server.etvr.config().read(|c| c.osc.sending_port).await));

    let on_disk = EyeTrackConfig::read_from(server.etvr.config().path()).unwrap();
    assert!(on_disk.osc.mirror_eyes);
}

/// **VALUE**: A rejected update is reported as a client error and changes nothing.
///
/// **BUG THIS CATCHES**: Applying the patch field by field would leave the
/// valid half of a half-invalid payload in place.
#[tokio::test]
async fn given_invalid_update_when_posted_then_422_and_state_unchanged() {
    let server = TestServer::spawn().await;
    let before = server.etvr.config().snapshot().await;
    let file_before = std::fs::read_to_string(server.etvr.config().path()).unwrap();

    let response = server
        .post(
            "/etvr/config",
            json!({ "debug": true, "osc": { "sending_port": "not a port" } }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(server.etvr.config().snapshot().await, before);
    assert_eq!(
        std::fs::read_to_string(server.etvr.config().path()).unwrap(),
        file_before
    );
}

#[tokio::test]
async fn given_constraint_violation_when_posted_then_422() {
    let server = TestServer::spawn().await;

    let response = server
        .post("/etvr/config", json!({ "osc": { "address": "not-an-ip" } }))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        server.etvr.config().read(|c| c.osc.address.clone()).await,
        "127.0.0.1"
    );
}

#[tokio::test]
async fn given_lifecycle_routes_when_called_in_sequence_then_status_tracks_workers() {
    let server = TestServer::spawn().await;

    assert_eq!(server.get("/etvr/start").await.status(), StatusCode::OK);
    let status: EtvrStatus = server.get("/etvr/status").await.json().await.unwrap();
    assert_eq!(status.sender, WorkerState::Running);
    assert_eq!(status.receiver, WorkerState::Running);

    // Starting again is a no-op
    assert_eq!(server.get("/etvr/start").await.status(), StatusCode::OK);

    assert_eq!(server.get("/etvr/restart").await.status(), StatusCode::OK);
    assert_eq!(server.etvr.status().await.receiver, WorkerState::Running);

    let stopped: Value = server.get("/etvr/stop").await.json().await.unwrap();
    assert_eq!(stopped, json!({ "sender": "Idle", "receiver": "Idle" }));

    // Stopping again is a no-op
    assert_eq!(server.get("/etvr/stop").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn given_receiver_port_taken_when_start_requested_then_500() {
    let server = TestServer::spawn().await;
    let blocker = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let taken = blocker.local_addr().unwrap().port();
    server
        .etvr
        .config()
        .update(json!({ "osc": { "receiver_port": taken } }))
        .await
        .unwrap();

    let response = server.get("/etvr/start").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().await.unwrap().contains("Bind Error"));

    server.etvr.stop().await;
}

#[tokio::test]
async fn given_unknown_route_when_requested_then_404() {
    let server = TestServer::spawn().await;

    assert_eq!(server.get("/etvr/nope").await.status(), StatusCode::NOT_FOUND);
    assert!(config_path(&server._dir).exists());
}
