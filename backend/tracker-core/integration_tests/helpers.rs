//! Shared fixtures for tracker-core integration tests.

use tracker_core::config::{CONFIG_FILE_NAME, ConfigStore};
use tracker_core::error::TrackerError;
use tracker_core::tracker::TrackerControl;

use std::net::{SocketAddr, UdpSocket as StdUdpSocket};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rosc::OscMessage;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::UdpSocket;

/// Generous bound for "arrives promptly" assertions.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Window in which no further datagram is expected.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

pub fn config_path(dir: &TempDir) -> PathBuf {
    dir.path().join(CONFIG_FILE_NAME)
}

/// Ask the OS for a UDP port that is free right now.
pub fn free_udp_port() -> u16 {
    StdUdpSocket::bind("127.0.0.1:0")
        .and_then(|socket| socket.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to reserve a UDP port")
}

/// Store loaded from a temp dir, then patched with `patch`.
pub async fn store_with(dir: &TempDir, patch: Value) -> ConfigStore {
    let store = ConfigStore::load(config_path(dir));
    store
        .update(patch)
        .await
        .expect("Test patch should be valid");
    store
}

/// Patch pointing the sender at `sending_port` and the receiver at `receiver_port`.
pub fn ports_patch(sending_port: u16, receiver_port: u16) -> Value {
    json!({
        "osc": {
            "sending_port": sending_port,
            "receiver_port": receiver_port
        }
    })
}

/// Local socket standing in for the consumer application.
pub async fn consumer() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind consumer socket");
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

/// Receive and decode one OSC message, or `None` if nothing arrives in `wait`.
pub async fn recv_osc(socket: &UdpSocket, wait: Duration) -> Option<OscMessage> {
    let mut buf = [0u8; 1536];
    let (len, _) = tokio::time::timeout(wait, socket.recv_from(&mut buf))
        .await
        .ok()?
        .ok()?;
    tracker_core::osc::codec::decode(&buf[..len])
        .ok()?
        .into_iter()
        .next()
}

/// Send an OSC command packet to `target` from an ephemeral socket.
pub async fn send_command(target: SocketAddr, address: &str) {
    let packet = tracker_core::osc::codec::encode(address, vec![rosc::OscType::Bool(true)])
        .expect("Failed to encode command");
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(&packet, target).await.unwrap();
}

/// Poll `condition` until it holds or `DELIVERY_TIMEOUT` passes.
pub async fn eventually<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + DELIVERY_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[derive(Default)]
pub struct RecordingTracker {
    pub recalibrations: AtomicUsize,
    pub recenters: AtomicUsize,
}

impl RecordingTracker {
    pub fn recenters(&self) -> usize {
        self.recenters.load(Ordering::SeqCst)
    }

    pub fn recalibrations(&self) -> usize {
        self.recalibrations.load(Ordering::SeqCst)
    }
}

impl TrackerControl for RecordingTracker {
    fn recalibrate(&self) -> Result<(), TrackerError> {
        self.recalibrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn recenter(&self) -> Result<(), TrackerError> {
        self.recenters.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
