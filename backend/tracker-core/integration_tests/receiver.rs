use crate::helpers::{
    RecordingTracker, config_path, eventually, free_udp_port, ports_patch, send_command,
    store_with,
};

use tracker_core::config::ConfigStore;
use tracker_core::error::OscError;
use tracker_core::osc::{OscReceiver, WorkerState};
use tracker_core::tracker::NoopTracker;

use std::sync::Arc;

use serde_json::json;

const SYNC_BLINK: &str = "/avatar/parameters/etvr_sync_blink";
const RECENTER: &str = "/avatar/parameters/etvr_recenter";
const RECALIBRATE: &str = "/avatar/parameters/etvr_recalibrate";

async fn receiver_on(dir: &tempfile::TempDir, port: u16) -> (ConfigStore, OscReceiver) {
    let store = store_with(dir, ports_patch(free_udp_port(), port)).await;
    let receiver = OscReceiver::new(store.clone(), Arc::new(NoopTracker));
    (store, receiver)
}

/// **VALUE**: A sync-blink command flips the flag in memory without persisting it.
///
/// **WHY THIS MATTERS**: The toggle is a runtime convenience from inside the
/// game; only explicit config updates should rewrite the user's file.
#[tokio::test]
async fn given_running_receiver_when_sync_blink_received_then_flag_flips_and_file_untouched() {
    // GIVEN: A receiver listening on a known port
    let dir = tempfile::tempdir().unwrap();
    let port = free_udp_port();
    let (store, receiver) = receiver_on(&dir, port).await;
    receiver.start().await.unwrap();
    let target = receiver.local_addr().await.unwrap();
    assert_eq!(target.port(), port);
    let file_before = std::fs::read_to_string(config_path(&dir)).unwrap();

    // WHEN: The consumer sends the toggle
    send_command(target, SYNC_BLINK).await;

    // THEN: The flag flips in memory, the file stays as it was
    assert!(eventually(|| async { store.read(|c| c.osc.sync_blink).await }).await);
    assert_eq!(
        std::fs::read_to_string(config_path(&dir)).unwrap(),
        file_before
    );

    receiver.stop().await;
}

#[tokio::test]
async fn given_two_sync_blink_commands_when_received_then_original_value_restored() {
    let dir = tempfile::tempdir().unwrap();
    let (store, receiver) = receiver_on(&dir, free_udp_port()).await;
    receiver.start().await.unwrap();
    let target = receiver.local_addr().await.unwrap();

    send_command(target, SYNC_BLINK).await;
    assert!(eventually(|| async { store.read(|c| c.osc.sync_blink).await }).await);
    send_command(target, SYNC_BLINK).await;
    assert!(eventually(|| async { !store.read(|c| c.osc.sync_blink).await }).await);

    receiver.stop().await;
}

#[tokio::test]
async fn given_recenter_and_recalibrate_when_received_then_tracker_capabilities_invoked() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(&dir, ports_patch(free_udp_port(), free_udp_port())).await;
    let tracker = Arc::new(RecordingTracker::default());
    let receiver = OscReceiver::new(store.clone(), tracker.clone());
    receiver.start().await.unwrap();
    let target = receiver.local_addr().await.unwrap();

    send_command(target, RECENTER).await;
    send_command(target, RECALIBRATE).await;

    assert!(eventually(|| async { tracker.recenters() == 1 && tracker.recalibrations() == 1 }).await);
    assert!(!store.read(|c| c.osc.sync_blink).await);

    receiver.stop().await;
}

#[tokio::test]
async fn given_running_receiver_when_started_again_then_noop() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, receiver) = receiver_on(&dir, free_udp_port()).await;

    receiver.start().await.unwrap();
    let generation = receiver.generation().await;
    receiver.start().await.unwrap();

    assert_eq!(receiver.generation().await, generation);
    assert_eq!(receiver.state().await, WorkerState::Running);

    receiver.stop().await;
}

/// **VALUE**: Stop unblocks an idle receive immediately and releases the port.
///
/// **BUG THIS CATCHES**: A loop waiting on `recv_from` without racing the
/// cancellation signal would hang until the five-second stop timeout.
#[tokio::test]
async fn given_idle_receiver_when_stopped_then_exits_promptly_and_port_is_released() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_udp_port();
    let (_store, receiver) = receiver_on(&dir, port).await;
    receiver.start().await.unwrap();

    let started = std::time::Instant::now();
    assert_eq!(receiver.stop().await, WorkerState::Idle);
    assert!(started.elapsed() < std::time::Duration::from_secs(1));
    assert_eq!(receiver.local_addr().await, None);

    // Port is free again for anyone
    std::net::UdpSocket::bind(("127.0.0.1", port)).expect("Port should be released");
}

#[tokio::test]
async fn given_idle_receiver_when_stopped_then_noop() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, receiver) = receiver_on(&dir, free_udp_port()).await;

    assert_eq!(receiver.stop().await, WorkerState::Idle);
}

#[tokio::test]
async fn given_restart_on_same_port_when_rebinding_then_succeeds_and_keeps_serving() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_udp_port();
    let (store, receiver) = receiver_on(&dir, port).await;

    for _ in 0..3 {
        receiver.restart().await.unwrap();
    }
    let target = receiver.local_addr().await.unwrap();
    assert_eq!(target.port(), port);

    send_command(target, SYNC_BLINK).await;
    assert!(eventually(|| async { store.read(|c| c.osc.sync_blink).await }).await);

    receiver.stop().await;
}

/// **VALUE**: Restart picks up a changed port and a changed command address.
#[tokio::test]
async fn given_changed_port_and_address_when_restarted_then_new_values_used() {
    let dir = tempfile::tempdir().unwrap();
    let (store, receiver) = receiver_on(&dir, free_udp_port()).await;
    receiver.start().await.unwrap();

    let new_port = free_udp_port();
    store
        .update(json!({
            "osc": {
                "receiver_port": new_port,
                "sync_blink_address": "/etvr/toggle"
            }
        }))
        .await
        .unwrap();
    receiver.restart().await.unwrap();

    let target = receiver.local_addr().await.unwrap();
    assert_eq!(target.port(), new_port);

    send_command(target, "/etvr/toggle").await;
    assert!(eventually(|| async { store.read(|c| c.osc.sync_blink).await }).await);

    receiver.stop().await;
}

#[tokio::test]
async fn given_port_in_use_when_started_then_bind_error_surfaced() {
    // GIVEN: Someone else already holds the port
    let blocker = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let (_store, receiver) = receiver_on(&dir, port).await;

    // WHEN: Starting
    let result = receiver.start().await;

    // THEN: The caller sees the failure and the worker stays idle
    assert!(matches!(result, Err(OscError::Bind { .. })));
    assert_eq!(receiver.state().await, WorkerState::Idle);
}

#[tokio::test]
async fn given_malformed_datagram_when_received_then_receiver_keeps_serving() {
    let dir = tempfile::tempdir().unwrap();
    let (store, receiver) = receiver_on(&dir, free_udp_port()).await;
    receiver.start().await.unwrap();
    let target = receiver.local_addr().await.unwrap();

    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(b"not osc at all", target).await.unwrap();
    send_command(target, SYNC_BLINK).await;

    assert!(eventually(|| async { store.read(|c| c.osc.sync_blink).await }).await);
    assert_eq!(receiver.state().await, WorkerState::Running);

    receiver.stop().await;
}
