use crate::helpers::{
    DELIVERY_TIMEOUT, RecordingTracker, config_path, consumer, eventually, free_udp_port,
    ports_patch, recv_osc, send_command, store_with,
};

use tracker_core::config::EyeTrackConfig;
use tracker_core::error::{CoreError, OscError};
use tracker_core::eye::{EyeData, EyeId};
use tracker_core::osc::WorkerState;
use tracker_core::tracker::NoopTracker;
use tracker_core::{Etvr, EtvrStatus};

use std::sync::Arc;

use rosc::OscType;
use serde_json::json;

const ALL_IDLE: EtvrStatus = EtvrStatus {
    sender: WorkerState::Idle,
    receiver: WorkerState::Idle,
};

const ALL_RUNNING: EtvrStatus = EtvrStatus {
    sender: WorkerState::Running,
    receiver: WorkerState::Running,
};

#[tokio::test]
async fn given_fresh_directory_when_built_then_defaults_persisted_and_nothing_running() {
    let dir = tempfile::tempdir().unwrap();

    let etvr = Etvr::new(config_path(&dir), Arc::new(NoopTracker))
        .await
        .unwrap();

    assert!(config_path(&dir).exists());
    assert_eq!(etvr.config().snapshot().await, EyeTrackConfig::default());
    assert_eq!(etvr.status().await, ALL_IDLE);
    assert_eq!(etvr.sender().target().to_string(), "127.0.0.1:9000");
}

/// **VALUE**: One call brings the whole pipeline up; data pushed by the
/// detector reaches the consumer and commands from the consumer reach the store.
#[tokio::test]
async fn given_both_workers_enabled_when_started_then_data_flows_both_ways() {
    // GIVEN: A consumer socket and a free receiver port
    let dir = tempfile::tempdir().unwrap();
    let (consumer, consumer_port) = consumer().await;
    let store = store_with(&dir, ports_patch(consumer_port, free_udp_port())).await;
    let etvr = Etvr::with_store(store, Arc::new(NoopTracker)).await.unwrap();

    // WHEN: Starting
    etvr.start().await.unwrap();

    // THEN: Both workers run
    assert_eq!(etvr.status().await, ALL_RUNNING);

    // AND: Outbound data arrives
    etvr.queue().push(EyeData::new(EyeId::Right, 0.25));
    let message = recv_osc(&consumer, DELIVERY_TIMEOUT).await.unwrap();
    assert_eq!(message.addr, "/avatar/parameters/RightEyeX");
    assert_eq!(message.args, vec![OscType::Float(0.25)]);

    // AND: Inbound commands are applied
    let target = etvr.receiver().local_addr().await.unwrap();
    send_command(target, "/avatar/parameters/etvr_sync_blink").await;
    assert!(eventually(|| async { etvr.config().read(|c| c.osc.sync_blink).await }).await);

    assert_eq!(etvr.stop().await, ALL_IDLE);
}

#[tokio::test]
async fn given_sending_disabled_when_started_then_only_receiver_runs() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(&dir, ports_patch(free_udp_port(), free_udp_port())).await;
    store
        .update(json!({ "osc": { "enable_sending": false } }))
        .await
        .unwrap();
    let etvr = Etvr::with_store(store, Arc::new(NoopTracker)).await.unwrap();

    etvr.start().await.unwrap();

    assert_eq!(
        etvr.status().await,
        EtvrStatus {
            sender: WorkerState::Idle,
            receiver: WorkerState::Running,
        }
    );

    etvr.stop().await;
}

#[tokio::test]
async fn given_receiving_disabled_when_started_then_only_sender_runs() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(&dir, ports_patch(free_udp_port(), free_udp_port())).await;
    store
        .update(json!({ "osc": { "enable_receiving": false } }))
        .await
        .unwrap();
    let etvr = Etvr::with_store(store, Arc::new(NoopTracker)).await.unwrap();

    etvr.start().await.unwrap();

    assert_eq!(
        etvr.status().await,
        EtvrStatus {
            sender: WorkerState::Running,
            receiver: WorkerState::Idle,
        }
    );

    etvr.stop().await;
}

#[tokio::test]
async fn given_running_etvr_when_stopped_twice_then_both_report_idle() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(&dir, ports_patch(free_udp_port(), free_udp_port())).await;
    let etvr = Etvr::with_store(store, Arc::new(NoopTracker)).await.unwrap();
    etvr.start().await.unwrap();

    assert_eq!(etvr.stop().await, ALL_IDLE);
    assert_eq!(etvr.stop().await, ALL_IDLE);
}

/// **VALUE**: Restart applies a new receiver port and starts fresh generations.
///
/// **BUG THIS CATCHES**: A restart that skipped the stop would leave the old
/// receiver holding the old port while `start` silently no-ops.
#[tokio::test]
async fn given_changed_receiver_port_when_restarted_then_new_generation_on_new_port() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(&dir, ports_patch(free_udp_port(), free_udp_port())).await;
    let tracker = Arc::new(RecordingTracker::default());
    let etvr = Etvr::with_store(store, tracker.clone()).await.unwrap();
    etvr.start().await.unwrap();
    let sender_generation = etvr.sender().generation().await.unwrap();
    let receiver_generation = etvr.receiver().generation().await.unwrap();

    let new_port = free_udp_port();
    etvr.config()
        .update(json!({ "osc": { "receiver_port": new_port } }))
        .await
        .unwrap();
    etvr.restart().await.unwrap();

    assert_eq!(etvr.status().await, ALL_RUNNING);
    assert!(etvr.sender().generation().await.unwrap() > sender_generation);
    assert!(etvr.receiver().generation().await.unwrap() > receiver_generation);

    let target = etvr.receiver().local_addr().await.unwrap();
    assert_eq!(target.port(), new_port);
    send_command(target, "/avatar/parameters/etvr_recenter").await;
    assert!(eventually(|| async { tracker.recenters() == 1 }).await);

    etvr.stop().await;
}

#[tokio::test]
async fn given_receiver_port_taken_when_started_then_error_reported() {
    let blocker = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let taken = blocker.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(&dir, ports_patch(free_udp_port(), taken)).await;
    let etvr = Etvr::with_store(store, Arc::new(NoopTracker)).await.unwrap();

    let result = etvr.start().await;

    assert!(matches!(result, Err(CoreError::Osc(OscError::Bind { .. }))));
    assert_eq!(etvr.status().await, ALL_IDLE, "A failed start leaves nothing running");

    etvr.stop().await;
}

#[tokio::test]
async fn given_sender_already_running_when_receiver_start_fails_then_sender_kept() {
    let blocker = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let taken = blocker.local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(&dir, ports_patch(free_udp_port(), taken)).await;
    let etvr = Etvr::with_store(store, Arc::new(NoopTracker)).await.unwrap();
    etvr.sender().start().await.unwrap();
    let generation = etvr.sender().generation().await;

    assert!(etvr.start().await.is_err());

    assert_eq!(etvr.sender().state().await, WorkerState::Running);
    assert_eq!(etvr.sender().generation().await, generation);

    etvr.stop().await;
}
