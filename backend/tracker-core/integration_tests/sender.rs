use crate::helpers::{
    DELIVERY_TIMEOUT, QUIET_PERIOD, config_path, consumer, free_udp_port, ports_patch, recv_osc,
    store_with,
};

use tracker_core::config::ConfigStore;
use tracker_core::eye::{EyeData, EyeId};
use tracker_core::osc::{OscSender, POP_TIMEOUT, TransferQueue, WorkerState};

use std::time::Duration;

use rosc::OscType;
use serde_json::json;

#[tokio::test]
async fn given_default_config_when_sender_built_then_target_is_localhost_9000() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::load(config_path(&dir));

    let sender = OscSender::new(store, TransferQueue::new()).await.unwrap();

    assert_eq!(sender.target(), "127.0.0.1:9000".parse().unwrap());
    assert_eq!(sender.state().await, WorkerState::Idle);
}

/// **VALUE**: End-to-end outbound path: one left-eye item with eyelid state
/// becomes exactly two OSC messages at the consumer.
///
/// **BUG THIS CATCHES**: Items lost between queue and socket, wrong endpoint
/// paths, or extra messages (e.g. always sending `EyesY`).
#[tokio::test]
async fn given_item_pushed_before_start_when_started_then_exactly_two_messages_arrive() {
    // GIVEN: A consumer socket and a sender pointed at it
    let dir = tempfile::tempdir().unwrap();
    let (consumer, port) = consumer().await;
    let store = store_with(&dir, ports_patch(port, free_udp_port())).await;
    let queue = TransferQueue::new();
    let sender = OscSender::new(store, queue.clone()).await.unwrap();

    // GIVEN: An item already waiting in the queue
    queue.push(EyeData::new(EyeId::Left, 0.5).with_blink(0.75));

    // WHEN: Starting the sender
    sender.start().await.unwrap();

    // THEN: LeftEyeX then the left eyelid arrive, and nothing else
    let first = recv_osc(&consumer, DELIVERY_TIMEOUT).await.expect("LeftEyeX");
    assert_eq!(first.addr, "/avatar/parameters/LeftEyeX");
    assert_eq!(first.args, vec![OscType::Float(0.5)]);

    let second = recv_osc(&consumer, DELIVERY_TIMEOUT).await.expect("eyelid");
    assert_eq!(second.addr, "/avatar/parameters/LeftEyeLidExpandedSqueeze");
    assert_eq!(second.args, vec![OscType::Float(0.75)]);

    assert!(recv_osc(&consumer, QUIET_PERIOD).await.is_none());
    assert!(queue.is_empty());

    assert_eq!(sender.stop().await, WorkerState::Idle);
}

#[tokio::test]
async fn given_running_sender_when_started_again_then_same_generation() {
    let dir = tempfile::tempdir().unwrap();
    let (_consumer, port) = consumer().await;
    let store = store_with(&dir, ports_patch(port, free_udp_port())).await;
    let sender = OscSender::new(store, TransferQueue::new()).await.unwrap();

    sender.start().await.unwrap();
    let generation = sender.generation().await;
    sender.start().await.unwrap();

    assert!(generation.is_some());
    assert_eq!(sender.generation().await, generation);
    assert_eq!(sender.state().await, WorkerState::Running);

    sender.stop().await;
}

#[tokio::test]
async fn given_idle_sender_when_stopped_then_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::load(config_path(&dir));
    let sender = OscSender::new(store, TransferQueue::new()).await.unwrap();

    assert_eq!(sender.stop().await, WorkerState::Idle);
    assert_eq!(sender.stop().await, WorkerState::Idle);
    assert!(!sender.is_alive().await);
}

/// **VALUE**: Cancellation is observed within roughly one pop timeout.
///
/// **WHY THIS MATTERS**: Stop waits at most five seconds; a loop that only
/// checked cancellation after receiving an item would hang on an idle queue.
#[tokio::test]
async fn given_idle_queue_when_stopped_then_exits_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let (_consumer, port) = consumer().await;
    let store = store_with(&dir, ports_patch(port, free_udp_port())).await;
    let sender = OscSender::new(store, TransferQueue::new()).await.unwrap();
    sender.start().await.unwrap();

    let started = std::time::Instant::now();
    let state = sender.stop().await;

    assert_eq!(state, WorkerState::Idle);
    assert!(started.elapsed() < POP_TIMEOUT * 10);
}

#[tokio::test]
async fn given_items_pushed_while_stopped_when_restarted_then_drained_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (consumer, port) = consumer().await;
    let store = store_with(&dir, ports_patch(port, free_udp_port())).await;
    let queue = TransferQueue::new();
    let sender = OscSender::new(store, queue.clone()).await.unwrap();

    sender.start().await.unwrap();
    sender.stop().await;
    for x in [0.1, 0.2, 0.3] {
        queue.push(EyeData::new(EyeId::Right, x));
    }
    sender.restart().await.unwrap();

    for expected in [0.1, 0.2, 0.3] {
        let message = recv_osc(&consumer, DELIVERY_TIMEOUT).await.unwrap();
        assert_eq!(message.addr, "/avatar/parameters/RightEyeX");
        assert_eq!(message.args, vec![OscType::Float(expected)]);
    }

    sender.stop().await;
}

/// **VALUE**: Endpoint paths are read per item, the target socket is not.
#[tokio::test]
async fn given_config_change_while_running_then_paths_follow_but_target_is_latched() {
    // GIVEN: A running sender
    let dir = tempfile::tempdir().unwrap();
    let (consumer, port) = consumer().await;
    let store = store_with(&dir, ports_patch(port, free_udp_port())).await;
    let queue = TransferQueue::new();
    let sender = OscSender::new(store.clone(), queue.clone()).await.unwrap();
    sender.start().await.unwrap();

    // WHEN: Changing both an endpoint path and the sending port
    store
        .update(json!({
            "osc": {
                "sending_port": free_udp_port(),
                "osc_endpoints": { "left_eye_x": "/custom/LeftX" }
            }
        }))
        .await
        .unwrap();
    queue.push(EyeData::new(EyeId::Left, 0.9));

    // THEN: The new path is used, still delivered to the original target
    let message = recv_osc(&consumer, DELIVERY_TIMEOUT).await.unwrap();
    assert_eq!(message.addr, "/custom/LeftX");
    assert_eq!(sender.target().port(), port);

    sender.stop().await;
}

#[tokio::test]
async fn given_unreachable_target_when_sending_then_loop_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on this port; sends may fail or vanish.
    let store = store_with(&dir, ports_patch(free_udp_port(), free_udp_port())).await;
    let queue = TransferQueue::new();
    let sender = OscSender::new(store, queue.clone()).await.unwrap();
    sender.start().await.unwrap();

    for _ in 0..10 {
        queue.push(EyeData::new(EyeId::Left, 0.0).with_blink(1.0));
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(sender.state().await, WorkerState::Running);
    assert!(queue.is_empty(), "Failed sends are dropped, never re-queued");
    assert_eq!(sender.stop().await, WorkerState::Idle);
}
