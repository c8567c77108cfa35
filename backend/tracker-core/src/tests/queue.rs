use crate::eye::{EyeData, EyeId};
use crate::osc::TransferQueue;

use std::time::Duration;

#[tokio::test]
async fn given_pushed_items_when_popped_then_fifo_order() {
    let queue = TransferQueue::new();
    for i in 0..5 {
        queue.push(EyeData::new(EyeId::Left, i as f32));
    }
    assert_eq!(queue.len(), 5);

    for i in 0..5 {
        let item = queue.pop(Duration::from_millis(50)).await.unwrap();
        assert_eq!(item.x, i as f32);
    }
    assert!(queue.is_empty());
}

/// **VALUE**: An empty queue returns `None` after the timeout instead of hanging.
///
/// **WHY THIS MATTERS**: The send loop only re-checks its cancellation signal
/// between pops. A pop that never returns would make the sender unstoppable.
#[tokio::test(start_paused = true)]
async fn given_empty_queue_when_popped_then_none_after_timeout() {
    let queue = TransferQueue::new();

    let started = tokio::time::Instant::now();
    let item = queue.pop(Duration::from_millis(100)).await;

    assert!(item.is_none());
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn given_clone_when_pushing_then_original_sees_item() {
    let queue = TransferQueue::new();
    let producer = queue.clone();

    std::thread::spawn(move || producer.push(EyeData::new(EyeId::Right, 1.0)))
        .join()
        .unwrap();

    let item = queue.pop(Duration::from_secs(1)).await.unwrap();
    assert_eq!(item.eye, EyeId::Right);
}
