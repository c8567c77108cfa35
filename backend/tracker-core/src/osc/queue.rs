//! FIFO hand-off between the detection pipeline and the outbound worker.
//!
//! The queue is unbounded: [`TransferQueue::push`] never blocks and never drops
//! while the queue is alive. Items pushed while the sender is stopped pile up
//! and are drained in order once it runs again.

use crate::eye::EyeData;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::warn;
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;

/// Shared queue of [`EyeData`] items.
///
/// Clones share the same channel. The receiving half lives behind an async
/// mutex so it outlives any single run of the outbound worker.
#[derive(Clone)]
pub struct TransferQueue {
    tx: mpsc::UnboundedSender<EyeData>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<EyeData>>>,
    depth: Arc<AtomicUsize>,
}

impl TransferQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Enqueue an item. Safe to call from plain OS threads.
    pub fn push(&self, item: EyeData) {
        // Counted first so a racing pop never sees the depth underflow.
        self.depth.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.tx.send(item) {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            warn!("Transfer queue closed, dropping {:?} eye data", e.0.eye);
        }
    }

    /// Wait up to `wait` for the next item.
    ///
    /// `None` means nothing arrived in time; callers treat it as a chance to
    /// re-check their cancellation signal, not as an error.
    pub async fn pop(&self, wait: Duration) -> Option<EyeData> {
        let item = timeout(wait, async { self.rx.lock().await.recv().await })
            .await
            .ok()
            .flatten()?;

        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(item)
    }

    /// Items pushed but not yet popped.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TransferQueue {
    fn default() -> Self {
        Self::new()
    }
}
