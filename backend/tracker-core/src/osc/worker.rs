//! Lifecycle bookkeeping shared by the OSC sender and receiver.
//!
//! Every `start` creates a fresh [`WorkerHandle`]: a new generation number, a
//! new cancellation channel and a new task. Liveness is read from the task
//! and its completion signal, never from a flag set by `stop`, so a task that
//! ignored a stop request still counts as alive and blocks a second instance
//! from being launched.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// How long `stop` waits for a worker task to finish.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    /// No task, or the last task has finished.
    Idle,
    /// Task running, no stop requested.
    Running,
    /// Stop requested but the task has not finished yet.
    Stuck,
}

pub(crate) type CancelSignal = watch::Receiver<bool>;

struct WorkerHandle {
    generation: u64,
    endpoint: Option<SocketAddr>,
    cancel: watch::Sender<bool>,
    done: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// The work future returned, or the task is gone.
    fn is_finished(&self) -> bool {
        *self.done.borrow() || self.task.is_finished()
    }
}

/// A stop in flight: the task has been signalled, its completion is awaited
/// without holding the slot.
pub(crate) struct StopRequest {
    name: &'static str,
    generation: u64,
    done: watch::Receiver<bool>,
}

impl StopRequest {
    /// Wait up to [`STOP_TIMEOUT`] for the signalled task to finish.
    async fn wait(mut self) -> WorkerState {
        let (name, generation) = (self.name, self.generation);

        match timeout(STOP_TIMEOUT, self.done.wait_for(|done| *done)).await {
            Ok(Ok(_)) => {
                info!("{name} worker stopped (generation {generation})");
                WorkerState::Idle
            }
            Ok(Err(_)) => {
                error!("{name} worker (generation {generation}) ended abnormally");
                WorkerState::Idle
            }
            Err(_) => {
                error!(
                    "Failed to stop {name} worker (generation {generation}) within {STOP_TIMEOUT:?}!"
                );
                WorkerState::Stuck
            }
        }
    }
}

pub(crate) struct WorkerSlot {
    name: &'static str,
    generation: u64,
    handle: Option<WorkerHandle>,
}

impl WorkerSlot {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            handle: None,
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        match &self.handle {
            None => WorkerState::Idle,
            Some(handle) if handle.is_finished() => WorkerState::Idle,
            Some(handle) if *handle.cancel.borrow() => WorkerState::Stuck,
            Some(_) => WorkerState::Running,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state() != WorkerState::Idle
    }

    /// Generation of the current task, if one is alive.
    pub(crate) fn generation(&self) -> Option<u64> {
        self.live_handle().map(|handle| handle.generation)
    }

    /// Socket address the current task is bound to, if one is alive.
    pub(crate) fn endpoint(&self) -> Option<SocketAddr> {
        self.live_handle().and_then(|handle| handle.endpoint)
    }

    fn live_handle(&self) -> Option<&WorkerHandle> {
        self.handle
            .as_ref()
            .filter(|handle| !handle.is_finished())
    }

    /// Forget a finished task, dropping whatever it still owned.
    pub(crate) fn reap(&mut self) {
        if self
            .handle
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            self.handle = None;
        }
    }

    /// Spawn `run` as a new generation. Callers check [`is_alive`](Self::is_alive) first.
    pub(crate) fn launch<F, Fut>(&mut self, endpoint: Option<SocketAddr>, run: F) -> u64
    where
        F: FnOnce(CancelSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.reap();

        let (cancel, cancelled) = watch::channel(false);
        // Dropped without `true` when the task panics.
        let (finished, done) = watch::channel(false);
        let work = run(cancelled);

        self.generation += 1;
        let task = tokio::spawn(async move {
            work.await;
            finished.send_replace(true);
        });

        self.handle = Some(WorkerHandle {
            generation: self.generation,
            endpoint,
            cancel,
            done,
            task,
        });

        debug!("{} worker launched (generation {})", self.name, self.generation);
        self.generation
    }

    /// Signal the current task to stop. `None` if nothing is running.
    pub(crate) fn request_stop(&mut self) -> Option<StopRequest> {
        let name = self.name;

        let Some(handle) = self.handle.as_ref() else {
            debug!("Request to stop {name} worker made but none was running");
            return None;
        };

        if handle.is_finished() {
            debug!("Request to stop dead {name} worker was made!");
            self.handle = None;
            return None;
        }

        info!("Stopping {name} worker (generation {})", handle.generation);
        handle.cancel.send_replace(true);

        Some(StopRequest {
            name,
            generation: handle.generation,
            done: handle.done.clone(),
        })
    }

    /// Drop the handle of `generation` after its stop completed.
    fn release(&mut self, generation: u64) {
        if self
            .handle
            .as_ref()
            .is_some_and(|handle| handle.generation == generation)
        {
            self.handle = None;
        }
    }
}

/// Signal the task in `slot` and wait up to [`STOP_TIMEOUT`] for it.
///
/// The slot lock is only held to signal and to clean up, so `state()` keeps
/// answering (as [`WorkerState::Stuck`]) while the wait is in progress. A task
/// that outlives the timeout keeps its handle; calling `stop` again retries.
pub(crate) async fn stop(slot: &Mutex<WorkerSlot>) -> WorkerState {
    let request = slot.lock().await.request_stop();
    let Some(request) = request else {
        return WorkerState::Idle;
    };
    let generation = request.generation;

    let state = request.wait().await;
    if state == WorkerState::Idle {
        slot.lock().await.release(generation);
    }
    state
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                debug!(
                    "{} worker dropped while running, signalling generation {}",
                    self.name, handle.generation
                );
                handle.cancel.send_replace(true);
            }
        }
    }
}
