//! Inbound OSC worker.
//!
//! Listens on `address:receiver_port` and turns incoming messages into
//! [`OscCommand`](crate::osc::dispatch::OscCommand)s. Unlike the sender, the
//! socket address and the dispatch table are re-read from the config on every
//! `start`, so a restart picks up changed ports and addresses.
//!
//! Stopping is preemptive: the receive call is raced against the cancellation
//! signal, so a receiver blocked on an idle socket exits immediately.

use crate::config::ConfigStore;
use crate::error::osc::OscError;
use crate::osc::dispatch::Dispatcher;
use crate::osc::worker::{self, CancelSignal, WorkerSlot, WorkerState};
use crate::tracker::TrackerControl;

use common::ErrorLocation;

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, info};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

/// Largest datagram the receiver accepts.
const MAX_DATAGRAM_SIZE: usize = 65_507;

const WORKER_NAME: &str = "OSC receiver";

/// Background worker receiving OSC commands over UDP.
pub struct OscReceiver {
    store: ConfigStore,
    tracker: Arc<dyn TrackerControl>,
    slot: Mutex<WorkerSlot>,
}

impl OscReceiver {
    pub fn new(store: ConfigStore, tracker: Arc<dyn TrackerControl>) -> Self {
        Self {
            store,
            tracker,
            slot: Mutex::new(WorkerSlot::new(WORKER_NAME)),
        }
    }

    /// Bind a fresh socket and launch the receive loop. No-op if already alive.
    ///
    /// The previous socket belonged to the previous task and was released when
    /// it finished, so rebinding the same port is not an error.
    ///
    /// # Errors
    ///
    /// - [`OscError::Address`] if the configured address is not an IP.
    /// - [`OscError::Bind`] if the port cannot be bound (e.g. already in use).
    pub async fn start(&self) -> Result<(), OscError> {
        let mut slot = self.slot.lock().await;

        if slot.is_alive() {
            debug!("Worker `{WORKER_NAME}` requested to start but is already running");
            return Ok(());
        }
        slot.reap();

        let (addr, dispatcher) = self
            .store
            .read(|config| {
                (
                    config.osc.receiving_addr(),
                    Dispatcher::from_config(&config.osc),
                )
            })
            .await;

        let addr = addr.map_err(|e| OscError::Address {
            message: format!("Invalid OSC receiving address: {e}"),
            location: ErrorLocation::caller(),
        })?;

        let socket = UdpSocket::bind(addr).await.map_err(|e| OscError::Bind {
            addr,
            message: e.to_string(),
            location: ErrorLocation::caller(),
        })?;
        let bound = socket.local_addr()?;

        info!("OSC receiver listening on {bound}");

        let store = self.store.clone();
        let tracker = Arc::clone(&self.tracker);
        slot.launch(Some(bound), move |cancelled| {
            receive_loop(socket, dispatcher, store, tracker, cancelled)
        });

        Ok(())
    }

    /// Unblock the receive loop and wait for it to exit.
    pub async fn stop(&self) -> WorkerState {
        worker::stop(&self.slot).await
    }

    /// `stop` then `start`, re-reading address, port and dispatch table.
    pub async fn restart(&self) -> Result<(), OscError> {
        self.stop().await;
        self.start().await
    }

    pub async fn state(&self) -> WorkerState {
        self.slot.lock().await.state()
    }

    pub async fn is_alive(&self) -> bool {
        self.slot.lock().await.is_alive()
    }

    pub async fn generation(&self) -> Option<u64> {
        self.slot.lock().await.generation()
    }

    /// Address the running loop is bound to, if any.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.slot.lock().await.endpoint()
    }
}

async fn receive_loop(
    socket: UdpSocket,
    dispatcher: Dispatcher,
    store: ConfigStore,
    tracker: Arc<dyn TrackerControl>,
    mut cancelled: CancelSignal,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        tokio::select! {
            changed = cancelled.changed() => {
                if changed.is_err() || *cancelled.borrow() {
                    debug!("OSC receive loop cancelled");
                    return;
                }
            }
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => {
                    dispatcher
                        .dispatch(&buf[..len], peer, &store, tracker.as_ref())
                        .await;
                }
                Err(e) => debug!("OSC receive error: {e}"),
            },
        }
    }
}
