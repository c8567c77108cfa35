//! Top-level object graph: config, queue and both OSC workers.

use crate::config::ConfigStore;
use crate::error::CoreError;
use crate::osc::{OscReceiver, OscSender, TransferQueue, WorkerState};
use crate::tracker::TrackerControl;

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Lifecycle state of both workers, as reported to the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtvrStatus {
    pub sender: WorkerState,
    pub receiver: WorkerState,
}

/// Owns the configuration store and the OSC workers wired to it.
///
/// Config updates do not restart anything by themselves; callers use
/// [`restart`](Self::restart) when they want new settings picked up.
pub struct Etvr {
    config: ConfigStore,
    queue: TransferQueue,
    sender: OscSender,
    receiver: OscReceiver,
}

impl Etvr {
    /// Load config from `config_path` and build the workers. Nothing is started.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Osc`] if the sender's target address is unusable.
    pub async fn new(
        config_path: impl Into<PathBuf>,
        tracker: Arc<dyn TrackerControl>,
    ) -> Result<Self, CoreError> {
        Self::with_store(ConfigStore::load(config_path), tracker).await
    }

    /// Build the workers around an existing store.
    pub async fn with_store(
        config: ConfigStore,
        tracker: Arc<dyn TrackerControl>,
    ) -> Result<Self, CoreError> {
        let queue = TransferQueue::new();
        let sender = OscSender::new(config.clone(), queue.clone()).await?;
        let receiver = OscReceiver::new(config.clone(), tracker);

        Ok(Self {
            config,
            queue,
            sender,
            receiver,
        })
    }

    /// Start every worker enabled in the config.
    ///
    /// All or nothing: if the receiver cannot start, a sender launched by this
    /// call is stopped again before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Osc`] if a worker could not bind its socket.
    pub async fn start(&self) -> Result<(), CoreError> {
        debug!("Starting ETVR");

        let (enable_sending, enable_receiving) = self
            .config
            .read(|config| (config.osc.enable_sending, config.osc.enable_receiving))
            .await;

        let sender_started = if enable_sending {
            let was_running = self.sender.is_alive().await;
            self.sender.start().await?;
            !was_running
        } else {
            debug!("OSC sending disabled, sender not started");
            false
        };

        if enable_receiving {
            if let Err(e) = self.receiver.start().await {
                if sender_started {
                    warn!("Receiver failed to start, stopping the sender started with it");
                    self.sender.stop().await;
                }
                return Err(e.into());
            }
        } else {
            debug!("OSC receiving disabled, receiver not started");
        }

        info!("ETVR started");
        Ok(())
    }

    /// Stop both workers. Never fails; a stuck worker is logged by the worker.
    pub async fn stop(&self) -> EtvrStatus {
        debug!("Stopping ETVR");

        let status = EtvrStatus {
            sender: self.sender.stop().await,
            receiver: self.receiver.stop().await,
        };

        info!("ETVR stopped");
        status
    }

    pub async fn restart(&self) -> Result<(), CoreError> {
        debug!("Restarting ETVR");
        self.stop().await;
        self.start().await
    }

    pub async fn status(&self) -> EtvrStatus {
        EtvrStatus {
            sender: self.sender.state().await,
            receiver: self.receiver.state().await,
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Producer side for the detection pipeline.
    pub fn queue(&self) -> &TransferQueue {
        &self.queue
    }

    pub fn sender(&self) -> &OscSender {
        &self.sender
    }

    pub fn receiver(&self) -> &OscReceiver {
        &self.receiver
    }
}
