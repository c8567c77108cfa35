//! Outbound OSC worker.
//!
//! Drains the [`TransferQueue`] and turns every [`EyeData`] item into one or
//! more single-float OSC messages sent to the consumer application.
//!
//! # Target address
//!
//! The destination `address:sending_port` is latched when the sender is
//! constructed. Changing it in the config has no effect on an existing
//! sender, not even across `restart`; the orchestrator has to build a new one.
//! Endpoint paths and the mirror/sync flags, on the other hand, are re-read for
//! every item.
//!
//! # Delivery
//!
//! Best effort. A message that fails to encode or send is logged at debug level
//! and dropped; nothing is retried or pushed back onto the queue.

use crate::config::{ConfigStore, OscConfig};
use crate::error::osc::OscError;
use crate::eye::{EyeData, EyeId};
use crate::osc::codec;
use crate::osc::queue::TransferQueue;
use crate::osc::worker::{self, CancelSignal, WorkerSlot, WorkerState};

use common::ErrorLocation;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::{debug, info, trace};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

/// How long one queue pop waits before the loop re-checks cancellation.
pub const POP_TIMEOUT: Duration = Duration::from_millis(100);

const WORKER_NAME: &str = "OSC sender";

/// Parameter paths and flags needed to translate one item.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRoutes {
    pub eyes_y: String,
    pub left_eye_x: String,
    pub right_eye_x: String,
    pub left_eyelid_squeeze: String,
    pub right_eyelid_squeeze: String,
    pub mirror_eyes: bool,
    pub sync_blink: bool,
}

impl From<&OscConfig> for OutboundRoutes {
    fn from(osc: &OscConfig) -> Self {
        let endpoints = &osc.osc_endpoints;
        Self {
            eyes_y: endpoints.eyes_y.clone(),
            left_eye_x: endpoints.left_eye_x.clone(),
            right_eye_x: endpoints.right_eye_x.clone(),
            left_eyelid_squeeze: endpoints.left_eyelid_squeeze.clone(),
            right_eyelid_squeeze: endpoints.right_eyelid_squeeze.clone(),
            mirror_eyes: osc.mirror_eyes,
            sync_blink: osc.sync_blink,
        }
    }
}

impl OutboundRoutes {
    fn eye_x(&self, eye: EyeId) -> &str {
        match eye {
            EyeId::Left => &self.left_eye_x,
            EyeId::Right => &self.right_eye_x,
        }
    }

    fn eyelid(&self, eye: EyeId) -> &str {
        match eye {
            EyeId::Left => &self.left_eyelid_squeeze,
            EyeId::Right => &self.right_eyelid_squeeze,
        }
    }

    /// Address/value pairs for `item`, in send order.
    ///
    /// - `x` goes to the eye's X path, and to the other eye's too when mirroring.
    /// - `y`, when present, goes to the shared Y path.
    /// - `blink`, when present, goes to the eye's eyelid path, and to the other
    ///   eye's too when blinks are synced.
    pub fn messages(&self, item: &EyeData) -> Vec<(&str, f32)> {
        let mut messages = vec![(self.eye_x(item.eye), item.x)];

        if self.mirror_eyes {
            messages.push((self.eye_x(item.eye.opposite()), item.x));
        }

        if let Some(y) = item.y {
            messages.push((self.eyes_y.as_str(), y));
        }

        if let Some(blink) = item.blink {
            messages.push((self.eyelid(item.eye), blink));
            if self.sync_blink {
                messages.push((self.eyelid(item.eye.opposite()), blink));
            }
        }

        messages
    }
}

/// Background worker streaming queued eye data out over UDP.
pub struct OscSender {
    store: ConfigStore,
    queue: TransferQueue,
    target: SocketAddr,
    slot: Mutex<WorkerSlot>,
}

impl OscSender {
    /// Build a sender, latching the current `address:sending_port` as its target.
    ///
    /// # Errors
    ///
    /// Returns [`OscError::Address`] if the configured address is not an IP.
    pub async fn new(store: ConfigStore, queue: TransferQueue) -> Result<Self, OscError> {
        let target = store
            .read(|config| config.osc.sending_addr())
            .await
            .map_err(|e| OscError::Address {
                message: format!("Invalid OSC sending address: {e}"),
                location: ErrorLocation::caller(),
            })?;

        Ok(Self {
            store,
            queue,
            target,
            slot: Mutex::new(WorkerSlot::new(WORKER_NAME)),
        })
    }

    /// Launch the send loop. No-op if one is already alive.
    ///
    /// # Errors
    ///
    /// Returns [`OscError::Bind`] if no local UDP socket could be opened.
    pub async fn start(&self) -> Result<(), OscError> {
        let mut slot = self.slot.lock().await;

        if slot.is_alive() {
            debug!("Worker `{WORKER_NAME}` requested to start but is already running");
            return Ok(());
        }

        let local = SocketAddr::new(unspecified_for(self.target.ip()), 0);
        let socket = UdpSocket::bind(local).await.map_err(|e| OscError::Bind {
            addr: local,
            message: e.to_string(),
            location: ErrorLocation::caller(),
        })?;
        let bound = socket.local_addr()?;

        info!("OSC sender serving on {}", self.target);

        let target = self.target;
        let queue = self.queue.clone();
        let store = self.store.clone();
        slot.launch(Some(bound), move |cancelled| {
            send_loop(socket, target, queue, store, cancelled)
        });

        Ok(())
    }

    /// Request cancellation and wait for the loop to exit.
    pub async fn stop(&self) -> WorkerState {
        worker::stop(&self.slot).await
    }

    /// `stop` then `start`. Items pushed in between are kept and drained later.
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

    /// Generation number of the running loop, if any.
    pub async fn generation(&self) -> Option<u64> {
        self.slot.lock().await.generation()
    }

    /// Local address of the socket used by the running loop, if any.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.slot.lock().await.endpoint()
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

fn unspecified_for(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

async fn send_loop(
    socket: UdpSocket,
    target: SocketAddr,
    queue: TransferQueue,
    store: ConfigStore,
    cancelled: CancelSignal,
) {
    debug!("OSC send loop started, target {target}");

    loop {
        if *cancelled.borrow() {
            debug!("OSC send loop cancelled");
            return;
        }

        let Some(item) = queue.pop(POP_TIMEOUT).await else {
            continue;
        };

        let routes = store.read(|config| OutboundRoutes::from(&config.osc)).await;
        for (address, value) in routes.messages(&item) {
            send_one(&socket, target, address, value).await;
        }
    }
}

async fn send_one(socket: &UdpSocket, target: SocketAddr, address: &str, value: f32) {
    let packet = match codec::encode_float(address, value) {
        Ok(packet) => packet,
        Err(e) => {
            debug!("Dropping OSC message: {e}");
            return;
        }
    };

    match socket.send_to(&packet, target).await {
        Ok(_) => trace!("OSC {address} = {value} -> {target}"),
        Err(e) => debug!("Dropping OSC message {address} -> {target}: {e}"),
    }
}
