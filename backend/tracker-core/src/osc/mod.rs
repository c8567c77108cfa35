//! OSC messaging between the tracker and the consumer application.
//!
//! - [`TransferQueue`]: FIFO fed by the detection pipeline
//! - [`OscSender`]: drains the queue and streams parameters out over UDP
//! - [`OscReceiver`]: listens for recenter/recalibrate/sync-blink commands
//!
//! Both workers share the lifecycle rules in [`worker`]: `start` on a live
//! worker is a no-op, `stop` on an idle worker is a no-op, and `stop` waits at
//! most [`STOP_TIMEOUT`] before reporting the worker as stuck.

pub mod codec;
pub mod dispatch;
pub mod queue;
pub mod receiver;
pub mod sender;
pub mod worker;

pub use dispatch::{Dispatcher, OscCommand};
pub use queue::TransferQueue;
pub use receiver::OscReceiver;
pub use sender::{OscSender, OutboundRoutes, POP_TIMEOUT};
pub use worker::{STOP_TIMEOUT, WorkerState};
