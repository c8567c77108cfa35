//! Capability boundary towards the detection pipeline.
//!
//! The OSC receiver only knows that a command asks the pipeline to recenter or
//! recalibrate. What that means for the cameras is decided by whoever
//! implements [`TrackerControl`].

use crate::error::tracker::TrackerError;

use log::info;

/// Commands the inbound OSC worker can forward to the detection pipeline.
///
/// Implementations are called inline from the receive loop and must return
/// promptly; queue the real work instead of doing it here.
pub trait TrackerControl: Send + Sync {
    fn recalibrate(&self) -> Result<(), TrackerError>;

    fn recenter(&self) -> Result<(), TrackerError>;
}

/// Stand-in used when no detection pipeline is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl TrackerControl for NoopTracker {
    fn recalibrate(&self) -> Result<(), TrackerError> {
        info!("Recalibration requested but no tracker is attached");
        Ok(())
    }

    fn recenter(&self) -> Result<(), TrackerError> {
        info!("Recenter requested but no tracker is attached");
        Ok(())
    }
}
