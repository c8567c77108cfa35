use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Failures reported by the detection pipeline when asked to act on an
/// inbound OSC command.
#[derive(Debug, ThisError)]
pub enum TrackerError {
    #[error("Tracker Unavailable Error: {message} {location}")]
    Unavailable {
        message: String,
        location: ErrorLocation,
    },

    #[error("Tracker Command Error: {message} {location}")]
    Command {
        message: String,
        location: ErrorLocation,
    },
}
