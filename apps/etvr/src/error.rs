use common::ErrorLocation;

use tracker_core::error::CoreError;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the `etvr` binary.
///
/// Carries a rendered message plus where it was raised, so the same value can
/// be logged or serialized for a client.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum EtvrError {
    /// Error from this app (logging, filesystem setup)
    #[error("Etvr Error: {message} {location}")]
    Etvr {
        message: String,
        location: ErrorLocation,
    },

    /// Error from tracker-core (config, OSC workers)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// HTTP control surface failed to bind or serve
    #[error("Http Error: {message} {location}")]
    Http {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for EtvrError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        EtvrError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
