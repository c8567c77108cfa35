use common::ErrorLocation;

use std::io::Error as IoError;
use std::net::SocketAddr;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum OscError {
    #[error("Bind Error: {addr}: {message} {location}")]
    Bind {
        addr: SocketAddr,
        message: String,
        location: ErrorLocation,
    },

    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Address Error: {message} {location}")]
    Address {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IoError> for OscError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        OscError::Io {
            message: error.to_string(),
            location: ErrorLocation::caller(),
        }
    }
}

impl From<rosc::OscError> for OscError {
    #[track_caller]
    fn from(error: rosc::OscError) -> Self {
        OscError::Decode {
            message: format!("{error:?}"),
            location: ErrorLocation::caller(),
        }
    }
}
