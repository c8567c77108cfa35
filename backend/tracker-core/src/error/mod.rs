pub mod config;
pub mod osc;
pub mod tracker;

pub use config::ConfigError;
pub use osc::OscError;
pub use tracker::TrackerError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Osc(#[from] osc::OscError),

    #[error(transparent)]
    Tracker(#[from] tracker::TrackerError),
}
