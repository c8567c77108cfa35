//! Logging for the etvr binary.
//!
//! Dual output: colored stdout plus a plain-text `etvr.log`. Initialization is
//! guarded so repeated calls are harmless.

use crate::error::EtvrError;

use common::ErrorLocation;

use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "etvr.log";

const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Install the global logger writing to stdout and `log_dir/etvr.log`.
///
/// Safe to call more than once: later calls log a warning and return `Ok`.
///
/// # Errors
///
/// Returns [`EtvrError::Etvr`] if the log file cannot be opened or a global
/// logger is already installed by someone else.
pub fn initialize(log_dir: &Path) -> Result<(), EtvrError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = build_dispatch(log_dir).and_then(|dispatch| {
            dispatch.apply().map_err(|e| EtvrError::Etvr {
                message: format!("Failed to initialize logger: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
        });
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{LOG_LEVEL:?}");
        }
    });

    result
}

/// Build the stdout + file dispatch without installing it.
#[track_caller]
pub fn build_dispatch(log_dir: &Path) -> Result<Dispatch, EtvrError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{source}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                source = source_of(record),
            ))
        })
        .chain(stdout());

    let log_file = fern::log_file(&log_file_path).map_err(|e| EtvrError::Etvr {
        message: format!(
            "Failed to create log file {}: {e}",
            log_file_path.display()
        ),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{source}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                source = source_of(record),
            ))
        })
        .chain(log_file);

    Ok(Dispatch::new()
        .level(LOG_LEVEL)
        .chain(stdout_dispatch)
        .chain(file_dispatch))
}

fn source_of(record: &Record) -> String {
    format!(
        "{}:{}",
        record.file().unwrap_or("unknown"),
        record.line().unwrap_or(0)
    )
}
