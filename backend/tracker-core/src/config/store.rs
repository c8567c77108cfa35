//! Shared, lock-guarded configuration record.
//!
//! One [`ConfigStore`] is created by the orchestrator and cloned into both OSC
//! workers and the HTTP routes. All clones share the same record.
//!
//! # Consistency
//!
//! - Every mutation takes the write lock once for its whole batch, so readers
//!   never observe a half-applied update.
//! - Snapshots clone under the read lock and are never torn.
//! - Disk writes happen after the write lock is released, so workers reading
//!   the record are never held up by file I/O. Updates are serialized by a
//!   separate persist lock, so files are written in commit order and the last
//!   write is always the last committed record.

use crate::config::EyeTrackConfig;
use crate::error::config::ConfigError;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

/// Runtime configuration shared between the control surface and the workers.
///
/// # Thread Safety
///
/// This type is `Clone` and can be shared across threads/tasks.
#[derive(Clone)]
pub struct ConfigStore {
    config: Arc<RwLock<EyeTrackConfig>>,
    persist: Arc<Mutex<()>>,
    path: Arc<PathBuf>,
}

impl ConfigStore {
    /// Wrap an already-built config without touching storage.
    pub fn new(path: impl Into<PathBuf>, config: EyeTrackConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            persist: Arc::new(Mutex::new(())),
            path: Arc::new(path.into()),
        }
    }

    /// Hydrate the store from `path`, falling back to defaults.
    ///
    /// - No file: defaults are written so there is something to fall back on.
    /// - Unreadable, malformed or invalid file: logged, then overwritten with defaults.
    ///
    /// Never fails; a failed write of the defaults is logged and the in-memory
    /// defaults are still returned.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let config = if !path.exists() {
            info!(
                "No config file found at {}, using base settings",
                path.display()
            );
            persist_defaults(&path)
        } else {
            match EyeTrackConfig::read_from(&path) {
                Ok(config) => config,
                Err(e) => {
                    error!("Invalid data found in config, replacing with default values: {e}");
                    persist_defaults(&path)
                }
            }
        };

        Self::new(path, config)
    }

    /// Apply a partial config document, then persist.
    ///
    /// The payload is merged over the current record and validated as a whole
    /// before anything is committed. A rejected payload leaves the record
    /// exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ValidationError`] if the payload was rejected (nothing changed).
    /// - [`ConfigError::WriteError`] if the update was committed in memory but
    ///   could not be written to disk.
    pub async fn update(&self, payload: Value) -> Result<(), ConfigError> {
        let _persist = self.persist.lock().await;

        let committed = {
            let mut config = self.config.write().await;

            let updated = match config.merged(&payload) {
                Ok(updated) => updated,
                Err(e) => {
                    error!("Failed to update config with new values: {e}");
                    return Err(e);
                }
            };

            *config = updated.clone();
            updated
        };
        info!("Config updated in memory");

        if let Err(e) = committed.save(&self.path) {
            error!("Config updated in memory but disk write failed: {e}");
            return Err(e);
        }

        Ok(())
    }

    /// Deep copy of the full record.
    pub async fn snapshot(&self) -> EyeTrackConfig {
        self.config.read().await.clone()
    }

    /// Run `f` against the current record under the read lock.
    ///
    /// Workers use this to pull the few fields they need per message without
    /// cloning the whole record.
    pub async fn read<R>(&self, f: impl FnOnce(&EyeTrackConfig) -> R) -> R {
        let config = self.config.read().await;
        f(&*config)
    }

    /// Flip `osc.sync_blink` in memory and return the new value.
    ///
    /// Not persisted: only the HTTP update path writes to disk.
    pub async fn toggle_sync_blink(&self) -> bool {
        let mut config = self.config.write().await;
        config.osc.sync_blink = !config.osc.sync_blink;
        config.osc.sync_blink
    }

    /// Persist the current record.
    pub async fn save(&self) -> Result<(), ConfigError> {
        let _persist = self.persist.lock().await;
        let config = self.snapshot().await;
        config.save(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn persist_defaults(path: &Path) -> EyeTrackConfig {
    let defaults = EyeTrackConfig::default();
    if let Err(e) = defaults.save(path) {
        warn!("Failed to write default config, continuing in memory only: {e}");
    }
    defaults
}
