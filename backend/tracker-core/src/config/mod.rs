mod store;

pub use store::ConfigStore;

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::ffi::OsString;
use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use const_format::concatcp;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

pub const CONFIG_FILE_NAME: &str = "tracker-config.json";
pub const CONFIG_VERSION: u32 = 2;

const CONFIG_INDENT: &[u8] = b"    ";
const PARAMETERS_PREFIX: &str = "/avatar/parameters/";

pub const DEFAULT_OSC_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_SENDING_PORT: u16 = 9000;
pub const DEFAULT_RECEIVER_PORT: u16 = 9001;

pub const DEFAULT_RECENTER_ADDRESS: &str = concatcp!(PARAMETERS_PREFIX, "etvr_recenter");
pub const DEFAULT_RECALIBRATE_ADDRESS: &str = concatcp!(PARAMETERS_PREFIX, "etvr_recalibrate");
pub const DEFAULT_SYNC_BLINK_ADDRESS: &str = concatcp!(PARAMETERS_PREFIX, "etvr_sync_blink");

pub const DEFAULT_EYES_Y: &str = concatcp!(PARAMETERS_PREFIX, "EyesY");
pub const DEFAULT_LEFT_EYE_X: &str = concatcp!(PARAMETERS_PREFIX, "LeftEyeX");
pub const DEFAULT_RIGHT_EYE_X: &str = concatcp!(PARAMETERS_PREFIX, "RightEyeX");
pub const DEFAULT_LEFT_EYELID_SQUEEZE: &str =
    concatcp!(PARAMETERS_PREFIX, "LeftEyeLidExpandedSqueeze");
pub const DEFAULT_RIGHT_EYELID_SQUEEZE: &str =
    concatcp!(PARAMETERS_PREFIX, "RightEyeLidExpandedSqueeze");

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    pub threshold: u8,
    pub minsize: u32,
    pub maxsize: u32,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            threshold: 65,
            minsize: 10,
            maxsize: 25,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    pub blob: BlobConfig,
}

/// OSC parameter paths the outbound worker writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscEndpoints {
    pub eyes_y: String,
    pub left_eye_x: String,
    pub right_eye_x: String,
    pub left_eyelid_squeeze: String,
    pub right_eyelid_squeeze: String,
}

impl Default for OscEndpoints {
    fn default() -> Self {
        Self {
            eyes_y: DEFAULT_EYES_Y.to_string(),
            left_eye_x: DEFAULT_LEFT_EYE_X.to_string(),
            right_eye_x: DEFAULT_RIGHT_EYE_X.to_string(),
            left_eyelid_squeeze: DEFAULT_LEFT_EYELID_SQUEEZE.to_string(),
            right_eyelid_squeeze: DEFAULT_RIGHT_EYELID_SQUEEZE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    pub address: String,
    pub mirror_eyes: bool,
    pub sync_blink: bool,
    pub enable_sending: bool,
    pub sending_port: u16,
    pub enable_receiving: bool,
    pub receiver_port: u16,
    pub recenter_address: String,
    pub recalibrate_address: String,
    pub sync_blink_address: String,
    pub osc_endpoints: OscEndpoints,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_OSC_ADDRESS.to_string(),
            mirror_eyes: false,
            sync_blink: false,
            enable_sending: true,
            sending_port: DEFAULT_SENDING_PORT,
            enable_receiving: true,
            receiver_port: DEFAULT_RECEIVER_PORT,
            recenter_address: DEFAULT_RECENTER_ADDRESS.to_string(),
            recalibrate_address: DEFAULT_RECALIBRATE_ADDRESS.to_string(),
            sync_blink_address: DEFAULT_SYNC_BLINK_ADDRESS.to_string(),
            osc_endpoints: OscEndpoints::default(),
        }
    }
}

impl OscConfig {
    pub fn ip(&self) -> Result<IpAddr, AddrParseError> {
        self.address.parse()
    }

    /// Where outbound parameter messages are delivered.
    pub fn sending_addr(&self) -> Result<SocketAddr, AddrParseError> {
        Ok(SocketAddr::new(self.ip()?, self.sending_port))
    }

    /// Where the inbound worker listens for commands.
    pub fn receiving_addr(&self) -> Result<SocketAddr, AddrParseError> {
        Ok(SocketAddr::new(self.ip()?, self.receiver_port))
    }
}

/// Per-eye capture parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub enabled: bool,
    pub capture_source: String,
    pub threshold: u8,
    pub focal_length: u32,
    pub rotation_angle: i32,
    pub flip_x_axis: bool,
    pub flip_y_axis: bool,
    pub roi_x: u32,
    pub roi_y: u32,
    pub roi_w: u32,
    pub roi_h: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capture_source: String::new(),
            threshold: 50,
            focal_length: 30,
            rotation_angle: 0,
            flip_x_axis: false,
            flip_y_axis: false,
            roi_x: 0,
            roi_y: 0,
            roi_w: 0,
            roi_h: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeTrackConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_debug")]
    pub debug: bool,

    #[serde(default)]
    pub osc: OscConfig,

    #[serde(default)]
    pub left_eye: CameraConfig,

    #[serde(default)]
    pub right_eye: CameraConfig,

    #[serde(default)]
    pub algorithm: AlgorithmConfig,
}

impl Default for EyeTrackConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            debug: default_debug(),
            osc: OscConfig::default(),
            left_eye: CameraConfig::default(),
            right_eye: CameraConfig::default(),
            algorithm: AlgorithmConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_debug() -> bool {
    true
}

// ============================================
// IMPLEMENTATION
// ============================================

impl EyeTrackConfig {
    /// Read and validate a config document.
    ///
    /// Missing fields take their defaults and unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, is not valid JSON
    /// for this schema, or fails [`validate`](Self::validate).
    pub fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::caller(),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: EyeTrackConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::caller(),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Save config to `path` using an atomic write, indented with four spaces.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - Validation fails
    /// - Directory creation fails
    /// - Serialization fails
    /// - Write or rename fails
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                location: ErrorLocation::caller(),
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = self.to_json_bytes()?;
        let temp_path = temp_path_for(path);

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::caller(),
            path: path.to_path_buf(),
            source: e,
        })?;

        info!("Config saved to {}", path.display());
        Ok(())
    }

    fn to_json_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(CONFIG_INDENT));
        self.serialize(&mut serializer)
            .map_err(|e| ConfigError::SerializeError {
                location: ErrorLocation::caller(),
                reason: e.to_string(),
            })?;
        Ok(buf)
    }

    /// Build the config that results from applying a partial JSON document.
    ///
    /// Objects merge recursively, anything else replaces the current value.
    /// Fields absent from `patch` keep their current values. `self` is never
    /// touched; the caller decides whether to commit the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the merged document does not
    /// fit the schema or breaks a value constraint.
    pub fn merged(&self, patch: &Value) -> Result<Self, ConfigError> {
        let mut document = serde_json::to_value(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::caller(),
            reason: e.to_string(),
        })?;

        merge_json(&mut document, patch);

        let merged: EyeTrackConfig = serde_json::from_value(document)
            .map_err(|e| ConfigError::validation(format!("Invalid config payload: {e}")))?;

        merged.validate()?;
        Ok(merged)
    }

    /// Validate values the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::validation(format!(
                "Invalid version: {} (expected 1-{})",
                self.version, CONFIG_VERSION
            )));
        }

        if let Err(e) = self.osc.ip() {
            return Err(ConfigError::validation(format!(
                "Invalid OSC address '{}': {e}",
                self.osc.address
            )));
        }

        if self.osc.sending_port == 0 || self.osc.receiver_port == 0 {
            return Err(ConfigError::validation("OSC ports must be non-zero"));
        }

        let endpoints = &self.osc.osc_endpoints;
        let paths = [
            ("recenter_address", &self.osc.recenter_address),
            ("recalibrate_address", &self.osc.recalibrate_address),
            ("sync_blink_address", &self.osc.sync_blink_address),
            ("eyes_y", &endpoints.eyes_y),
            ("left_eye_x", &endpoints.left_eye_x),
            ("right_eye_x", &endpoints.right_eye_x),
            ("left_eyelid_squeeze", &endpoints.left_eyelid_squeeze),
            ("right_eyelid_squeeze", &endpoints.right_eyelid_squeeze),
        ];
        for (name, path) in paths {
            if !path.starts_with('/') {
                return Err(ConfigError::validation(format!(
                    "Invalid OSC path for {name}: '{path}' (must start with '/')"
                )));
            }
        }

        for (eye, camera) in [("left_eye", &self.left_eye), ("right_eye", &self.right_eye)] {
            if !(-360..=360).contains(&camera.rotation_angle) {
                return Err(ConfigError::validation(format!(
                    "Invalid {eye}.rotation_angle: {} (must be -360-360)",
                    camera.rotation_angle
                )));
            }
        }

        let blob = &self.algorithm.blob;
        if blob.minsize > blob.maxsize {
            return Err(ConfigError::validation(format!(
                "Invalid blob size bounds: minsize {} > maxsize {}",
                blob.minsize, blob.maxsize
            )));
        }

        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp: OsString = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}

fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                debug!("set config data -- {key} => {value}");
                match target.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}
