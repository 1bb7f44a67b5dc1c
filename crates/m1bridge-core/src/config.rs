//! Configuration and settings management for m1bridge
//!
//! Provides the per-session configuration passed into the capture and
//! translation components. There is no process-wide mutable state: every
//! component receives an explicit settings value.
//!
//! Settings are organized into logical sections:
//! - Capture settings (sentinels, ack token, timeouts)
//! - Translator settings (Z offsets, safety ceiling, thickness override)
//! - Device settings (addresses and ports)

use crate::constants;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Job capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Substring marking the start of a job
    pub start_sentinel: String,
    /// Substring marking the end of a job
    pub end_sentinel: String,
    /// Token written back after every received line
    pub ack_token: String,
    /// Inactivity timeout while receiving, in milliseconds
    pub inactivity_timeout_ms: u64,
    /// Minimum number of lines for a job to be kept
    pub min_lines: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            start_sentinel: constants::START_SENTINEL.to_string(),
            end_sentinel: constants::END_SENTINEL.to_string(),
            ack_token: constants::ACK_TOKEN.to_string(),
            inactivity_timeout_ms: constants::INACTIVITY_TIMEOUT_MS,
            min_lines: constants::MIN_JOB_LINES,
        }
    }
}

impl CaptureSettings {
    /// The inactivity timeout as a [`Duration`]
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }
}

/// G-code translation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorSettings {
    /// Actual device Z coordinate for a material thickness of 0
    pub zero_offset_z: f64,
    /// Highest device-space Z value allowed after remapping (inclusive)
    pub lowest_z_height: f64,
    /// Material thickness override. `None` uses the Z values present in the
    /// G-code, just inverted.
    pub force_material_thickness: Option<f64>,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            zero_offset_z: constants::ZERO_OFFSET_Z,
            lowest_z_height: constants::LOWEST_Z_HEIGHT,
            force_material_thickness: None,
        }
    }
}

/// Laser cutter device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// IP address of the device
    pub ip: String,
    /// HTTP control port
    pub port: u16,
    /// HTTP camera service port
    pub camera_port: u16,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            ip: constants::USB_DEVICE_IP.to_string(),
            port: constants::DEVICE_PORT,
            camera_port: constants::CAMERA_PORT,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Job capture settings
    pub capture: CaptureSettings,
    /// Translation settings
    pub translator: TranslatorSettings,
    /// Device settings
    pub device: DeviceSettings,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::other(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<Self> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::other(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(self.clone())
    }

    /// Load from `path` if it exists, otherwise return defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }
}
