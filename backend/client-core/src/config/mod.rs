//! Client configuration.
//!
//! Loaded from a TOML file (missing file → defaults), then optionally
//! overridden from the environment. Every load is validated.
//!
//! ```toml
//! [ipc]
//! socket_path = "/tmp/detection.sock"
//! connect_timeout_secs = 30.0
//! retry_interval_secs = 1.0
//!
//! [session]
//! realtime = true
//! default_frame_interval = 5
//!
//! [detector]
//! confidence_threshold = 0.5
//! ```

use crate::error::config::ConfigError;
use crate::{DEFAULT_SOCKET_PATH, SESSION_DEFAULT_FPS};

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "detection-client";
const CONFIG_FILE_NAME: &str = "client.toml";

pub const ENV_CONFIG_PATH: &str = "DETECTION_CONFIG";
pub const ENV_SOCKET_PATH: &str = "DETECTION_SOCKET_PATH";
pub const ENV_REALTIME: &str = "DETECTION_REALTIME";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "DETECTION_CONFIDENCE_THRESHOLD";

// ============================================
// CONFIG STRUCTS
// ============================================

/// Transport settings for the supervisor socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    pub socket_path: PathBuf,
    /// Overall time allowed for establishing the connection.
    pub connect_timeout_secs: f64,
    /// Sleep between connection attempts.
    pub retry_interval_secs: f64,
    /// Deadline for writing one detection line.
    pub send_timeout_secs: f64,
    /// Read timeout used for the in-session Stop poll.
    pub poll_timeout_ms: u64,
    /// Requested `SO_SNDBUF`.
    pub send_buffer_bytes: usize,
    /// Longest accepted inbound line.
    pub max_message_bytes: usize,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            connect_timeout_secs: 30.0,
            retry_interval_secs: 1.0,
            send_timeout_secs: 5.0,
            poll_timeout_ms: 10,
            send_buffer_bytes: 1024 * 1024,
            max_message_bytes: 64 * 1024,
        }
    }
}

impl IpcConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs_f64(self.retry_interval_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.send_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pace frames to the effective frame rate instead of running flat out.
    pub realtime: bool,
    /// Used when neither the source nor the start command reports a rate.
    pub default_fps: f64,
    /// Stride used when a start command omits `frame_interval`.
    pub default_frame_interval: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            realtime: true,
            default_fps: SESSION_DEFAULT_FPS,
            default_frame_interval: 5,
        }
    }
}

/// Settings handed through to the detector capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub confidence_threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub ipc: IpcConfig,
    pub session: SessionConfig,
    pub detector: DetectorConfig,
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ClientConfig {
    /// `<config dir>/detection-client/client.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Config path from `DETECTION_CONFIG`, else [`ClientConfig::default_path`].
    pub fn resolve_path() -> Option<PathBuf> {
        env::var_os(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .or_else(Self::default_path)
    }

    /// Load config from a TOML file.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file does not exist.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: ClientConfig = toml::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config TOML: {e}");
            ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Full startup load: `.env`, then the file named by `DETECTION_CONFIG`
    /// (or the default location), then `DETECTION_*` overrides.
    pub fn from_environment() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded .env from: {:?}", path);
        }

        let mut config = match Self::resolve_path() {
            Some(path) => Self::load(&path)?,
            None => {
                warn!("No config directory on this platform, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `DETECTION_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override cannot be parsed
    /// or leaves the config invalid.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(socket_path) = env::var_os(ENV_SOCKET_PATH) {
            self.ipc.socket_path = PathBuf::from(socket_path);
        }

        if let Ok(raw) = env::var(ENV_REALTIME) {
            self.session.realtime = parse_bool(&raw).ok_or_else(|| {
                ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{ENV_REALTIME} must be a boolean, got '{raw}'"),
                }
            })?;
        }

        if let Ok(raw) = env::var(ENV_CONFIDENCE_THRESHOLD) {
            self.detector.confidence_threshold =
                raw.trim()
                    .parse::<f64>()
                    .map_err(|e| ConfigError::ValidationError {
                        location: ErrorLocation::from(Location::caller()),
                        reason: format!("{ENV_CONFIDENCE_THRESHOLD} is not a number: {e}"),
                    })?;
        }

        self.validate()
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ipc.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "socket_path cannot be empty".to_string(),
            });
        }

        let positive = [
            ("connect_timeout_secs", self.ipc.connect_timeout_secs),
            ("retry_interval_secs", self.ipc.retry_interval_secs),
            ("send_timeout_secs", self.ipc.send_timeout_secs),
            ("default_fps", self.session.default_fps),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{name} must be a positive number, got {value}"),
                });
            }
        }

        let durations = [
            ("connect_timeout_secs", self.ipc.connect_timeout_secs),
            ("retry_interval_secs", self.ipc.retry_interval_secs),
            ("send_timeout_secs", self.ipc.send_timeout_secs),
        ];
        for (name, value) in durations {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{name} is too large, got {value}"),
                });
            }
        }

        if self.ipc.max_message_bytes == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "max_message_bytes must be non-zero".to_string(),
            });
        }

        if self.session.default_frame_interval == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "default_frame_interval must be at least 1".to_string(),
            });
        }

        let threshold = self.detector.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("confidence_threshold must be within 0.0-1.0, got {threshold}"),
            });
        }

        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
