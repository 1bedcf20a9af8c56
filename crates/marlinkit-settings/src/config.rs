//! Configuration for MarlinKit
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats stored in platform-specific
//! directories.
//!
//! Configuration is organized into logical sections:
//! - Serial settings (port, baud rate, read timeout)
//! - Protocol settings (settle delay, acknowledgment timeouts, noise bound)
//! - Motion settings (default feed rate, soft limits)
//! - Command table (the literal G-code text the engine emits)
//!
//! Everything is immutable once handed to the engine; a changed file takes
//! effect on the next connect.

use crate::error::{SettingsError, SettingsResult};
use marlinkit_core::{CoordinateMode, Plane, SoftLimits};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Serial port settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device path, e.g. `/dev/ttyACM0`. When absent the first detected
    /// printer-looking port is used.
    pub port: Option<String>,
    /// Baud rate for the serial link
    pub baud_rate: u32,
    /// Read timeout of the underlying port in milliseconds
    ///
    /// This bounds a single blocking read, not a protocol wait. Keep it
    /// short; the protocol timeouts live in [`ProtocolSettings`].
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
            timeout_ms: 50,
        }
    }
}

impl SerialSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Command/acknowledgment protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// Delay after opening the port before any bytes are written; Marlin
    /// resets when the serial line opens and ignores input while booting
    pub settle_delay_ms: u64,
    /// Poll interval while waiting for response bytes
    pub poll_interval_ms: u64,
    /// How long to wait for a command acknowledgment
    pub ack_timeout_ms: u64,
    /// How long to wait for the identification report
    pub identify_timeout_ms: u64,
    /// Quiet gap that ends identification once banner lines have arrived
    pub identify_quiet_ms: u64,
    /// How many non-acknowledgment lines to tolerate per command before
    /// the wait degrades into a timeout
    pub max_unrecognized_lines: u32,
    /// Pause after each acknowledged command before the next one
    pub inter_command_delay_ms: u64,
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
            poll_interval_ms: 100,
            ack_timeout_ms: 30_000,
            identify_timeout_ms: 10_000,
            identify_quiet_ms: 250,
            max_unrecognized_lines: 8,
            inter_command_delay_ms: 100,
        }
    }
}

impl ProtocolSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn identify_timeout(&self) -> Duration {
        Duration::from_millis(self.identify_timeout_ms)
    }

    pub fn identify_quiet(&self) -> Duration {
        Duration::from_millis(self.identify_quiet_ms)
    }

    pub fn inter_command_delay(&self) -> Duration {
        Duration::from_millis(self.inter_command_delay_ms)
    }
}

/// Motion defaults and machine travel limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Feed rate in units/min applied right after connect
    pub default_feed_rate: f64,
    /// Per-axis soft limits
    pub soft_limits: SoftLimits,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            default_feed_rate: 5000.0,
            soft_limits: SoftLimits::default(),
        }
    }
}

/// The literal command text the engine writes to the wire
///
/// Kept in configuration so a firmware with remapped codes can be driven
/// without code changes. Defaults are the stock Marlin assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTable {
    /// Energize steppers
    pub enable_motors: String,
    /// De-energize steppers; also written after every command as the
    /// transmission sentinel
    pub disable_motors: String,
    /// Homing cycle
    pub auto_home: String,
    /// Absolute positioning
    pub set_absolute: String,
    /// Relative positioning
    pub set_relative: String,
    /// XY arc plane
    pub set_plane_xy: String,
    /// ZX arc plane
    pub set_plane_zx: String,
    /// YZ arc plane
    pub set_plane_yz: String,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            enable_motors: "M17".to_string(),
            disable_motors: "M84".to_string(),
            auto_home: "G28".to_string(),
            set_absolute: "G90".to_string(),
            set_relative: "G91".to_string(),
            set_plane_xy: "G17".to_string(),
            set_plane_zx: "G18".to_string(),
            set_plane_yz: "G19".to_string(),
        }
    }
}

impl CommandTable {
    /// Command text selecting a coordinate mode
    pub fn mode_command(&self, mode: CoordinateMode) -> &str {
        match mode {
            CoordinateMode::Absolute => &self.set_absolute,
            CoordinateMode::Relative => &self.set_relative,
        }
    }

    /// Command text selecting an arc plane
    pub fn plane_command(&self, plane: Plane) -> &str {
        match plane {
            Plane::Xy => &self.set_plane_xy,
            Plane::Zx => &self.set_plane_zx,
            Plane::Yz => &self.set_plane_yz,
        }
    }

    fn entries(&self) -> [(&'static str, &str); 8] {
        [
            ("commands.enable_motors", &self.enable_motors),
            ("commands.disable_motors", &self.disable_motors),
            ("commands.auto_home", &self.auto_home),
            ("commands.set_absolute", &self.set_absolute),
            ("commands.set_relative", &self.set_relative),
            ("commands.set_plane_xy", &self.set_plane_xy),
            ("commands.set_plane_zx", &self.set_plane_zx),
            ("commands.set_plane_yz", &self.set_plane_yz),
        ]
    }
}

/// Complete engine configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Serial port settings
    pub serial: SerialSettings,
    /// Protocol timing and tolerance settings
    pub protocol: ProtocolSettings,
    /// Motion defaults and limits
    pub motion: MotionSettings,
    /// Wire command table
    pub commands: CommandTable,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            return Err(SettingsError::LoadError(
                "config file must be .json or .toml".to_string(),
            ));
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self).map_err(|e| SettingsError::SaveError(e.to_string()))?
        } else {
            return Err(SettingsError::SaveError(
                "config file must be .json or .toml".to_string(),
            ));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        fn invalid(key: &str, reason: &str) -> SettingsError {
            SettingsError::InvalidSetting {
                key: key.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.serial.baud_rate == 0 {
            return Err(invalid("serial.baud_rate", "must be > 0"));
        }
        if self.serial.timeout_ms == 0 {
            return Err(invalid("serial.timeout_ms", "must be > 0"));
        }

        if self.protocol.poll_interval_ms == 0 {
            return Err(invalid("protocol.poll_interval_ms", "must be > 0"));
        }
        if self.protocol.ack_timeout_ms == 0 {
            return Err(invalid("protocol.ack_timeout_ms", "must be > 0"));
        }
        if self.protocol.identify_timeout_ms == 0 {
            return Err(invalid("protocol.identify_timeout_ms", "must be > 0"));
        }

        if !(self.motion.default_feed_rate.is_finite() && self.motion.default_feed_rate > 0.0) {
            return Err(invalid("motion.default_feed_rate", "must be > 0"));
        }
        if !self.motion.soft_limits.is_valid() {
            return Err(invalid(
                "motion.soft_limits",
                "each axis needs finite limits with max > min",
            ));
        }

        for (key, text) in self.commands.entries() {
            if text.trim().is_empty() {
                return Err(invalid(key, "must not be empty"));
            }
        }

        Ok(())
    }

    /// Platform default location of the config file
    pub fn default_config_path() -> SettingsResult<PathBuf> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no config or home directory".to_string())
            })?;
        Ok(base.join("marlinkit").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist yet
    pub fn load_default() -> SettingsResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}
