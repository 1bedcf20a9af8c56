//! # MarlinKit Settings
//!
//! Handles engine configuration: defaults, validation, and JSON/TOML
//! persistence.

pub mod config;
pub mod error;

pub use config::{CommandTable, Config, MotionSettings, ProtocolSettings, SerialSettings};
pub use error::{SettingsError, SettingsResult};
