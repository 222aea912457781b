//! OnionMesh Settings
//!
//! Application configuration for the node and its CLI front end.
//!
//! ## Features
//!
//! - Network settings (discovery port, relay port range, hop count, manual peers)
//! - Node settings (pin store location, connect timeout)
//! - Cross-platform config file storage
//! - JSON serialization, additive across versions via `#[serde(default)]`
//!
//! ## Usage
//!
//! ```no_run
//! use onionmesh_settings::Settings;
//!
//! let mut settings = Settings::load_or_default()?;
//! settings.network.hops = 3;
//! settings.save()?;
//! # Ok::<(), onionmesh_settings::SettingsError>(())
//! ```

mod config;

pub use config::{NetworkSettings, NodeSettings, Settings};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Read(std::io::Error),

    #[error("failed to write settings: {0}")]
    Write(std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(serde_json::Error),

    #[error("failed to create config directory: {0}")]
    CreateDir(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// The platform config directory this crate stores all of its own files
/// under, e.g. `~/.config/onionmesh` on Linux.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("onionmesh")
}

pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

/// Where the trust-on-first-use pin store lives unless a settings document
/// overrides it (§3 Data Model, "Pin Store").
pub fn default_pins_path() -> PathBuf {
    default_config_dir().join("pins.json")
}
