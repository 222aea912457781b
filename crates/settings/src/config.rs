//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{default_settings_path, Result, SettingsError};

/// Top-level settings document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub node: NodeSettings,

    /// Path this document was loaded from; not itself serialized.
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: NetworkSettings::default(),
            node: NodeSettings::default(),
            config_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the default path, or start from defaults if it
    /// doesn't exist yet.
    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&default_settings_path())
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(SettingsError::Read)?;
            let mut settings: Settings = serde_json::from_str(&content).map_err(SettingsError::Parse)?;
            settings.config_path = Some(path.clone());
            info!(?path, "loaded settings");
            Ok(settings)
        } else {
            let mut settings = Self::default();
            settings.config_path = Some(path.clone());
            Ok(settings)
        }
    }

    /// Save to the path this document was loaded from, or the default path
    /// if it was never loaded from one.
    pub fn save(&self) -> Result<()> {
        let path = self.config_path.clone().unwrap_or_else(default_settings_path);
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(SettingsError::CreateDir)?;
            }
        }
        let content = serde_json::to_string_pretty(self).map_err(SettingsError::Parse)?;
        std::fs::write(path, content).map_err(SettingsError::Write)?;
        info!(?path, "saved settings");
        Ok(())
    }
}

/// Parameters governing circuit construction and peer discovery (§4.3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// UDP port used for HELLO/PEX discovery broadcasts.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,

    /// First port of the relay's TCP listen range.
    #[serde(default = "default_relay_port_start")]
    pub relay_port_start: u16,

    /// One past the last port of the relay's TCP listen range.
    #[serde(default = "default_relay_port_end")]
    pub relay_port_end: u16,

    /// Number of relays an onion circuit is built with.
    #[serde(default = "default_hops")]
    pub hops: usize,

    /// Host this node advertises to peers as its relay address.
    #[serde(default = "default_advertise_host")]
    pub advertise_host: String,

    /// `"host:port"` entries to manually HELLO on startup, for peers outside
    /// broadcast range of the local discovery socket.
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

fn default_discovery_port() -> u16 {
    5000
}

fn default_relay_port_start() -> u16 {
    6000
}

fn default_relay_port_end() -> u16 {
    6010
}

fn default_hops() -> usize {
    3
}

fn default_advertise_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            relay_port_start: default_relay_port_start(),
            relay_port_end: default_relay_port_end(),
            hops: default_hops(),
            advertise_host: default_advertise_host(),
            bootstrap_peers: Vec::new(),
        }
    }
}

/// Local process parameters that don't affect the wire protocol (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    /// Trust-on-first-use pin store path; `None` resolves to
    /// [`crate::default_pins_path`] at node start-up.
    #[serde(default)]
    pub pins_path: Option<PathBuf>,

    /// Relay TCP connect timeout, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    3
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            pins_path: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_protocol_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.network.discovery_port, 5000);
        assert_eq!(settings.network.relay_port_start, 6000);
        assert_eq!(settings.network.relay_port_end, 6010);
        assert_eq!(settings.network.hops, 3);
        assert!(settings.network.bootstrap_peers.is_empty());
        assert_eq!(settings.node.connect_timeout_secs, 3);
    }

    #[test]
    fn settings_roundtrip_through_json() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.network.hops, settings.network.hops);
        assert_eq!(parsed.network.discovery_port, settings.network.discovery_port);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.network.hops, default_hops());
        assert!(parsed.node.pins_path.is_none());
    }

    #[test]
    fn load_from_missing_path_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings.network.hops, default_hops());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.network.hops = 5;
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(&path).unwrap();
        assert_eq!(reloaded.network.hops, 5);
    }
}
