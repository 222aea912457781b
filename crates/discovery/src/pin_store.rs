//! Trust-on-first-use pin store.
//!
//! A single JSON document mapping `"host:port" -> pubkey PEM`, write-through
//! on every new pin. Once an identity is pinned, a descriptor for the same
//! identity with a different key is rejected by [`crate::validate`] before
//! it ever reaches this store — `pin` itself has no notion of "update".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{DiscoveryError, Result};

/// `"host:port" -> pubkey PEM` persisted as a single JSON file.
pub struct PinStore {
    path: PathBuf,
    pins: HashMap<String, String>,
}

impl PinStore {
    /// Load the pin store from `path`, or start empty if the file doesn't
    /// exist yet (the first `pin()` call will create it).
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let pins = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(DiscoveryError::PinStoreRead)?;
            serde_json::from_str(&content).map_err(DiscoveryError::PinStoreParse)?
        } else {
            HashMap::new()
        };
        Ok(Self { path, pins })
    }

    pub fn get(&self, peer_id: &str) -> Option<&str> {
        self.pins.get(peer_id).map(String::as_str)
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.pins.contains_key(peer_id)
    }

    /// Pin `peer_id` to `pubkey_pem` and persist the store immediately.
    ///
    /// Callers are responsible for ensuring `peer_id` is not already pinned
    /// to a different key (see [`crate::validate::validate_peer`]) — this
    /// method unconditionally overwrites, matching the "absent" branch of
    /// TOFU, not the "mismatch" branch.
    pub fn pin(&mut self, peer_id: impl Into<String>, pubkey_pem: impl Into<String>) -> Result<()> {
        self.pins.insert(peer_id.into(), pubkey_pem.into());
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        atomic_write_json(&self.path, &self.pins)
    }
}

/// Serialize `value` to JSON and replace `path` atomically: write to a
/// sibling temp file then rename over the target. The source design
/// tolerates a non-atomic rewrite here; we prefer the safer replace.
fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(DiscoveryError::PinStoreWrite)?;
        }
    }
    let tmp_path = path.with_extension("tmp");
    let content = serde_json::to_string_pretty(value).map_err(DiscoveryError::PinStoreParse)?;
    std::fs::write(&tmp_path, content).map_err(DiscoveryError::PinStoreWrite)?;
    std::fs::rename(&tmp_path, path).map_err(DiscoveryError::PinStoreWrite)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PinStore::load(dir.path().join("pins.json")).unwrap();
        assert!(store.get("10.0.0.1:6000").is_none());
    }

    #[test]
    fn pin_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pins.json");

        let mut store = PinStore::load(&path).unwrap();
        store.pin("10.0.0.1:6000", "PEMDATA").unwrap();

        let reloaded = PinStore::load(&path).unwrap();
        assert_eq!(reloaded.get("10.0.0.1:6000"), Some("PEMDATA"));
    }

    #[test]
    fn overwrite_changes_pin() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PinStore::load(dir.path().join("pins.json")).unwrap();
        store.pin("a:1", "K1").unwrap();
        store.pin("a:1", "K2").unwrap();
        assert_eq!(store.get("a:1"), Some("K2"));
    }
}
