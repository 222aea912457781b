//! Peer validation: trust-on-first-use against the pin store.

use onionmesh_core::PeerDescriptor;

use crate::pin_store::PinStore;
use crate::table::PeerTable;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Not previously seen; pinned and added to the table.
    New,
    /// Previously pinned to the same key; present (or now present) in the table.
    Known,
    /// Previously pinned to a different key. The peer table is left untouched.
    Rejected,
}

/// Validate an inbound descriptor against local identity, then the pin store.
///
/// `local_id` is this node's own `"host:port"` identity; a descriptor that
/// matches it is silently dropped (self-announcement, not a peer) by
/// returning `Rejected` without consulting the pin store.
pub fn validate_peer(
    descriptor: &PeerDescriptor,
    local_id: &str,
    pins: &mut PinStore,
    table: &PeerTable,
) -> Result<Validation> {
    let id = descriptor.id();
    if id == local_id {
        return Ok(Validation::Rejected);
    }

    match pins.get(&id) {
        None => {
            pins.pin(id, descriptor.pubkey.clone())?;
            table.insert(descriptor.clone());
            Ok(Validation::New)
        }
        Some(pinned) if pinned == descriptor.pubkey => {
            table.insert(descriptor.clone());
            Ok(Validation::Known)
        }
        Some(_) => Ok(Validation::Rejected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(pubkey: &str) -> PeerDescriptor {
        PeerDescriptor::new("10.0.0.1", 6000, pubkey)
    }

    #[test]
    fn unseen_peer_is_pinned_and_added() {
        let dir = tempfile::tempdir().unwrap();
        let mut pins = PinStore::load(dir.path().join("pins.json")).unwrap();
        let table = PeerTable::new();

        let v = validate_peer(&descriptor("KEY1"), "self:9999", &mut pins, &table).unwrap();
        assert_eq!(v, Validation::New);
        assert!(table.contains("10.0.0.1:6000"));
        assert_eq!(pins.get("10.0.0.1:6000"), Some("KEY1"));
    }

    #[test]
    fn matching_pin_is_known() {
        let dir = tempfile::tempdir().unwrap();
        let mut pins = PinStore::load(dir.path().join("pins.json")).unwrap();
        let table = PeerTable::new();

        validate_peer(&descriptor("KEY1"), "self:9999", &mut pins, &table).unwrap();
        let v = validate_peer(&descriptor("KEY1"), "self:9999", &mut pins, &table).unwrap();
        assert_eq!(v, Validation::Known);
    }

    #[test]
    fn mismatched_pin_is_rejected_and_table_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut pins = PinStore::load(dir.path().join("pins.json")).unwrap();
        let table = PeerTable::new();

        validate_peer(&descriptor("KEY1"), "self:9999", &mut pins, &table).unwrap();
        table.insert(descriptor("KEY1"));
        let before = table.len();

        let v = validate_peer(&descriptor("IMPOSTOR"), "self:9999", &mut pins, &table).unwrap();
        assert_eq!(v, Validation::Rejected);
        assert_eq!(table.len(), before);
        assert_eq!(pins.get("10.0.0.1:6000"), Some("KEY1"));
    }

    #[test]
    fn self_descriptor_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut pins = PinStore::load(dir.path().join("pins.json")).unwrap();
        let table = PeerTable::new();

        let v = validate_peer(&descriptor("KEY1"), "10.0.0.1:6000", &mut pins, &table).unwrap();
        assert_eq!(v, Validation::Rejected);
        assert!(table.is_empty());
    }
}
