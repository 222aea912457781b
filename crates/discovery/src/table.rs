//! Shared peer table.
//!
//! Lock sections are short and synchronous everywhere the table is touched,
//! so a `std::sync::RwLock` is enough — no section ever holds the lock
//! across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use onionmesh_core::PeerDescriptor;

#[derive(Clone, Default)]
pub struct PeerTable {
    inner: Arc<RwLock<HashMap<String, PeerDescriptor>>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, peer: PeerDescriptor) {
        let id = peer.id();
        self.inner.write().expect("peer table lock poisoned").insert(id, peer);
    }

    pub fn contains(&self, peer_id: &str) -> bool {
        self.inner.read().expect("peer table lock poisoned").contains_key(peer_id)
    }

    pub fn get(&self, peer_id: &str) -> Option<PeerDescriptor> {
        self.inner.read().expect("peer table lock poisoned").get(peer_id).cloned()
    }

    pub fn all(&self) -> Vec<PeerDescriptor> {
        self.inner.read().expect("peer table lock poisoned").values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("peer table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let table = PeerTable::new();
        table.insert(PeerDescriptor::new("10.0.0.1", 6000, "PEM"));
        assert!(table.contains("10.0.0.1:6000"));
        assert_eq!(table.get("10.0.0.1:6000").unwrap().pubkey, "PEM");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn clone_shares_state() {
        let table = PeerTable::new();
        let other = table.clone();
        table.insert(PeerDescriptor::new("10.0.0.1", 6000, "PEM"));
        assert!(other.contains("10.0.0.1:6000"));
    }
}
