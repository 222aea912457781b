//! The [`onionmesh_core::NodeHandle`] modules are given.

use std::sync::{Arc, Weak};

use onionmesh_core::{NodeHandle, PeerDescriptor, Tag, Value};
use tracing::debug;

use crate::Node;

/// A cached pubkey (stable for the node's process lifetime) plus a weak
/// back-reference to the owning [`Node`].
///
/// Weak, not `Arc`: the owning direction is `Node -> modules` (modules are
/// reached through the registry handed to the relay), so a strong pointer
/// back here would close a reference cycle.
pub struct NodeHandleRef {
    pubkey: String,
    node: Weak<Node>,
}

impl NodeHandleRef {
    pub fn new(node: &Arc<Node>) -> Self {
        Self {
            pubkey: node.pubkey().to_string(),
            node: Arc::downgrade(node),
        }
    }
}

impl NodeHandle for NodeHandleRef {
    fn pubkey(&self) -> &str {
        &self.pubkey
    }

    fn peers(&self) -> Vec<PeerDescriptor> {
        match self.node.upgrade() {
            Some(node) => node.peers(),
            None => {
                debug!("node already dropped, returning empty peer list");
                Vec::new()
            }
        }
    }

    fn send_onion(&self, module: &str, payload: Value) {
        if let Some(node) = self.node.upgrade() {
            node.send_onion(module, payload);
        }
    }

    fn send_onion_to(&self, peer_id: &str, module: &str, payload: Value) {
        if let Some(node) = self.node.upgrade() {
            node.send_onion_to(peer_id, module, payload);
        }
    }

    fn send_raw(&self, host: &str, port: u16, tag: Tag, payload: Value) {
        if let Some(node) = self.node.upgrade() {
            node.send_raw(host, port, tag, payload);
        }
    }
}
