//! Peer descriptors and the `"host:port"` identity convention.

use serde::{Deserialize, Serialize};

/// `{host, port, pubkey}` as carried in HELLO and PEX payloads.
///
/// `pubkey` is the PEM/SubjectPublicKeyInfo encoding of the peer's long-term
/// RSA public key. `port` always refers to the relay's connection-oriented
/// listening port, never the discovery datagram port (see `PeerId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDescriptor {
    pub host: String,
    pub port: u16,
    pub pubkey: String,
}

impl PeerDescriptor {
    pub fn new(host: impl Into<String>, port: u16, pubkey: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            pubkey: pubkey.into(),
        }
    }

    /// The peer table identity for this descriptor: `"host:port"`.
    pub fn id(&self) -> String {
        peer_id(&self.host, self.port)
    }
}

/// Build the `"host:port"` identity string used as the peer table key.
pub fn peer_id(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_host_colon_port() {
        let d = PeerDescriptor::new("10.0.0.5", 6001, "pem-data");
        assert_eq!(d.id(), "10.0.0.5:6001");
        assert_eq!(peer_id("10.0.0.5", 6001), d.id());
    }
}
