//! Node facade (§4.6): wires the long-term identity, peer discovery, the
//! client side of circuit building, the relay transport, and the
//! application modules into one running process.

mod error;
mod handle;

pub use error::{NodeError, Result};
pub use onionmesh_modules::{CHAT_MODULE, PROXY_MODULE, TORRENT_MODULE};
pub use onionmesh_relay::DEFAULT_PORT_RANGE;

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use onionmesh_core::{ModuleRegistry, NodeHandle, PeerDescriptor, Tag, Value};
use onionmesh_crypto::Identity;
use onionmesh_discovery::{DiscoveryService, PeerTable, DEFAULT_DISCOVERY_PORT};
use onionmesh_modules::{ChatModule, ProxyModule, TorrentModule};
use onionmesh_relay::{Relay, RelayConfig};
use tokio::task::JoinHandle;
use tracing::warn;

use handle::NodeHandleRef;

/// Hop count a circuit is built with when a caller doesn't override it (§4.4).
pub const DEFAULT_HOPS: usize = 3;

/// Everything needed to bring up a node's sockets before any traffic flows.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub discovery_port: u16,
    pub relay_port_range: Range<u16>,
    pub hops: usize,
    pub connect_timeout: Duration,
    /// Where the trust-on-first-use pin store lives; callers normally source
    /// this from a settings document rather than the bare default here.
    pub pins_path: PathBuf,
    /// Host this node advertises itself as in HELLO/PEX — the address peers
    /// should dial back on, not the discovery socket's own address.
    pub advertise_host: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            discovery_port: DEFAULT_DISCOVERY_PORT,
            relay_port_range: DEFAULT_PORT_RANGE,
            hops: DEFAULT_HOPS,
            connect_timeout: Duration::from_secs(3),
            pins_path: PathBuf::from("pins.json"),
            advertise_host: "127.0.0.1".to_string(),
        }
    }
}

/// The node's own state: its identity, the shared peer table, and the
/// client-side parameters for building outbound circuits.
///
/// Deliberately holds no module registry — only the relay's exit side needs
/// one, and building it requires a [`NodeHandle`] back to this struct, which
/// would be circular if `Node` owned the registry too (see [`start`]).
pub struct Node {
    identity: Arc<Identity>,
    peers: PeerTable,
    relay_port: u16,
    hops: usize,
    connect_timeout: Duration,
}

impl Node {
    pub fn pubkey(&self) -> &str {
        self.identity.public_pem()
    }

    pub fn relay_port(&self) -> u16 {
        self.relay_port
    }

    pub fn peers(&self) -> Vec<PeerDescriptor> {
        self.peers.all()
    }

    /// Send `payload` to `module` through a circuit of randomly sampled peers.
    pub fn send_onion(&self, module: &str, payload: Value) {
        let circuit = onionmesh_circuit::build_random(&self.peers, self.hops);
        self.dispatch(module, payload, circuit);
    }

    /// Send `payload` to `module` through a circuit ending at `peer_id`.
    pub fn send_onion_to(&self, peer_id: &str, module: &str, payload: Value) {
        let Some(target) = self.peers.get(peer_id) else {
            warn!(peer_id, "unknown peer, dropping targeted onion send");
            return;
        };
        let circuit = onionmesh_circuit::build_targeted(&self.peers, &target, self.hops);
        self.dispatch(module, payload, circuit);
    }

    /// Open a direct, unwrapped connection to `host:port` and send one frame —
    /// used only for the proxy module's response callback (§10.3).
    pub fn send_raw(&self, host: &str, port: u16, tag: Tag, payload: Value) {
        let host = host.to_string();
        let connect_timeout = self.connect_timeout;
        tokio::spawn(async move {
            if let Err(e) = onionmesh_relay::send_frame(&host, port, tag, &payload, connect_timeout).await {
                warn!(error = %e, %host, port, "failed to send raw frame");
            }
        });
    }

    fn dispatch(&self, module: &str, payload: Value, circuit: Vec<PeerDescriptor>) {
        if circuit.is_empty() {
            warn!("no peers available, dropping onion send");
            return;
        }
        let final_value = Value::map([("module", Value::str(module)), ("payload", payload)]);
        let blob = match onionmesh_circuit::wrap(final_value, &circuit) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "failed to wrap onion payload");
                return;
            }
        };

        let entry = circuit[0].clone();
        let connect_timeout = self.connect_timeout;
        tokio::spawn(async move {
            let result =
                onionmesh_relay::send_frame(&entry.host, entry.port, Tag::Onion, &Value::Bytes(blob), connect_timeout)
                    .await;
            if let Err(e) = result {
                warn!(error = %e, peer = %entry.id(), "failed to send onion frame to entry hop");
            }
        });
    }
}

/// The three application modules registered on a running node, kept
/// reachable so a front end (the CLI) can drive them directly.
pub struct Modules {
    pub chat: Arc<ChatModule>,
    pub torrent: Arc<TorrentModule>,
    pub proxy: Arc<ProxyModule>,
}

/// Background tasks spawned by [`start`]. Dropping these doesn't stop the
/// tasks; hold them only to observe or await failure.
pub struct Handles {
    pub relay: JoinHandle<onionmesh_relay::Result<()>>,
    pub discovery: JoinHandle<onionmesh_discovery::Result<()>>,
}

/// A fully assembled, running node.
pub struct Runtime {
    pub node: Arc<Node>,
    pub modules: Modules,
    pub discovery: Arc<DiscoveryService>,
    pub handles: Handles,
}

/// Bring up a node: bind the relay's listening port, bind discovery and load
/// its pin store, construct the node facade, wire the application modules to
/// it, and finish constructing the relay and discovery loops.
///
/// The ordering here resolves what would otherwise be a circular
/// construction: the relay needs a module registry to hand incoming exit
/// traffic to, each module needs a [`NodeHandle`] back to this node, and the
/// node needs to know its own relay port (advertised to peers) before any of
/// that can happen. Binding the listener first — without yet building the
/// registry — breaks the cycle; [`onionmesh_relay::bind_listener`] and
/// [`Relay::from_listener`] exist as two steps for exactly this reason.
pub async fn start(config: NodeConfig) -> Result<Runtime> {
    let identity = Arc::new(Identity::generate()?);

    let (listener, relay_port) = onionmesh_relay::bind_listener(config.relay_port_range.clone()).await?;

    let local_descriptor = PeerDescriptor::new(config.advertise_host.clone(), relay_port, identity.public_pem().to_string());
    let discovery = DiscoveryService::bind(local_descriptor, config.discovery_port, config.pins_path.clone()).await?;
    let peers = discovery.peer_table();

    let node = Arc::new(Node {
        identity: identity.clone(),
        peers: peers.clone(),
        relay_port,
        hops: config.hops,
        connect_timeout: config.connect_timeout,
    });

    let node_handle: Arc<dyn NodeHandle> = Arc::new(NodeHandleRef::new(&node));

    let chat = Arc::new(ChatModule::new(node_handle.clone()));
    let torrent = Arc::new(TorrentModule::new(node_handle.clone()));
    let proxy = Arc::new(ProxyModule::new(node_handle.clone(), relay_port));

    let mut registry = ModuleRegistry::new();
    registry.register(CHAT_MODULE, chat.clone());
    registry.register(TORRENT_MODULE, torrent.clone());
    registry.register(PROXY_MODULE, proxy.clone());

    let relay_config = RelayConfig {
        port_range: config.relay_port_range,
        connect_timeout: config.connect_timeout,
        ..RelayConfig::default()
    };
    let relay = Relay::from_listener(listener, relay_port, identity, peers, registry, &relay_config);

    let discovery = Arc::new(discovery);
    let discovery_for_task = discovery.clone();

    let handles = Handles {
        relay: tokio::spawn(relay.run()),
        discovery: tokio::spawn(async move { discovery_for_task.run().await }),
    };

    Ok(Runtime {
        node,
        modules: Modules { chat, torrent, proxy },
        discovery,
        handles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_node(peers: PeerTable) -> Node {
        Node {
            identity: Arc::new(Identity::generate().unwrap()),
            peers,
            relay_port: 6000,
            hops: 3,
            connect_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn send_onion_with_no_peers_does_not_panic() {
        let node = bare_node(PeerTable::new());
        node.send_onion("chat", Value::map([("text", Value::str("hi"))]));
    }

    #[tokio::test]
    async fn send_onion_to_unknown_peer_does_not_panic() {
        let node = bare_node(PeerTable::new());
        node.send_onion_to("10.0.0.9:6000", "chat", Value::Null);
    }

    #[tokio::test]
    async fn node_handle_ref_reports_cached_pubkey_after_node_drops() {
        let node = Arc::new(bare_node(PeerTable::new()));
        let expected_pubkey = node.pubkey().to_string();
        let handle = NodeHandleRef::new(&node);
        drop(node);

        assert_eq!(handle.pubkey(), expected_pubkey);
        assert!(handle.peers().is_empty());
        handle.send_onion("chat", Value::Null);
    }

    #[tokio::test]
    async fn node_handle_ref_forwards_peers() {
        let peers = PeerTable::new();
        peers.insert(PeerDescriptor::new("10.0.0.1", 6000, "PEM"));
        let node = Arc::new(bare_node(peers));
        let handle = NodeHandleRef::new(&node);

        assert_eq!(handle.peers().len(), 1);
    }
}
