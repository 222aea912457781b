//! UDP broadcast discovery.
//!
//! Two concurrent loops share one socket: an announce loop that broadcasts a
//! HELLO every few seconds, and a receive loop that validates inbound HELLO
//! and PEX datagrams and answers new peers with a targeted HELLO plus a PEX
//! listing of everything currently known. The well-known discovery port
//! (5000) is a fixed rendezvous, distinct from the relay's connection port
//! range — other variants that scan the relay ports directly are not
//! implemented here.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use onionmesh_core::{PeerDescriptor, Tag, Value};
use rand::Rng;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{DiscoveryError, Result};
use crate::pin_store::PinStore;
use crate::table::PeerTable;
use crate::validate::{validate_peer, Validation};

/// Port every node listens on for HELLO/PEX datagrams.
pub const DEFAULT_DISCOVERY_PORT: u16 = 5000;

const ANNOUNCE_MIN: Duration = Duration::from_secs(5);
const ANNOUNCE_MAX: Duration = Duration::from_secs(10);
const MAX_DATAGRAM: usize = 64 * 1024;

pub struct DiscoveryService {
    local: PeerDescriptor,
    discovery_port: u16,
    table: PeerTable,
    pins: Arc<Mutex<PinStore>>,
    socket: Arc<UdpSocket>,
}

impl DiscoveryService {
    /// Bind the discovery socket and load (or create) the pin store at `pins_path`.
    ///
    /// `local` carries this node's relay host/port/pubkey — the descriptor
    /// advertised in every HELLO, not the discovery socket's own address.
    pub async fn bind(
        local: PeerDescriptor,
        discovery_port: u16,
        pins_path: impl Into<std::path::PathBuf>,
    ) -> Result<Self> {
        let pins = PinStore::load(pins_path)?;
        let socket = bind_broadcast_socket(discovery_port)?;
        Ok(Self {
            local,
            discovery_port,
            table: PeerTable::new(),
            pins: Arc::new(Mutex::new(pins)),
            socket: Arc::new(socket),
        })
    }

    pub fn peer_table(&self) -> PeerTable {
        self.table.clone()
    }

    /// Run the announce and receive loops until either fails.
    pub async fn run(&self) -> Result<()> {
        tokio::try_join!(self.announce_loop(), self.receive_loop())?;
        Ok(())
    }

    async fn announce_loop(&self) -> Result<()> {
        let broadcast_addr = SocketAddr::from((Ipv4Addr::BROADCAST, self.discovery_port));
        loop {
            let payload = descriptor_to_value(&self.local);
            let frame = onionmesh_codec::encode(Tag::Hello, &payload);
            if let Err(e) = self.socket.send_to(&frame, broadcast_addr).await {
                warn!(error = %e, "failed to broadcast HELLO");
            } else {
                debug!(to = %broadcast_addr, "broadcast HELLO");
            }
            let jitter_ms = rand::thread_rng().gen_range(ANNOUNCE_MIN.as_millis()..=ANNOUNCE_MAX.as_millis());
            sleep(Duration::from_millis(jitter_ms as u64)).await;
        }
    }

    async fn receive_loop(&self) -> Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, from) = self
                .socket
                .recv_from(&mut buf)
                .await
                .map_err(DiscoveryError::Bind)?;
            let Some((tag, payload)) = onionmesh_codec::decode(&buf[..len]) else {
                continue;
            };
            self.handle(tag, payload, from).await;
        }
    }

    async fn handle(&self, tag: Tag, payload: Value, from: SocketAddr) {
        match tag {
            Tag::Hello => self.handle_hello(&payload, from).await,
            Tag::Pex => self.handle_pex(&payload),
            _ => debug!(?tag, %from, "ignoring non-discovery frame on discovery socket"),
        }
    }

    async fn handle_hello(&self, payload: &Value, from: SocketAddr) {
        let Some(descriptor) = value_to_descriptor(payload) else {
            warn!(%from, "malformed HELLO payload");
            return;
        };
        let local_id = self.local.id();
        let validation = {
            let mut pins = self.pins.lock().expect("pin store lock poisoned");
            validate_peer(&descriptor, &local_id, &mut pins, &self.table)
        };
        let validation = match validation {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "failed to validate peer");
                return;
            }
        };
        if validation == Validation::New {
            info!(peer = %descriptor.id(), "discovered new peer");
            self.reply_with_hello_and_pex(descriptor.host.as_str(), self.discovery_port).await;
        }
    }

    fn handle_pex(&self, payload: &Value) {
        let Some(entries) = payload.as_list() else {
            return;
        };
        let local_id = self.local.id();
        let mut pins = self.pins.lock().expect("pin store lock poisoned");
        for entry in entries {
            let Some(descriptor) = value_to_descriptor(entry) else {
                continue;
            };
            let _ = validate_peer(&descriptor, &local_id, &mut pins, &self.table);
        }
    }

    async fn reply_with_hello_and_pex(&self, host: &str, port: u16) {
        let addr: SocketAddr = match format!("{host}:{port}").parse() {
            Ok(a) => a,
            Err(_) => return,
        };
        let hello = onionmesh_codec::encode(Tag::Hello, &descriptor_to_value(&self.local));
        if let Err(e) = self.socket.send_to(&hello, addr).await {
            warn!(error = %e, %addr, "failed to send targeted HELLO");
        }

        let pex_payload = Value::list(self.table.all().iter().map(descriptor_to_value));
        let pex = onionmesh_codec::encode(Tag::Pex, &pex_payload);
        if let Err(e) = self.socket.send_to(&pex, addr).await {
            warn!(error = %e, %addr, "failed to send PEX");
        }
    }

    /// Send a one-shot targeted HELLO to `host:port`, used for manual connect.
    pub async fn manual_connect(&self, host: &str, port: u16) -> Result<()> {
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| DiscoveryError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad address")))?;
        let hello = onionmesh_codec::encode(Tag::Hello, &descriptor_to_value(&self.local));
        self.socket.send_to(&hello, addr).await.map_err(DiscoveryError::Bind)?;
        Ok(())
    }
}

fn bind_broadcast_socket(port: u16) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(DiscoveryError::Bind)?;
    socket.set_reuse_address(true).map_err(DiscoveryError::Bind)?;
    socket.set_broadcast(true).map_err(DiscoveryError::Bind)?;
    socket.set_nonblocking(true).map_err(DiscoveryError::Bind)?;
    let addr: SocketAddr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into()).map_err(DiscoveryError::Bind)?;
    UdpSocket::from_std(socket.into()).map_err(DiscoveryError::Bind)
}

fn descriptor_to_value(d: &PeerDescriptor) -> Value {
    Value::map([
        ("host", Value::str(d.host.clone())),
        ("port", Value::Int(d.port as i64)),
        ("pub_key", Value::str(d.pubkey.clone())),
    ])
}

fn value_to_descriptor(v: &Value) -> Option<PeerDescriptor> {
    let host = v.get("host")?.as_str()?.to_string();
    let port = v.get("port")?.as_int()?;
    let pubkey = v.get("pub_key")?.as_str()?.to_string();
    if !(0..=u16::MAX as i64).contains(&port) {
        return None;
    }
    Some(PeerDescriptor::new(host, port as u16, pubkey))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_value_roundtrips() {
        let d = PeerDescriptor::new("10.0.0.1", 6000, "PEM");
        let v = descriptor_to_value(&d);
        assert_eq!(value_to_descriptor(&v), Some(d));
    }

    #[test]
    fn malformed_value_is_rejected() {
        assert!(value_to_descriptor(&Value::str("nope")).is_none());
        assert!(value_to_descriptor(&Value::map([("host", Value::str("h"))])).is_none());
    }
}
