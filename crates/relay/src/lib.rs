//! The connection-oriented relay: listens, peels one onion layer per ONION
//! frame, and either forwards the opaque inner ciphertext or delivers the
//! final cleartext to a local module (§4.5).

mod error;
mod handler;
mod transport;

pub use error::{RelayError, Result};
pub use transport::send_frame;

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use onionmesh_core::ModuleRegistry;
use onionmesh_crypto::Identity;
use onionmesh_discovery::PeerTable;
use tokio::net::TcpListener;
use tracing::{info, warn};

use handler::{handle_connection, HandlerContext};

/// First free port in `[6000, 6010)` per §6 Relay transport.
pub const DEFAULT_PORT_RANGE: Range<u16> = 6000..6010;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port_range: Range<u16>,
    pub connect_timeout: Duration,
    pub max_frame_len: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port_range: DEFAULT_PORT_RANGE,
            connect_timeout: Duration::from_secs(3),
            max_frame_len: 5 * 1024 * 1024,
        }
    }
}

pub struct Relay {
    listener: TcpListener,
    port: u16,
    ctx: Arc<HandlerContext>,
}

/// Bind the first free port in `range`, without yet knowing the module
/// registry that will handle exit-side deliveries.
///
/// Split out from [`Relay::bind`] so a caller that needs the bound port to
/// finish constructing its own module registry (which needs a handle back
/// to a facade that in turn needs the relay port) can do so without a
/// chicken-and-egg dependency on that registry.
pub async fn bind_listener(range: Range<u16>) -> Result<(TcpListener, u16)> {
    let mut last_err = None;
    for port in range {
        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => {
                info!(port, "relay listening");
                return Ok((listener, port));
            }
            Err(e) => last_err = Some(e),
        }
    }
    warn!("relay port range exhausted");
    let _ = last_err;
    Err(RelayError::PortRangeExhausted)
}

impl Relay {
    /// Bind the first free port in `config.port_range`. Exhausting the range
    /// is the one fatal relay error (§7) — the caller should abort node
    /// start-up on it.
    pub async fn bind(
        identity: Arc<Identity>,
        peers: PeerTable,
        modules: ModuleRegistry,
        config: RelayConfig,
    ) -> Result<Self> {
        let (listener, port) = bind_listener(config.port_range.clone()).await?;
        Ok(Self::from_listener(listener, port, identity, peers, modules, &config))
    }

    /// Wrap an already-bound listener (see [`bind_listener`]) with the
    /// context needed to service connections.
    pub fn from_listener(
        listener: TcpListener,
        port: u16,
        identity: Arc<Identity>,
        peers: PeerTable,
        modules: ModuleRegistry,
        config: &RelayConfig,
    ) -> Self {
        let ctx = Arc::new(HandlerContext {
            identity,
            peers,
            modules,
            connect_timeout: config.connect_timeout,
            max_frame_len: config.max_frame_len,
        });
        Self { listener, port, ctx }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept connections until the listener errors. Each connection is
    /// serviced on its own spawned task; one connection's failure never
    /// affects another (§4.5 Failure semantics).
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await.map_err(RelayError::Bind)?;
            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                tracing::debug!(%addr, "accepted relay connection");
                handle_connection(stream, ctx).await;
            });
        }
    }
}
