//! Per-connection handler: decode one frame, dispatch by tag (§4.5).

use std::sync::Arc;
use std::time::Duration;

use onionmesh_core::{ModuleRegistry, PeerDescriptor, Tag, Value};
use onionmesh_crypto::Identity;
use onionmesh_discovery::PeerTable;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::transport::{read_frame, send_frame};

/// Module name CHUNK frames are delivered to unconditionally.
const TORRENT_MODULE: &str = "torrent";

pub struct HandlerContext {
    pub identity: Arc<Identity>,
    pub peers: PeerTable,
    pub modules: ModuleRegistry,
    pub connect_timeout: Duration,
    pub max_frame_len: u32,
}

/// Service one accepted connection: read exactly one frame, dispatch it,
/// and close. Every failure here is contained to this connection — the
/// caller's accept loop is never affected.
pub async fn handle_connection(mut stream: TcpStream, ctx: Arc<HandlerContext>) {
    let frame = match read_frame(&mut stream, ctx.max_frame_len).await {
        Ok(Some(frame)) => frame,
        Ok(None) => return,
        Err(e) => {
            debug!(error = %e, "dropping connection: frame read failed");
            return;
        }
    };

    match frame.tag {
        Tag::Hello => handle_hello(&frame.payload, &ctx),
        Tag::Onion => handle_onion(&frame.payload, &ctx).await,
        Tag::Chunk => ctx.modules.dispatch(TORRENT_MODULE, frame.payload),
        Tag::Direct => handle_direct(&frame.payload, &ctx),
        Tag::Pex => debug!("ignoring PEX frame on relay transport"),
    }
}

/// Legacy on-connect greet: add the peer to the table without a TOFU check.
/// Discovery owns TOFU; this path only keeps the table warm for peers that
/// reach us by relay connection before announcing over the datagram socket.
fn handle_hello(payload: &Value, ctx: &HandlerContext) {
    let Some(descriptor) = descriptor_from_value(payload) else {
        warn!("malformed HELLO payload on relay transport");
        return;
    };
    ctx.peers.insert(descriptor);
}

async fn handle_onion(payload: &Value, ctx: &HandlerContext) {
    let Some(blob) = payload.as_bytes() else {
        warn!("malformed ONION payload: not a byte string");
        return;
    };

    let Some(peeled) = onionmesh_circuit::peel_layer(blob, &ctx.identity) else {
        debug!("onion peel failed: wrong recipient, tampered blob, or malformed layer");
        return;
    };

    match peeled.next_hop {
        Some((host, port)) => {
            let forward = Value::Bytes(peeled.data);
            if let Err(e) = send_frame(&host, port, Tag::Onion, &forward, ctx.connect_timeout).await {
                debug!(error = %e, %host, port, "failed to forward onion frame to next hop");
            }
        }
        None => match onionmesh_circuit::decode_final(&peeled.data) {
            Some(final_payload) => ctx.modules.dispatch(&final_payload.module, final_payload.payload),
            None => warn!("malformed final payload at exit"),
        },
    }
}

fn handle_direct(payload: &Value, ctx: &HandlerContext) {
    let (Some(module), Some(content)) = (payload.get("module").and_then(Value::as_str), payload.get("content")) else {
        warn!("malformed DIRECT payload");
        return;
    };
    ctx.modules.dispatch(module, content.clone());
}

fn descriptor_from_value(v: &Value) -> Option<PeerDescriptor> {
    let host = v.get("host")?.as_str()?.to_string();
    let port = v.get("port")?.as_int()?;
    let pubkey = v.get("pub_key")?.as_str()?.to_string();
    if !(0..=u16::MAX as i64).contains(&port) {
        return None;
    }
    Some(PeerDescriptor::new(host, port as u16, pubkey))
}
