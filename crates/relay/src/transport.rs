//! Length-prefixed framing over a connection-oriented socket (§6).
//!
//! `uint32_be length ∥ length bytes of Codec-encoded frame`. Each relay
//! connection carries exactly one frame then closes.

use std::net::SocketAddr;
use std::time::Duration;

use onionmesh_core::{Frame, Tag, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{RelayError, Result};

const LENGTH_PREFIX_LEN: usize = 4;

/// Read exactly one length-prefixed frame from `stream`.
///
/// `read_exact` already loops internally until the buffer is full or the
/// connection errors, satisfying the "read exactly L bytes" requirement
/// without a hand-rolled retry loop.
pub async fn read_frame(stream: &mut TcpStream, max_frame_len: u32) -> Result<Option<Frame>> {
    let mut len_buf = [0u8; LENGTH_PREFIX_LEN];
    if let Err(e) = stream.read_exact(&mut len_buf).await {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(None);
        }
        return Err(RelayError::Send(e));
    }
    let len = u32::from_be_bytes(len_buf);
    if len > max_frame_len {
        return Err(RelayError::FrameTooLarge);
    }

    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await.map_err(RelayError::Send)?;

    Ok(onionmesh_codec::decode_frame(&body))
}

/// Open a fresh connection to `(host, port)`, write one framed frame, and close.
pub async fn send_frame(host: &str, port: u16, tag: Tag, payload: &Value, connect_timeout: Duration) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|_| RelayError::Connect(std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad address")))?;

    let mut stream = timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| RelayError::ConnectTimeout)?
        .map_err(RelayError::Connect)?;

    let body = onionmesh_codec::encode(tag, payload);
    let len = (body.len() as u32).to_be_bytes();

    stream.write_all(&len).await.map_err(RelayError::Send)?;
    stream.write_all(&body).await.map_err(RelayError::Send)?;
    Ok(())
}
