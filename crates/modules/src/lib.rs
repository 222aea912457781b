//! The three application modules carried over the onion transport: text
//! chat, a chunked file-sharing swarm, and an HTTP exit.

mod chat;
mod proxy;
mod torrent;

pub use chat::{ChatModule, MODULE_NAME as CHAT_MODULE};
pub use proxy::{ProxyModule, MODULE_NAME as PROXY_MODULE};
pub use torrent::{TorrentModule, CHUNK_SIZE, MODULE_NAME as TORRENT_MODULE};
