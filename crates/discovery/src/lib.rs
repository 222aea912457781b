//! UDP broadcast peer discovery and trust-on-first-use pinning.

mod error;
mod pin_store;
mod service;
mod table;
mod validate;

pub use error::{DiscoveryError, Result};
pub use pin_store::PinStore;
pub use service::{DiscoveryService, DEFAULT_DISCOVERY_PORT};
pub use table::PeerTable;
pub use validate::{validate_peer, Validation};
