//! OnionMesh Core Types
//!
//! Shared data model for the overlay: the frame value grammar, the frame
//! envelope and its tags, and the peer descriptor / identity convention.
//! Every other crate in the workspace builds on these.

mod frame;
mod module;
mod peer;
mod value;

pub use frame::{Frame, Tag};
pub use module::{Module, ModuleRegistry, NodeHandle};
pub use peer::{peer_id, PeerDescriptor};
pub use value::Value;
