//! Circuit construction and the onion layer format.
//!
//! Building a circuit (sampling peers) and wrapping/peeling the nested
//! encryption that addresses a payload through it.

mod builder;
mod error;
mod onion;

pub use builder::{build_random, build_targeted};
pub use error::{CircuitError, Result};
pub use onion::{decode_final, peel_layer, wrap, FinalPayload, PeeledLayer};
