//! Structured logging setup shared by every binary in the workspace.
//!
//! A library crate configures its own `tracing` spans and events but never
//! installs a subscriber — only a binary's `main` should call [`init`].

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter applied when `RUST_LOG` isn't set: info-level everywhere,
/// debug-level for this workspace's own crates.
const DEFAULT_FILTER: &str = "info,onionmesh=debug";

/// Install a `fmt` subscriber with an `EnvFilter` sourced from `RUST_LOG`,
/// falling back to [`DEFAULT_FILTER`].
///
/// Panics if a global subscriber is already installed — call this exactly
/// once, from the start of `main`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
}
