//! The module registry contract (§3, §6): a name-keyed set of handlers with
//! a uniform `receive` method, and the facing the node exposes back to them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{PeerDescriptor, Tag, Value};

/// An application module: chat, the file swarm, the HTTP exit.
pub trait Module: Send + Sync {
    /// Handle a cleartext payload delivered by the relay's exit-side peel,
    /// or a CHUNK frame delivered directly without onion wrapping.
    fn receive(&self, payload: Value);
}

/// Name-keyed set of modules, fixed at node construction and immutable after.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, module: Arc<dyn Module>) {
        self.modules.insert(name.into(), module);
    }

    /// Deliver `payload` to the module named `name`. Silently drops if the
    /// name is unregistered, matching the exit-side "unknown module" policy.
    pub fn dispatch(&self, name: &str, payload: Value) {
        if let Some(module) = self.modules.get(name) {
            module.receive(payload);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.get(name)
    }
}

/// What a module is allowed to see and do on the node it's registered with.
///
/// Modules never see encryption, circuits, or peer validation — only this
/// facing. Methods that send traffic are fire-and-forget: failures are
/// dropped per the node's error-handling policy, never returned here.
pub trait NodeHandle: Send + Sync {
    fn pubkey(&self) -> &str;
    fn peers(&self) -> Vec<PeerDescriptor>;
    fn send_onion(&self, module: &str, payload: Value);
    fn send_onion_to(&self, peer_id: &str, module: &str, payload: Value);
    fn send_raw(&self, host: &str, port: u16, tag: Tag, payload: Value);
}
