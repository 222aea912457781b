//! Text messaging module (§10.1).

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use onionmesh_core::{Module, NodeHandle, Value};

pub const MODULE_NAME: &str = "chat";

/// Fingerprint prefix length taken from the local public key PEM.
const FINGERPRINT_LEN: usize = 20;

pub struct ChatModule {
    node: Arc<dyn NodeHandle>,
    messages: Mutex<Vec<Value>>,
}

impl ChatModule {
    pub fn new(node: Arc<dyn NodeHandle>) -> Self {
        Self {
            node,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Send a chat message through a random onion circuit and log it locally.
    pub fn send_message(&self, text: &str) {
        let pubkey = self.node.pubkey();
        let fingerprint: String = pubkey.chars().take(FINGERPRINT_LEN).collect();
        let packet = Value::map([
            ("text", Value::str(text)),
            ("ts", Value::str(format_timestamp())),
            ("sender_fp", Value::str(format!("{fingerprint}..."))),
        ]);

        self.messages.lock().expect("chat log lock poisoned").push(packet.clone());
        self.node.send_onion(MODULE_NAME, packet);
    }

    /// Snapshot of every message sent or received so far, in arrival order.
    pub fn messages(&self) -> Vec<Value> {
        self.messages.lock().expect("chat log lock poisoned").clone()
    }
}

impl Module for ChatModule {
    fn receive(&self, payload: Value) {
        self.messages.lock().expect("chat log lock poisoned").push(payload);
    }
}

/// `HH:MM:SS` derived from the process clock, matching the source's local
/// timestamp without pulling in a calendar-aware date/time crate for one field.
fn format_timestamp() -> String {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let (h, m, s) = ((secs / 3600) % 24, (secs / 60) % 60, secs % 60);
    format!("{h:02}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct FakeNode {
        pubkey: String,
        sent: StdMutex<Vec<(String, Value)>>,
    }

    impl NodeHandle for FakeNode {
        fn pubkey(&self) -> &str {
            &self.pubkey
        }
        fn peers(&self) -> Vec<onionmesh_core::PeerDescriptor> {
            Vec::new()
        }
        fn send_onion(&self, module: &str, payload: Value) {
            self.sent.lock().unwrap().push((module.to_string(), payload));
        }
        fn send_onion_to(&self, _peer_id: &str, module: &str, payload: Value) {
            self.sent.lock().unwrap().push((module.to_string(), payload));
        }
        fn send_raw(&self, _host: &str, _port: u16, _tag: onionmesh_core::Tag, _payload: Value) {}
    }

    #[test]
    fn send_message_logs_locally_and_sends_onion() {
        let node = Arc::new(FakeNode {
            pubkey: "PEMDATAPEMDATAPEMDATA".to_string(),
            sent: StdMutex::new(Vec::new()),
        });
        let chat = ChatModule::new(node.clone());

        chat.send_message("hi");

        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].get("text").and_then(Value::as_str), Some("hi"));
        assert_eq!(node.sent.lock().unwrap().len(), 1);
        assert_eq!(node.sent.lock().unwrap()[0].0, MODULE_NAME);
    }

    #[test]
    fn receive_appends_payload_verbatim() {
        let node = Arc::new(FakeNode {
            pubkey: "X".to_string(),
            sent: StdMutex::new(Vec::new()),
        });
        let chat = ChatModule::new(node);
        let payload = Value::map([("text", Value::str("hello"))]);

        chat.receive(payload.clone());

        assert_eq!(chat.messages(), vec![payload]);
    }
}
