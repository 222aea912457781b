//! HTTP exit module (§10.3).
//!
//! The exit's response travels back over a direct TCP callback rather than
//! an onion-routed reply — a deliberate, spec-sanctioned shortcut (the exit
//! already knows the requester's address from the request itself, so the
//! plaintext callback doesn't leak anything the request hadn't already).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use onionmesh_core::{NodeHandle, Tag, Value};

pub const MODULE_NAME: &str = "proxy";

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ProxyModule {
    node: Arc<dyn NodeHandle>,
    http: reqwest::Client,
    local_port: u16,
    responses: Mutex<Vec<String>>,
}

impl ProxyModule {
    pub fn new(node: Arc<dyn NodeHandle>, local_port: u16) -> Self {
        Self {
            node,
            http: reqwest::Client::new(),
            local_port,
            responses: Mutex::new(Vec::new()),
        }
    }

    /// Client action: request `url` be fetched by whichever peer ends up the
    /// circuit's exit.
    pub fn fetch(&self, url: &str) {
        self.node.send_onion(
            MODULE_NAME,
            Value::map([
                ("type", Value::str("request")),
                ("url", Value::str(url)),
                ("origin_host", Value::str("127.0.0.1")),
                ("origin_port", Value::Int(self.local_port as i64)),
            ]),
        );
    }

    pub fn responses(&self) -> Vec<String> {
        self.responses.lock().expect("proxy responses lock poisoned").clone()
    }

    fn handle_request(&self, payload: &Value) {
        let (Some(url), Some(origin_host), Some(origin_port)) = (
            payload.get("url").and_then(Value::as_str).map(str::to_string),
            payload.get("origin_host").and_then(Value::as_str).map(str::to_string),
            payload.get("origin_port").and_then(Value::as_int),
        ) else {
            return;
        };
        let origin_port = origin_port as u16;
        let http = self.http.clone();
        let node = self.node.clone();

        tokio::spawn(async move {
            let status_msg = match http.get(url.as_str()).timeout(FETCH_TIMEOUT).send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.bytes().await.map(|b| b.len()).unwrap_or(0);
                    format!("Fetched {url} [Status: {status}] | Size: {body}b")
                }
                Err(e) => format!("Error fetching {url}: {e}"),
            };

            node.send_raw(
                &origin_host,
                origin_port,
                Tag::Direct,
                Value::map([
                    ("module", Value::str(MODULE_NAME)),
                    (
                        "content",
                        Value::map([("type", Value::str("response")), ("data", Value::str(status_msg))]),
                    ),
                ]),
            );
        });
    }

    fn handle_response(&self, payload: &Value) {
        if let Some(data) = payload.get("data").and_then(Value::as_str) {
            self.responses.lock().expect("proxy responses lock poisoned").push(data.to_string());
        }
    }
}

impl onionmesh_core::Module for ProxyModule {
    fn receive(&self, payload: Value) {
        match payload.get("type").and_then(Value::as_str) {
            Some("request") => self.handle_request(&payload),
            Some("response") => self.handle_response(&payload),
            _ => {}
        }
    }
}
