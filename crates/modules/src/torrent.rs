//! Chunked file-sharing swarm module, addressed by public-key fingerprint (§10.2).

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use onionmesh_core::{Module, NodeHandle, Value};
use sha2::{Digest, Sha256};

pub const MODULE_NAME: &str = "torrent";
pub const CHUNK_SIZE: usize = 64 * 1024;

struct FileMeta {
    name: String,
    size: usize,
    total: u32,
    owner_fp: Option<String>,
}

struct PendingDownload {
    needed: BTreeSet<u32>,
    total: Option<u32>,
    peers: HashMap<String, HashSet<u32>>,
}

#[derive(Default)]
struct State {
    files: HashMap<String, FileMeta>,
    chunks: HashMap<String, HashMap<u32, Vec<u8>>>,
    pending: HashMap<String, PendingDownload>,
}

pub struct TorrentModule {
    node: Arc<dyn NodeHandle>,
    state: Mutex<State>,
}

impl TorrentModule {
    pub fn new(node: Arc<dyn NodeHandle>) -> Self {
        Self {
            node,
            state: Mutex::new(State::default()),
        }
    }

    /// Owner action: split `data` into chunks and make it available to requesters.
    pub fn add_file(&self, name: &str, data: &[u8]) -> String {
        let hash = file_hash(data);
        let total = ((data.len() + CHUNK_SIZE - 1) / CHUNK_SIZE).max(1) as u32;

        let mut state = self.state.lock().expect("torrent state lock poisoned");
        state.files.insert(
            hash.clone(),
            FileMeta {
                name: name.to_string(),
                size: data.len(),
                total,
                owner_fp: Some(self.node.pubkey().to_string()),
            },
        );

        let mut chunks = HashMap::new();
        for (i, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            chunks.insert(i as u32, chunk.to_vec());
        }
        state.chunks.insert(hash.clone(), chunks);

        hash
    }

    /// Downloader action: ask every known peer whether they seed `hash`.
    pub fn request_file(&self, hash: &str) {
        {
            let mut state = self.state.lock().expect("torrent state lock poisoned");
            state.pending.entry(hash.to_string()).or_insert_with(|| PendingDownload {
                needed: BTreeSet::new(),
                total: None,
                peers: HashMap::new(),
            });
        }

        let origin_fp = self.node.pubkey().to_string();
        for peer in self.node.peers() {
            self.node.send_onion_to(
                &peer.id(),
                MODULE_NAME,
                Value::map([
                    ("action", Value::str("who_has")),
                    ("hash", Value::str(hash)),
                    ("origin_fp", Value::str(origin_fp.clone())),
                ]),
            );
        }
    }

    fn find_peer_by_key(&self, fingerprint: &str) -> Option<String> {
        self.node.peers().into_iter().find(|p| p.pubkey == fingerprint).map(|p| p.id())
    }

    fn handle_who_has(&self, payload: &Value) {
        let (Some(hash), Some(origin_fp)) = (
            payload.get("hash").and_then(Value::as_str),
            payload.get("origin_fp").and_then(Value::as_str),
        ) else {
            return;
        };

        let (indices, total) = {
            let state = self.state.lock().expect("torrent state lock poisoned");
            let Some(chunks) = state.chunks.get(hash) else { return };
            let Some(meta) = state.files.get(hash) else { return };
            (chunks.keys().copied().collect::<Vec<_>>(), meta.total)
        };

        let Some(target) = self.find_peer_by_key(origin_fp) else { return };
        self.node.send_onion_to(
            &target,
            MODULE_NAME,
            Value::map([
                ("action", Value::str("have")),
                ("hash", Value::str(hash)),
                ("indices", Value::list(indices.into_iter().map(|i| Value::Int(i as i64)))),
                ("total", Value::Int(total as i64)),
                ("holder_fp", Value::str(self.node.pubkey())),
            ]),
        );
    }

    fn handle_have(&self, payload: &Value) {
        let (Some(hash), Some(total), Some(holder_fp)) = (
            payload.get("hash").and_then(Value::as_str),
            payload.get("total").and_then(Value::as_int),
            payload.get("holder_fp").and_then(Value::as_str),
        ) else {
            return;
        };
        let indices: HashSet<u32> = payload
            .get("indices")
            .and_then(Value::as_list)
            .map(|list| list.iter().filter_map(Value::as_int).map(|i| i as u32).collect())
            .unwrap_or_default();

        let Some(holder_peer) = self.find_peer_by_key(holder_fp) else { return };

        {
            let mut state = self.state.lock().expect("torrent state lock poisoned");
            let Some(entry) = state.pending.get_mut(hash) else { return };
            if entry.total.is_none() {
                entry.total = Some(total as u32);
                entry.needed = (0..total as u32).collect();
            }
            entry.peers.insert(holder_peer, indices);
        }

        self.request_next_chunk(hash);
    }

    fn handle_get_chunk(&self, payload: &Value) {
        let (Some(hash), Some(index), Some(origin_fp)) = (
            payload.get("hash").and_then(Value::as_str),
            payload.get("index").and_then(Value::as_int),
            payload.get("origin_fp").and_then(Value::as_str),
        ) else {
            return;
        };
        let index = index as u32;

        let data = {
            let state = self.state.lock().expect("torrent state lock poisoned");
            state.chunks.get(hash).and_then(|c| c.get(&index)).cloned()
        };
        let Some(data) = data else { return };
        let Some(target) = self.find_peer_by_key(origin_fp) else { return };

        self.node.send_onion_to(
            &target,
            MODULE_NAME,
            Value::map([
                ("action", Value::str("chunk")),
                ("hash", Value::str(hash)),
                ("index", Value::Int(index as i64)),
                ("data", Value::Bytes(data)),
                ("holder_fp", Value::str(self.node.pubkey())),
            ]),
        );
    }

    fn handle_chunk(&self, payload: &Value) {
        let (Some(hash), Some(index), Some(data)) = (
            payload.get("hash").and_then(Value::as_str),
            payload.get("index").and_then(Value::as_int),
            payload.get("data").and_then(Value::as_bytes),
        ) else {
            return;
        };
        let index = index as u32;

        let mut state = self.state.lock().expect("torrent state lock poisoned");
        state.chunks.entry(hash.to_string()).or_default().insert(index, data.to_vec());

        let done = {
            let Some(entry) = state.pending.get_mut(hash) else { return };
            entry.needed.remove(&index);
            entry.needed.is_empty()
        };

        if done {
            let total = state.pending.get(hash).and_then(|e| e.total);
            let size: usize = state.chunks.get(hash).map(|c| c.values().map(Vec::len).sum()).unwrap_or(0);
            state.files.insert(
                hash.to_string(),
                FileMeta {
                    name: format!("Downloaded_{hash}"),
                    size,
                    total: total.unwrap_or(0),
                    owner_fp: None,
                },
            );
            state.pending.remove(hash);
            drop(state);
        } else {
            drop(state);
            self.request_next_chunk(hash);
        }
    }

    fn request_next_chunk(&self, hash: &str) {
        let next = {
            let state = self.state.lock().expect("torrent state lock poisoned");
            let Some(entry) = state.pending.get(hash) else { return };
            let Some(&next_idx) = entry.needed.iter().next() else { return };
            entry
                .peers
                .iter()
                .find(|(_, indices)| indices.contains(&next_idx))
                .map(|(peer_id, _)| (peer_id.clone(), next_idx))
        };
        let Some((peer_id, next_idx)) = next else { return };

        self.node.send_onion_to(
            &peer_id,
            MODULE_NAME,
            Value::map([
                ("action", Value::str("get_chunk")),
                ("hash", Value::str(hash)),
                ("index", Value::Int(next_idx as i64)),
                ("origin_fp", Value::str(self.node.pubkey())),
            ]),
        );
    }
}

impl Module for TorrentModule {
    fn receive(&self, payload: Value) {
        match payload.get("action").and_then(Value::as_str) {
            Some("who_has") => self.handle_who_has(&payload),
            Some("have") => self.handle_have(&payload),
            Some("get_chunk") => self.handle_get_chunk(&payload),
            Some("chunk") => self.handle_chunk(&payload),
            _ => {}
        }
    }
}

fn file_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use onionmesh_core::{PeerDescriptor, Tag};
    use std::sync::Mutex as StdMutex;

    struct FakeNode {
        pubkey: String,
        peer_list: Vec<PeerDescriptor>,
        sent: StdMutex<Vec<(String, String, Value)>>,
    }

    impl NodeHandle for FakeNode {
        fn pubkey(&self) -> &str {
            &self.pubkey
        }
        fn peers(&self) -> Vec<PeerDescriptor> {
            self.peer_list.clone()
        }
        fn send_onion(&self, _module: &str, _payload: Value) {}
        fn send_onion_to(&self, peer_id: &str, module: &str, payload: Value) {
            self.sent.lock().unwrap().push((peer_id.to_string(), module.to_string(), payload));
        }
        fn send_raw(&self, _host: &str, _port: u16, _tag: Tag, _payload: Value) {}
    }

    #[test]
    fn add_file_splits_into_chunks() {
        let node = Arc::new(FakeNode {
            pubkey: "OWNER".to_string(),
            peer_list: Vec::new(),
            sent: StdMutex::new(Vec::new()),
        });
        let torrent = TorrentModule::new(node);
        let data = vec![7u8; CHUNK_SIZE + 1];

        let hash = torrent.add_file("f.bin", &data);

        let state = torrent.state.lock().unwrap();
        assert_eq!(state.chunks.get(&hash).unwrap().len(), 2);
        assert_eq!(state.files.get(&hash).unwrap().total, 2);
    }

    #[test]
    fn who_has_replies_with_have_when_holding_file() {
        let requester = PeerDescriptor::new("10.0.0.2", 6001, "REQUESTER_KEY");
        let node = Arc::new(FakeNode {
            pubkey: "OWNER".to_string(),
            peer_list: vec![requester.clone()],
            sent: StdMutex::new(Vec::new()),
        });
        let torrent = TorrentModule::new(node.clone());
        let hash = torrent.add_file("f.bin", b"hello world");

        torrent.receive(Value::map([
            ("action", Value::str("who_has")),
            ("hash", Value::str(hash.clone())),
            ("origin_fp", Value::str("REQUESTER_KEY")),
        ]));

        let sent = node.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, requester.id());
        assert_eq!(sent[0].2.get("action").and_then(Value::as_str), Some("have"));
    }

    #[test]
    fn full_download_sequence_assembles_file() {
        let holder = PeerDescriptor::new("10.0.0.1", 6000, "HOLDER_KEY");
        let node = Arc::new(FakeNode {
            pubkey: "DOWNLOADER".to_string(),
            peer_list: vec![holder.clone()],
            sent: StdMutex::new(Vec::new()),
        });
        let torrent = TorrentModule::new(node);
        let hash = "abc123".to_string();

        torrent.request_file(&hash);
        torrent.receive(Value::map([
            ("action", Value::str("have")),
            ("hash", Value::str(hash.clone())),
            ("indices", Value::list([Value::Int(0)])),
            ("total", Value::Int(1)),
            ("holder_fp", Value::str("HOLDER_KEY")),
        ]));
        torrent.receive(Value::map([
            ("action", Value::str("chunk")),
            ("hash", Value::str(hash.clone())),
            ("index", Value::Int(0)),
            ("data", Value::Bytes(b"payload".to_vec())),
        ]));

        let state = torrent.state.lock().unwrap();
        assert!(state.pending.get(&hash).is_none());
        assert_eq!(state.files.get(&hash).unwrap().size, 7);
    }
}
