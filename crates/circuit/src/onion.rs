//! The onion wire format: nested encrypted layers, and the peel that
//! recovers one of them.
//!
//! A layer is `{next_hop: (host, port) | null, data: bytes}`. `wrap` builds
//! the nesting from the exit inward; `peel_layer` undoes exactly one level
//! using the local private key, and `decode_final` interprets the innermost
//! `data` once a peel has reported `next_hop = None`.

use onionmesh_core::{PeerDescriptor, Tag, Value};
use onionmesh_crypto::{hybrid_decrypt, hybrid_encrypt, Identity};

use crate::error::{CircuitError, Result};

/// One layer recovered by decrypting a blob with this node's private key.
pub struct PeeledLayer {
    pub next_hop: Option<(String, u16)>,
    pub data: Vec<u8>,
}

/// The final cleartext payload an exit node delivers to a module.
pub struct FinalPayload {
    pub module: String,
    pub payload: Value,
}

/// Build the nested-encryption blob addressed to `circuit[0]`.
///
/// `final_payload` is the `{module, payload}` value the exit will deliver
/// locally; an empty circuit is rejected since there is no entry hop to
/// address the blob to.
pub fn wrap(final_payload: Value, circuit: &[PeerDescriptor]) -> Result<Vec<u8>> {
    if circuit.is_empty() {
        return Err(CircuitError::Empty);
    }

    let mut data = onionmesh_codec::encode(Tag::Onion, &final_payload);
    let mut next_hop = Value::Null;

    for hop in circuit.iter().rev() {
        let layer = Value::map([("next_hop", next_hop), ("data", Value::Bytes(data))]);
        let layer_bytes = onionmesh_codec::encode(Tag::Onion, &layer);
        data = hybrid_encrypt(&layer_bytes, &hop.pubkey)?;
        next_hop = Value::list([Value::str(hop.host.clone()), Value::Int(hop.port as i64)]);
    }

    Ok(data)
}

/// Decrypt one layer of `blob` with `identity`'s private key.
///
/// Returns `None` on decrypt/authentication failure or a malformed layer —
/// both cases are dropped identically by the caller (see the relay handler).
pub fn peel_layer(blob: &[u8], identity: &Identity) -> Option<PeeledLayer> {
    let plaintext = hybrid_decrypt(blob, identity)?;
    let (_, layer) = onionmesh_codec::decode(&plaintext)?;

    let data = layer.get("data")?.as_bytes()?.to_vec();
    let next_hop = match layer.get("next_hop")? {
        Value::Null => None,
        hop => {
            let parts = hop.as_list()?;
            let host = parts.first()?.as_str()?.to_string();
            let port = parts.get(1)?.as_int()?;
            Some((host, port as u16))
        }
    };

    Some(PeeledLayer { next_hop, data })
}

/// Decode the innermost `data` of a peel that reported `next_hop = None`
/// into the `{module, payload}` record the exit delivers locally.
pub fn decode_final(data: &[u8]) -> Option<FinalPayload> {
    let (_, value) = onionmesh_codec::decode(data)?;
    let module = value.get("module")?.as_str()?.to_string();
    let payload = value.get("payload")?.clone();
    Some(FinalPayload { module, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(identity: &Identity, port: u16) -> PeerDescriptor {
        PeerDescriptor::new("127.0.0.1", port, identity.public_pem().to_string())
    }

    fn final_payload_value(module: &str, payload: Value) -> Value {
        Value::map([("module", Value::str(module)), ("payload", payload)])
    }

    #[test]
    fn single_hop_circuit_peels_to_final_payload() {
        let exit = Identity::generate().unwrap();
        let circuit = vec![hop(&exit, 6000)];
        let final_value = final_payload_value("chat", Value::map([("text", Value::str("hi"))]));

        let blob = wrap(final_value, &circuit).unwrap();
        let peeled = peel_layer(&blob, &exit).unwrap();
        assert!(peeled.next_hop.is_none());

        let final_payload = decode_final(&peeled.data).unwrap();
        assert_eq!(final_payload.module, "chat");
        assert_eq!(final_payload.payload.get("text").and_then(Value::as_str), Some("hi"));
    }

    #[test]
    fn three_hop_circuit_peels_in_order() {
        let a = Identity::generate().unwrap();
        let b = Identity::generate().unwrap();
        let exit = Identity::generate().unwrap();
        let circuit = vec![hop(&a, 6000), hop(&b, 6001), hop(&exit, 6002)];
        let final_value = final_payload_value("chat", Value::map([("text", Value::str("hello"))]));

        let blob = wrap(final_value, &circuit).unwrap();

        let peeled_a = peel_layer(&blob, &a).unwrap();
        assert_eq!(peeled_a.next_hop, Some(("127.0.0.1".to_string(), 6001)));

        let peeled_b = peel_layer(&peeled_a.data, &b).unwrap();
        assert_eq!(peeled_b.next_hop, Some(("127.0.0.1".to_string(), 6002)));

        let peeled_exit = peel_layer(&peeled_b.data, &exit).unwrap();
        assert!(peeled_exit.next_hop.is_none());

        let final_payload = decode_final(&peeled_exit.data).unwrap();
        assert_eq!(final_payload.payload.get("text").and_then(Value::as_str), Some("hello"));
    }

    #[test]
    fn wrong_hop_key_cannot_peel() {
        let exit = Identity::generate().unwrap();
        let bystander = Identity::generate().unwrap();
        let circuit = vec![hop(&exit, 6000)];
        let blob = wrap(final_payload_value("chat", Value::Null), &circuit).unwrap();
        assert!(peel_layer(&blob, &bystander).is_none());
    }

    #[test]
    fn tampered_blob_fails_to_peel() {
        let exit = Identity::generate().unwrap();
        let circuit = vec![hop(&exit, 6000)];
        let mut blob = wrap(final_payload_value("chat", Value::Null), &circuit).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(peel_layer(&blob, &exit).is_none());
    }

    #[test]
    fn empty_circuit_is_rejected() {
        let result = wrap(Value::Null, &[]);
        assert!(matches!(result, Err(CircuitError::Empty)));
    }

    #[test]
    fn ciphertext_does_not_leak_payload_or_downstream_address() {
        let a = Identity::generate().unwrap();
        let b = Identity::generate().unwrap();
        let exit = Identity::generate().unwrap();
        let circuit = vec![hop(&a, 6000), hop(&b, 6001), hop(&exit, 6002)];
        let secret = "the-secret-payload-marker";
        let final_value = final_payload_value("chat", Value::map([("text", Value::str(secret))]));

        let blob = wrap(final_value, &circuit).unwrap();
        let haystack: Vec<u8> = blob.clone();
        assert!(!contains_subslice(&haystack, secret.as_bytes()));
        assert!(!contains_subslice(&haystack, b"6002"));
    }

    fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }
}
