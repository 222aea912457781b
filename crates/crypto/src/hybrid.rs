//! Hybrid encryption: RSA-OAEP-wrapped AES-256-GCM.
//!
//! Blob layout (§3 Encrypted Blob): `E_asym(K_sym) ++ nonce ++ E_sym(plaintext)`
//! with `|E_asym(K_sym)| = 256` bytes (2048-bit modulus), `|nonce| = 12`
//! bytes, and the GCM ciphertext carrying its own 16-byte authentication tag.
//! Every call samples a fresh symmetric key and nonce, so reuse across onion
//! layers is structurally impossible.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

use crate::keys::{parse_public_pem, Identity, KeyError};

/// Size of the RSA-OAEP-wrapped AES key for a 2048-bit modulus.
pub const WRAPPED_KEY_LEN: usize = 256;
/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;
/// Minimum valid blob length: wrapped key + nonce, with at least an empty
/// GCM ciphertext (16-byte tag) behind it.
pub const MIN_BLOB_LEN: usize = WRAPPED_KEY_LEN + NONCE_LEN + 16;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid recipient public key")]
    InvalidPublicKey(#[from] KeyError),
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("blob shorter than the minimum {MIN_BLOB_LEN} bytes")]
    BlobTooShort,
}

/// Encrypt `plaintext` for the peer whose public key is `peer_pubkey_pem`.
pub fn hybrid_encrypt(plaintext: &[u8], peer_pubkey_pem: &str) -> Result<Vec<u8>, CryptoError> {
    let public_key = parse_public_pem(peer_pubkey_pem)?;
    encrypt_for(plaintext, &public_key)
}

pub(crate) fn encrypt_for(plaintext: &[u8], public_key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
    let mut sym_key = [0u8; 32];
    OsRng.fill_bytes(&mut sym_key);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&sym_key));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let wrapped_key = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &sym_key)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut blob = Vec::with_capacity(wrapped_key.len() + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&wrapped_key);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt `blob` with `identity`'s private key.
///
/// Returns `None` on any failure: a too-short blob, a wrapped key that
/// doesn't unwrap under our private key, or an AES-GCM authentication
/// failure. This is the sole integrity check performed at each onion hop,
/// and deliberately indistinguishable from "addressed to someone else" —
/// callers must not treat it as an attack signal on its own.
pub fn hybrid_decrypt(blob: &[u8], identity: &Identity) -> Option<Vec<u8>> {
    if blob.len() < MIN_BLOB_LEN {
        return None;
    }
    let (wrapped_key, rest) = blob.split_at(WRAPPED_KEY_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let sym_key = identity
        .private_key()
        .decrypt(Oaep::new::<Sha256>(), wrapped_key)
        .ok()?;
    if sym_key.len() != 32 {
        return None;
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&sym_key));
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher.decrypt(nonce, ciphertext).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_for_any_message() {
        let identity = Identity::generate().unwrap();
        for msg in [&b""[..], b"short", &[7u8; 4096]] {
            let blob = hybrid_encrypt(msg, identity.public_pem()).unwrap();
            let plaintext = hybrid_decrypt(&blob, &identity).unwrap();
            assert_eq!(plaintext, msg);
        }
    }

    #[test]
    fn blob_shorter_than_minimum_is_rejected() {
        let identity = Identity::generate().unwrap();
        assert!(hybrid_decrypt(&[0u8; MIN_BLOB_LEN - 1], &identity).is_none());
    }

    #[test]
    fn flipping_a_byte_breaks_authentication() {
        let identity = Identity::generate().unwrap();
        let mut blob = hybrid_encrypt(b"tamper me", identity.public_pem()).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        assert!(hybrid_decrypt(&blob, &identity).is_none());
    }

    #[test]
    fn wrong_private_key_cannot_decrypt() {
        let a = Identity::generate().unwrap();
        let b = Identity::generate().unwrap();
        let blob = hybrid_encrypt(b"for a only", a.public_pem()).unwrap();
        assert!(hybrid_decrypt(&blob, &b).is_none());
    }

    #[test]
    fn fresh_key_and_nonce_every_call() {
        let identity = Identity::generate().unwrap();
        let a = hybrid_encrypt(b"same message", identity.public_pem()).unwrap();
        let b = hybrid_encrypt(b"same message", identity.public_pem()).unwrap();
        assert_ne!(a, b);
    }
}
