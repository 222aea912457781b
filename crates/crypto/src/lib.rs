//! OnionMesh Cryptography
//!
//! Long-term RSA-2048 identity key pairs, PEM/SubjectPublicKeyInfo export,
//! and hybrid (RSA-OAEP + AES-256-GCM) encryption used to build onion
//! layers and the pinning store's blobs.

mod hybrid;
mod keys;

pub use hybrid::{hybrid_decrypt, hybrid_encrypt, CryptoError, MIN_BLOB_LEN, NONCE_LEN, WRAPPED_KEY_LEN};
pub use keys::{Identity, KeyError, RSA_KEY_BITS, RSA_PUBLIC_EXPONENT};
