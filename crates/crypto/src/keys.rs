use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

/// Modulus size for the node's long-term asymmetric key pair.
pub const RSA_KEY_BITS: usize = 2048;
/// Public exponent used for every generated key pair.
pub const RSA_PUBLIC_EXPONENT: u64 = 65537;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("invalid PEM public key")]
    InvalidPublicKey,
    #[error("key generation failed")]
    GenerationFailed,
}

/// A node's long-term identity: an RSA-2048 key pair.
///
/// The private half is retained opaquely in memory and is never serialized;
/// its lifetime is the node process lifetime (§3 Private Key).
pub struct Identity {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
    public_pem: String,
}

impl Identity {
    /// Generate a fresh 2048-bit RSA key pair with public exponent 65537.
    pub fn generate() -> Result<Self, KeyError> {
        let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
        let private_key = RsaPrivateKey::new_with_exp(&mut OsRng, RSA_KEY_BITS, &exponent)
            .map_err(|_| KeyError::GenerationFailed)?;
        let public_key = RsaPublicKey::from(&private_key);
        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|_| KeyError::GenerationFailed)?;
        Ok(Self {
            private_key,
            public_key,
            public_pem,
        })
    }

    /// The PEM/SubjectPublicKeyInfo encoding of the public half, suitable
    /// for advertising in a HELLO/PEX descriptor.
    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub(crate) fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

/// Parse a PEM/SubjectPublicKeyInfo string into an RSA public key.
pub(crate) fn parse_public_pem(pem: &str) -> Result<RsaPublicKey, KeyError> {
    RsaPublicKey::from_public_key_pem(pem).map_err(|_| KeyError::InvalidPublicKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identity_exports_pem() {
        let id = Identity::generate().unwrap();
        assert!(id.public_pem().starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn exported_pem_parses_back() {
        let id = Identity::generate().unwrap();
        let parsed = parse_public_pem(id.public_pem()).unwrap();
        assert_eq!(parsed, *id.public_key());
    }

    #[test]
    fn invalid_pem_is_rejected() {
        assert!(parse_public_pem("not a pem").is_err());
    }

    #[test]
    fn two_identities_have_distinct_keys() {
        let a = Identity::generate().unwrap();
        let b = Identity::generate().unwrap();
        assert_ne!(a.public_pem(), b.public_pem());
    }
}
