use thiserror::Error;

#[derive(Error, Debug)]
pub enum CircuitError {
    #[error("no peers available to build a circuit")]
    Empty,
    #[error("failed to encrypt onion layer: {0}")]
    Encrypt(#[from] onionmesh_crypto::CryptoError),
}

pub type Result<T> = std::result::Result<T, CircuitError>;
