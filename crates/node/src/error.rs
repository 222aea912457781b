use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("failed to generate node identity: {0}")]
    Key(#[from] onionmesh_crypto::KeyError),
    #[error(transparent)]
    Discovery(#[from] onionmesh_discovery::DiscoveryError),
    #[error(transparent)]
    Relay(#[from] onionmesh_relay::RelayError),
}

pub type Result<T> = std::result::Result<T, NodeError>;
