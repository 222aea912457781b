use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("failed to bind discovery socket: {0}")]
    Bind(std::io::Error),

    #[error("failed to read pin store: {0}")]
    PinStoreRead(std::io::Error),

    #[error("failed to write pin store: {0}")]
    PinStoreWrite(std::io::Error),

    #[error("failed to parse pin store: {0}")]
    PinStoreParse(serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
