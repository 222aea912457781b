use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("no free port in the configured range")]
    PortRangeExhausted,
    #[error("failed to bind relay listener: {0}")]
    Bind(std::io::Error),
    #[error("failed to connect to next hop: {0}")]
    Connect(std::io::Error),
    #[error("connect to next hop timed out")]
    ConnectTimeout,
    #[error("failed to send frame: {0}")]
    Send(std::io::Error),
    #[error("frame exceeds the maximum configured length")]
    FrameTooLarge,
}

pub type Result<T> = std::result::Result<T, RelayError>;
