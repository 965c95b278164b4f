use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bridge io: {0}")]
    Io(#[from] std::io::Error),
    #[error("bridge protocol error: {0}")]
    Protocol(String),
    #[error("camera rejected command: {0}")]
    Rejected(String),
    #[error("bridge command timed out after {0:?}")]
    Timeout(Duration),
    #[error("bridge disconnected")]
    Disconnected,
    #[error("camera not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
