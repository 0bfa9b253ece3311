//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for the Delos types crate.
#[derive(Debug, Error)]
pub enum DelosError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl From<bincode::Error> for DelosError {
    fn from(e: bincode::Error) -> Self {
        DelosError::Serialization(e.to_string())
    }
}
