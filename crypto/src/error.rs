use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid BLS key: {0}")]
    InvalidBlsKey(String),

    #[error("BLS key generation failed: {0}")]
    BlsKeyGen(String),
}
