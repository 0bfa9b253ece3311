use delos_types::Address;
use thiserror::Error;

/// Failure reported by an external collaborator (consensus, BFT, state
/// machine, chain, network, pool).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("store error: {0}")]
    Store(#[from] delos_store::StoreError),

    #[error("consensus error: {0}")]
    Consensus(#[from] delos_consensus::ConsensusError),

    #[error("encoding error: {0}")]
    Encoding(#[from] delos_types::DelosError),

    #[error("crypto error: {0}")]
    Crypto(#[from] delos_crypto::CryptoError),

    #[error("keystore error: {0}")]
    Keystore(#[from] KeystoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("generator is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Typed failures of the administrative endpoint.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("address {0} is not configured for forging")]
    AddressNotConfigured(Address),

    #[error("invalid BFT height state: {0}")]
    InvalidBftHeightState(String),

    #[error("authentication failed for {0}")]
    AuthenticationFailed(Address),

    #[error("store error: {0}")]
    Store(#[from] delos_store::StoreError),

    #[error("keystore error: {0}")]
    Keystore(#[from] KeystoreError),
}

#[derive(Debug, Error)]
pub enum NetworkEndpointError {
    #[error("peer {0} exceeded the request rate limit")]
    RateLimited(String),

    #[error("malformed data from peer {peer}: {reason}")]
    Decode { peer: String, reason: String },

    #[error("announcement from {peer} carries {count} ids, limit is {limit}")]
    TooManyIds {
        peer: String,
        count: usize,
        limit: usize,
    },

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("encoding error: {0}")]
    Encoding(#[from] delos_types::DelosError),
}

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("cipher error: {0}")]
    Cipher(String),

    #[error("decryption failed: wrong password or corrupted data")]
    Decryption,

    #[error("invalid keystore: {0}")]
    InvalidFormat(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
