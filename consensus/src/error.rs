use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("block time must be non-zero")]
    InvalidBlockTime,

    #[error("round length must be non-zero")]
    InvalidRoundLength,

    #[error("no forger list installed for round {0}")]
    NoForgerList(u64),

    #[error("forger list for round {0} is empty")]
    EmptyForgerList(u64),

    #[error("{0}")]
    Other(String),
}
