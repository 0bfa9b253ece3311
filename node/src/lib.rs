//! Delos forging core: produces blocks for locally held validator keys.
//!
//! The node crate ties the pure consensus arithmetic to the outside world:
//! - Polls the slot clock and generates blocks when a local key is scheduled
//! - Selects transactions by fee priority with per-sender nonce order
//! - Announces new transactions to peers in periodic batches
//! - Certifies finalized heights with BLS single commits
//! - Manages generator keys and the previously-generated bookkeeping
//!
//! All collaborators (consensus, BFT, state machine, chain, network, pool)
//! are reached through the traits in [`collaborators`].

pub mod broadcaster;
pub mod collaborators;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod generator;
pub mod generator_store;
pub mod keypairs;
pub mod keystore;
pub mod logging;
pub mod metrics;
pub mod network_endpoint;
pub mod nullable;
pub mod selection;
pub mod shutdown;
pub mod single_commit;
pub mod tracing_spans;
pub mod wire_message;

pub use broadcaster::Broadcaster;
pub use collaborators::{
    Bft, Chain, Clock, Consensus, ContextId, ExecResult, ExecuteOutcome, FinalizedHeightChanged,
    Network, StateMachine, SystemClock, TransactionPool, VerifyResult,
};
pub use config::GeneratorConfig;
pub use endpoint::{
    Endpoint, GeneratorStatus, SetKeysRequest, SetStatusRequest, UpdateStatusRequest,
    UpdateStatusResponse,
};
pub use error::{
    CollaboratorError, EndpointError, GeneratorError, KeystoreError, NetworkEndpointError,
};
pub use generator::{GenerationContext, Generator, GeneratorDeps, TickOutcome};
pub use generator_store::GeneratedInfo;
pub use keypairs::KeypairTable;
pub use keystore::{
    decrypt_generator_keys, encrypt_generator_keys, encrypt_generator_keys_with, load_keys_file,
    save_keys_file, EncryptedKeystore, GeneratorKeys, KdfParams, KeysFile, KeysFileEntry,
    PlainGeneratorKeys,
};
pub use logging::{init_logging, LogFormat};
pub use metrics::GeneratorMetrics;
pub use network_endpoint::NetworkEndpoint;
pub use selection::{HighFeeStrategy, SelectedTransactions};
pub use shutdown::ShutdownController;
pub use single_commit::SingleCommitHandler;
