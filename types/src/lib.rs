//! Fundamental types for the Delos forging core.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! addresses, identifiers, key material, block headers, transactions, events,
//! round parameters and the data shapes exchanged with the BFT layer.

pub mod address;
pub mod bft;
pub mod block;
pub mod error;
pub mod event;
pub mod hash;
pub mod keys;
pub mod network;
pub mod params;
pub mod time;
pub mod transaction;

pub use address::Address;
pub use bft::{ActiveValidator, BftHeights, BftParameters, BftValidator, ConsensusParams};
pub use block::{AggregateCommit, Block, BlockAsset, BlockHeader, BLOCK_HEADER_VERSION};
pub use error::DelosError;
pub use event::Event;
pub use hash::{blake2b_256, BlockId, TxId};
pub use keys::{
    BlsPublicKey, BlsSecretKey, ForgingKeypair, PrivateKey, PublicKey, Signature,
};
pub use network::ChainId;
pub use params::RoundParams;
pub use time::Timestamp;
pub use transaction::Transaction;
