//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the forging core talks to (clock, consensus, BFT,
//! state machine, chain, network, transaction pool, storage) has a
//! test-friendly stand-in here that:
//! - Returns deterministic values
//! - Can be controlled programmatically
//! - Records what it was asked to do, for assertions
//! - Never touches the filesystem or network
//!
//! The nullables expose plain synchronous methods; `delos-node` adapts them
//! to its async collaborator traits.

pub mod bft;
pub mod chain;
pub mod clock;
pub mod consensus;
pub mod network;
pub mod pool;
pub mod state_machine;
pub mod store;

pub use bft::NullBft;
pub use chain::NullChain;
pub use clock::NullClock;
pub use consensus::{CertifiedCommit, NullConsensus};
pub use network::{NullNetwork, RecordedRequest};
pub use pool::NullTransactionPool;
pub use state_machine::{NullStateMachine, ScriptedOutcome};
pub use store::NullGeneratorStore;
