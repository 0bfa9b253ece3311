//! Interfaces to the systems the forging core drives but does not own.
//!
//! Production wiring supplies real implementations; tests use the
//! `delos-nullables` stand-ins through the adapters in [`crate::nullable`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use delos_types::{
    ActiveValidator, Address, AggregateCommit, Block, BlockAsset, BlockHeader, BftHeights,
    BftParameters, ConsensusParams, Event, ForgingKeypair, Timestamp, Transaction, TxId,
};

use crate::error::CollaboratorError;

/// Identifier of an open state-machine execution context.
pub type ContextId = [u8; 32];

/// Carried on the channel into the single-commit handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalizedHeightChanged {
    pub from: u64,
    pub to: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyResult {
    Ok,
    Invalid(String),
}

/// Result code of executing one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecResult {
    Ok,
    /// The command failed but the transaction is still includable.
    Fail,
    Invalid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub result: ExecResult,
    pub events: Vec<Event>,
}

#[async_trait]
pub trait Consensus: Send + Sync {
    fn slot_number(&self, timestamp: Timestamp) -> u64;
    fn slot_time(&self, slot: u64) -> Timestamp;
    async fn generator_at_timestamp(
        &self,
        timestamp: Timestamp,
    ) -> Result<Address, CollaboratorError>;
    async fn aggregate_commit(&self) -> Result<AggregateCommit, CollaboratorError>;
    async fn certify_single_commit(
        &self,
        header: &BlockHeader,
        keypair: &ForgingKeypair,
    ) -> Result<(), CollaboratorError>;
    async fn max_removal_height(&self) -> Result<u64, CollaboratorError>;
    async fn consensus_params(&self) -> Result<ConsensusParams, CollaboratorError>;
    /// Hand a signed block over for processing.
    async fn execute(&self, block: Block) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait Bft: Send + Sync {
    async fn bft_heights(&self) -> Result<BftHeights, CollaboratorError>;
    /// Whether a parameter set was registered exactly at `height`.
    async fn exist_bft_parameters(&self, height: u64) -> Result<bool, CollaboratorError>;
    /// The parameter set effective at `height`.
    async fn bft_parameters(&self, height: u64) -> Result<BftParameters, CollaboratorError>;
    async fn active_validators(
        &self,
        height: u64,
    ) -> Result<Vec<ActiveValidator>, CollaboratorError>;
    async fn set_bft_parameters(
        &self,
        height: u64,
        params: BftParameters,
    ) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait StateMachine: Send + Sync {
    async fn init_state_machine(
        &self,
        header: &BlockHeader,
    ) -> Result<ContextId, CollaboratorError>;
    async fn insert_assets(
        &self,
        context: &ContextId,
        finalized_height: u64,
    ) -> Result<Vec<BlockAsset>, CollaboratorError>;
    async fn before_transactions_execute(
        &self,
        context: &ContextId,
        assets: &[BlockAsset],
    ) -> Result<Vec<Event>, CollaboratorError>;
    async fn verify_transaction(
        &self,
        context: &ContextId,
        transaction: &Transaction,
    ) -> Result<VerifyResult, CollaboratorError>;
    async fn execute_transaction(
        &self,
        context: &ContextId,
        transaction: &Transaction,
    ) -> Result<ExecuteOutcome, CollaboratorError>;
    async fn after_transactions_execute(
        &self,
        context: &ContextId,
        transactions: &[Transaction],
    ) -> Result<Vec<Event>, CollaboratorError>;
    /// Returns the state root. With `dry_run` nothing is persisted.
    async fn commit(
        &self,
        context: &ContextId,
        dry_run: bool,
    ) -> Result<[u8; 32], CollaboratorError>;
    async fn clear(&self) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait Chain: Send + Sync {
    async fn block_header_by_height(&self, height: u64) -> Result<BlockHeader, CollaboratorError>;
    async fn last_block_header(&self) -> Result<BlockHeader, CollaboratorError>;
    async fn finalized_height(&self) -> Result<u64, CollaboratorError>;
}

#[async_trait]
pub trait Network: Send + Sync {
    async fn broadcast(&self, event: &str, data: Vec<u8>) -> Result<(), CollaboratorError>;
    /// Ask any connected peer. Returns the answer and the id of the peer that gave it.
    async fn request_from_network(
        &self,
        procedure: &str,
        data: Vec<u8>,
    ) -> Result<(Vec<u8>, String), CollaboratorError>;
    async fn request_from_peer(
        &self,
        procedure: &str,
        data: Vec<u8>,
        peer_id: &str,
    ) -> Result<Vec<u8>, CollaboratorError>;
    async fn apply_penalty_on_peer(
        &self,
        peer_id: &str,
        penalty: u32,
    ) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait TransactionPool: Send + Sync {
    /// Pooled transactions grouped by sender, each group in ascending nonce order.
    async fn processable_transactions(&self) -> BTreeMap<Address, Vec<Transaction>>;
    async fn contains(&self, id: &TxId) -> bool;
    async fn get(&self, id: &TxId) -> Option<Transaction>;
    /// Returns `false` when the pool did not take the transaction.
    async fn add(&self, transaction: Transaction) -> bool;
    async fn remove(&self, id: &TxId) -> bool;
}

/// Wall-clock source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
