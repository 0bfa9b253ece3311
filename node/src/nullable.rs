//! Collaborator trait implementations for the `delos-nullables` stand-ins.

use std::collections::BTreeMap;

use async_trait::async_trait;
use delos_nullables::{
    NullBft, NullChain, NullClock, NullConsensus, NullNetwork, NullStateMachine,
    NullTransactionPool, ScriptedOutcome,
};
use delos_types::{
    ActiveValidator, Address, AggregateCommit, Block, BlockAsset, BlockHeader, BftHeights,
    BftParameters, ConsensusParams, Event, ForgingKeypair, Timestamp, Transaction, TxId,
};

use crate::collaborators::{
    Bft, Chain, Clock, Consensus, ContextId, ExecResult, ExecuteOutcome, Network, StateMachine,
    TransactionPool, VerifyResult,
};
use crate::error::CollaboratorError;

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        NullClock::now(self)
    }
}

#[async_trait]
impl Consensus for NullConsensus {
    fn slot_number(&self, timestamp: Timestamp) -> u64 {
        NullConsensus::slot_number(self, timestamp)
    }

    fn slot_time(&self, slot: u64) -> Timestamp {
        NullConsensus::slot_time(self, slot)
    }

    async fn generator_at_timestamp(
        &self,
        timestamp: Timestamp,
    ) -> Result<Address, CollaboratorError> {
        NullConsensus::generator_at_timestamp(self, timestamp)
            .map_err(|e| CollaboratorError::NotFound(e.to_string()))
    }

    async fn aggregate_commit(&self) -> Result<AggregateCommit, CollaboratorError> {
        Ok(NullConsensus::aggregate_commit(self))
    }

    async fn certify_single_commit(
        &self,
        header: &BlockHeader,
        keypair: &ForgingKeypair,
    ) -> Result<(), CollaboratorError> {
        self.certify(header, keypair.address)
            .map_err(CollaboratorError::Rejected)
    }

    async fn max_removal_height(&self) -> Result<u64, CollaboratorError> {
        Ok(NullConsensus::max_removal_height(self))
    }

    async fn consensus_params(&self) -> Result<ConsensusParams, CollaboratorError> {
        Ok(NullConsensus::consensus_params(self))
    }

    async fn execute(&self, block: Block) -> Result<(), CollaboratorError> {
        NullConsensus::execute(self, block);
        Ok(())
    }
}

#[async_trait]
impl Bft for NullBft {
    async fn bft_heights(&self) -> Result<BftHeights, CollaboratorError> {
        Ok(self.heights())
    }

    async fn exist_bft_parameters(&self, height: u64) -> Result<bool, CollaboratorError> {
        Ok(self.exist_parameters(height))
    }

    async fn bft_parameters(&self, height: u64) -> Result<BftParameters, CollaboratorError> {
        self.parameters(height)
            .ok_or_else(|| CollaboratorError::NotFound(format!("BFT parameters at {height}")))
    }

    async fn active_validators(
        &self,
        height: u64,
    ) -> Result<Vec<ActiveValidator>, CollaboratorError> {
        NullBft::active_validators(self, height)
            .ok_or_else(|| CollaboratorError::NotFound(format!("BFT parameters at {height}")))
    }

    async fn set_bft_parameters(
        &self,
        height: u64,
        params: BftParameters,
    ) -> Result<(), CollaboratorError> {
        self.set_parameters(height, params);
        Ok(())
    }
}

#[async_trait]
impl StateMachine for NullStateMachine {
    async fn init_state_machine(
        &self,
        _header: &BlockHeader,
    ) -> Result<ContextId, CollaboratorError> {
        Ok(self.open_context())
    }

    async fn insert_assets(
        &self,
        _context: &ContextId,
        _finalized_height: u64,
    ) -> Result<Vec<BlockAsset>, CollaboratorError> {
        Ok(self.assets())
    }

    async fn before_transactions_execute(
        &self,
        _context: &ContextId,
        _assets: &[BlockAsset],
    ) -> Result<Vec<Event>, CollaboratorError> {
        Ok(Vec::new())
    }

    async fn verify_transaction(
        &self,
        _context: &ContextId,
        transaction: &Transaction,
    ) -> Result<VerifyResult, CollaboratorError> {
        let id = transaction.id().map_err(|e| CollaboratorError::Rejected(e.to_string()))?;
        Ok(match self.outcome(&id) {
            ScriptedOutcome::Invalid => VerifyResult::Invalid(format!("transaction {id} rejected")),
            _ => VerifyResult::Ok,
        })
    }

    async fn execute_transaction(
        &self,
        _context: &ContextId,
        transaction: &Transaction,
    ) -> Result<ExecuteOutcome, CollaboratorError> {
        let id = transaction.id().map_err(|e| CollaboratorError::Rejected(e.to_string()))?;
        let result = match self.outcome(&id) {
            ScriptedOutcome::Ok => ExecResult::Ok,
            ScriptedOutcome::Fail => ExecResult::Fail,
            ScriptedOutcome::Invalid => ExecResult::Invalid,
            ScriptedOutcome::Error => {
                return Err(CollaboratorError::Rejected(format!("execution of {id} errored")))
            }
        };
        self.record_executed(id);
        let event = Event {
            module: transaction.module.clone(),
            name: "commandExecutionResult".to_string(),
            data: vec![u8::from(result == ExecResult::Ok)],
            topics: vec![id.as_bytes().to_vec()],
            height: 0,
            index: 0,
        };
        Ok(ExecuteOutcome {
            result,
            events: vec![event],
        })
    }

    async fn after_transactions_execute(
        &self,
        _context: &ContextId,
        _transactions: &[Transaction],
    ) -> Result<Vec<Event>, CollaboratorError> {
        Ok(Vec::new())
    }

    async fn commit(
        &self,
        _context: &ContextId,
        _dry_run: bool,
    ) -> Result<[u8; 32], CollaboratorError> {
        NullStateMachine::commit(self).map_err(CollaboratorError::Rejected)
    }

    async fn clear(&self) -> Result<(), CollaboratorError> {
        NullStateMachine::clear(self);
        Ok(())
    }
}

#[async_trait]
impl Chain for NullChain {
    async fn block_header_by_height(&self, height: u64) -> Result<BlockHeader, CollaboratorError> {
        self.header_by_height(height)
            .ok_or_else(|| CollaboratorError::NotFound(format!("block header at {height}")))
    }

    async fn last_block_header(&self) -> Result<BlockHeader, CollaboratorError> {
        self.last_header()
            .ok_or_else(|| CollaboratorError::NotFound("last block header".to_string()))
    }

    async fn finalized_height(&self) -> Result<u64, CollaboratorError> {
        Ok(NullChain::finalized_height(self))
    }
}

#[async_trait]
impl Network for NullNetwork {
    async fn broadcast(&self, event: &str, data: Vec<u8>) -> Result<(), CollaboratorError> {
        NullNetwork::broadcast(self, event, data).map_err(CollaboratorError::Unavailable)
    }

    async fn request_from_network(
        &self,
        procedure: &str,
        data: Vec<u8>,
    ) -> Result<(Vec<u8>, String), CollaboratorError> {
        NullNetwork::request_from_network(self, procedure, data)
            .map_err(CollaboratorError::Unavailable)
    }

    async fn request_from_peer(
        &self,
        procedure: &str,
        data: Vec<u8>,
        peer_id: &str,
    ) -> Result<Vec<u8>, CollaboratorError> {
        NullNetwork::request_from_peer(self, procedure, data, peer_id)
            .map_err(CollaboratorError::Unavailable)
    }

    async fn apply_penalty_on_peer(
        &self,
        peer_id: &str,
        penalty: u32,
    ) -> Result<(), CollaboratorError> {
        self.apply_penalty(peer_id, penalty);
        Ok(())
    }
}

#[async_trait]
impl TransactionPool for NullTransactionPool {
    async fn processable_transactions(&self) -> BTreeMap<Address, Vec<Transaction>> {
        self.processable()
    }

    async fn contains(&self, id: &TxId) -> bool {
        NullTransactionPool::contains(self, id)
    }

    async fn get(&self, id: &TxId) -> Option<Transaction> {
        NullTransactionPool::get(self, id)
    }

    async fn add(&self, transaction: Transaction) -> bool {
        NullTransactionPool::add(self, transaction)
    }

    async fn remove(&self, id: &TxId) -> bool {
        NullTransactionPool::remove(self, id)
    }
}
