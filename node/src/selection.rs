//! High-fee transaction selection for block generation.
//!
//! Senders compete through their lowest-nonce pending transaction. The head
//! with the best fee per byte is verified and executed next; a sender whose
//! transaction fails is dropped together with all of its later nonces.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;

use delos_types::{Address, BlockHeader, Event, Transaction};
use tracing::Instrument;

use crate::collaborators::{ContextId, ExecResult, StateMachine, TransactionPool, VerifyResult};
use crate::tracing_spans::selection_span;

/// Transactions picked for one block and the events their execution emitted.
#[derive(Clone, Debug, Default)]
pub struct SelectedTransactions {
    pub transactions: Vec<Transaction>,
    pub events: Vec<Event>,
}

/// A sender's current head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Candidate {
    sender: Address,
    fee: u64,
    size: u64,
    nonce: u64,
    sequence: u64,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Fee per byte, compared without division.
        let lhs = u128::from(self.fee) * u128::from(other.size);
        let rhs = u128::from(other.fee) * u128::from(self.size);
        lhs.cmp(&rhs)
            .then_with(|| other.nonce.cmp(&self.nonce))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Queued {
    transaction: Transaction,
    size: u64,
    sequence: u64,
}

pub struct HighFeeStrategy {
    pool: Arc<dyn TransactionPool>,
    state_machine: Arc<dyn StateMachine>,
}

impl HighFeeStrategy {
    pub fn new(pool: Arc<dyn TransactionPool>, state_machine: Arc<dyn StateMachine>) -> Self {
        Self { pool, state_machine }
    }

    /// Select and tentatively execute transactions within `max_bytes`.
    /// Never fails: problem transactions only cost their sender's tail.
    pub async fn select_for_block(
        &self,
        context: &ContextId,
        header: &BlockHeader,
        max_bytes: u64,
    ) -> SelectedTransactions {
        self.select(context, max_bytes)
            .instrument(selection_span(header.height, max_bytes))
            .await
    }

    async fn select(&self, context: &ContextId, max_bytes: u64) -> SelectedTransactions {
        let processable = self.pool.processable_transactions().await;

        let mut queues: HashMap<Address, VecDeque<Queued>> = HashMap::new();
        let mut sequence = 0u64;
        for (sender, mut transactions) in processable {
            transactions.sort_by_key(|tx| tx.nonce);
            let mut queue = VecDeque::with_capacity(transactions.len());
            for transaction in transactions {
                match transaction.size() {
                    Ok(size) => queue.push_back(Queued {
                        transaction,
                        size,
                        sequence,
                    }),
                    Err(e) => {
                        tracing::debug!(
                            %sender,
                            error = %e,
                            "unencodable transaction, skipping sender tail"
                        );
                        break;
                    }
                }
                sequence += 1;
            }
            if !queue.is_empty() {
                queues.insert(sender, queue);
            }
        }

        let mut heap: BinaryHeap<Candidate> = queues
            .iter()
            .filter_map(|(sender, queue)| queue.front().map(|q| candidate(*sender, q)))
            .collect();

        let mut selected = SelectedTransactions::default();
        let mut remaining = max_bytes;

        while let Some(head) = heap.pop() {
            if head.size > remaining {
                tracing::trace!(
                    sender = %head.sender,
                    size = head.size,
                    remaining,
                    "head exceeds budget"
                );
                queues.remove(&head.sender);
                continue;
            }
            let Some(queue) = queues.get_mut(&head.sender) else { continue };
            let Some(queued) = queue.pop_front() else { continue };

            if !self.try_include(context, &queued.transaction, &mut selected).await {
                queues.remove(&head.sender);
                continue;
            }
            remaining -= queued.size;

            if let Some(next) = queue.front() {
                heap.push(candidate(head.sender, next));
            }
        }

        tracing::debug!(
            count = selected.transactions.len(),
            bytes = max_bytes - remaining,
            "selected transactions"
        );
        selected
    }

    /// Verify and execute one transaction, appending it on success.
    async fn try_include(
        &self,
        context: &ContextId,
        transaction: &Transaction,
        selected: &mut SelectedTransactions,
    ) -> bool {
        let sender = transaction.sender_address();
        match self.state_machine.verify_transaction(context, transaction).await {
            Ok(VerifyResult::Ok) => {}
            Ok(VerifyResult::Invalid(reason)) => {
                tracing::debug!(
                    %sender,
                    nonce = transaction.nonce,
                    %reason,
                    "transaction failed verification"
                );
                return false;
            }
            Err(e) => {
                tracing::debug!(
                    %sender,
                    nonce = transaction.nonce,
                    error = %e,
                    "verification errored"
                );
                return false;
            }
        }

        match self.state_machine.execute_transaction(context, transaction).await {
            Ok(outcome) if outcome.result != ExecResult::Invalid => {
                selected.transactions.push(transaction.clone());
                selected.events.extend(outcome.events);
                true
            }
            Ok(_) => {
                tracing::debug!(
                    %sender,
                    nonce = transaction.nonce,
                    "transaction execution invalid"
                );
                false
            }
            Err(e) => {
                tracing::debug!(
                    %sender,
                    nonce = transaction.nonce,
                    error = %e,
                    "execution errored"
                );
                false
            }
        }
    }
}

fn candidate(sender: Address, queued: &Queued) -> Candidate {
    Candidate {
        sender,
        fee: queued.transaction.fee,
        size: queued.size,
        nonce: queued.transaction.nonce,
        sequence: queued.sequence,
    }
}
