//! The slot-driven generation loop.
//!
//! Every `generation_interval` the loop checks whether a block is due for
//! the current slot and whether one of the local keypairs is scheduled to
//! produce it. If so it assembles, signs and hands over the block. The
//! loop also owns the announcement broadcaster and the single-commit
//! handler.

use std::sync::Arc;
use std::time::Instant;

use delos_crypto::{merkle_root, sign_message};
use delos_store::GeneratorStore;
use delos_types::{
    Address, AggregateCommit, Block, BlockAsset, BlockHeader, BlockId, Event, ForgingKeypair,
    Signature, Timestamp, Transaction, TxId, BLOCK_HEADER_VERSION,
};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::broadcaster::Broadcaster;
use crate::collaborators::{
    Bft, Chain, Clock, Consensus, FinalizedHeightChanged, Network, StateMachine, TransactionPool,
};
use crate::config::GeneratorConfig;
use crate::error::{CollaboratorError, GeneratorError, KeystoreError};
use crate::generator_store::{
    get_all_generator_keys, get_generated_info, get_generator_keys, set_generated_info,
    set_generator_keys, GeneratedInfo,
};
use crate::keypairs::KeypairTable;
use crate::keystore::{load_keys_file, GeneratorKeys};
use crate::metrics::GeneratorMetrics;
use crate::network_endpoint::INVALID_DATA_PENALTY;
use crate::selection::HighFeeStrategy;
use crate::shutdown::ShutdownController;
use crate::single_commit::SingleCommitHandler;
use crate::tracing_spans::{block_generate_span, generation_tick_span};
use crate::wire_message::{
    GetTransactionsRequest, GetTransactionsResponse, WirePayload, RPC_GET_TRANSACTIONS,
};

/// Everything the generator talks to.
#[derive(Clone)]
pub struct GeneratorDeps {
    pub consensus: Arc<dyn Consensus>,
    pub bft: Arc<dyn Bft>,
    pub state_machine: Arc<dyn StateMachine>,
    pub chain: Arc<dyn Chain>,
    pub network: Arc<dyn Network>,
    pub pool: Arc<dyn TransactionPool>,
    pub store: Arc<dyn GeneratorStore>,
    pub clock: Arc<dyn Clock>,
}

/// Inputs of one block-generation attempt.
pub struct GenerationContext {
    pub generator_address: Address,
    pub slot_timestamp: Timestamp,
    pub height: u64,
    pub previous_block_id: BlockId,
    pub keypair: Arc<ForgingKeypair>,
}

/// What a single poll of the loop did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The current slot already has its block.
    SlotFilled,
    /// The slot belongs to an address without a local keypair.
    NotScheduled(Address),
    /// The previous slot's block is missing and the grace period is running.
    WaitingForPreviousBlock,
    Generated { height: u64, id: BlockId },
}

struct RunningTasks {
    shutdown: ShutdownController,
    handles: Vec<JoinHandle<()>>,
}

pub struct Generator {
    config: GeneratorConfig,
    chain_id: delos_types::ChainId,
    deps: GeneratorDeps,
    keypairs: KeypairTable,
    broadcaster: Arc<Broadcaster>,
    strategy: HighFeeStrategy,
    single_commit: Arc<SingleCommitHandler>,
    metrics: Arc<GeneratorMetrics>,
    running: Mutex<Option<RunningTasks>>,
}

impl Generator {
    pub fn new(
        config: GeneratorConfig,
        deps: GeneratorDeps,
        keypairs: KeypairTable,
        metrics: Arc<GeneratorMetrics>,
    ) -> Result<Self, GeneratorError> {
        config.validate()?;
        let chain_id = config.chain_id()?;
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::clone(&deps.pool),
            Arc::clone(&deps.network),
            Arc::clone(&metrics),
            config.broadcast_interval(),
            config.broadcast_limit,
        ));
        let strategy =
            HighFeeStrategy::new(Arc::clone(&deps.pool), Arc::clone(&deps.state_machine));
        let single_commit = Arc::new(SingleCommitHandler::new(
            Arc::clone(&deps.consensus),
            Arc::clone(&deps.bft),
            Arc::clone(&deps.chain),
            keypairs.clone(),
            Arc::clone(&metrics),
        ));
        Ok(Self {
            config,
            chain_id,
            deps,
            keypairs,
            broadcaster,
            strategy,
            single_commit,
            metrics,
            running: Mutex::new(None),
        })
    }

    pub fn keypairs(&self) -> &KeypairTable {
        &self.keypairs
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn single_commit(&self) -> &Arc<SingleCommitHandler> {
        &self.single_commit
    }

    pub fn metrics(&self) -> &Arc<GeneratorMetrics> {
        &self.metrics
    }

    /// Import the configured keys file and enable every plain key in the store.
    ///
    /// Encrypted keys stay disabled until unlocked through the endpoint.
    /// Returns the number of keypairs enabled.
    pub async fn init(&self) -> Result<usize, GeneratorError> {
        let store = self.deps.store.as_ref();
        if let Some(path) = &self.config.keys_file {
            let file = load_keys_file(path)?;
            let mut imported = 0usize;
            for entry in file.keys {
                if get_generator_keys(store, &entry.address)?.is_none() {
                    set_generator_keys(store, &entry.address, &entry.keys)?;
                    imported += 1;
                }
            }
            tracing::info!(path = %path.display(), imported, "imported generator keys file");
        }

        let mut enabled = 0usize;
        for (address, keys) in get_all_generator_keys(store)? {
            let GeneratorKeys::Plain(plain) = keys else { continue };
            let keypair = plain.to_forging_keypair()?;
            if keypair.address != address {
                return Err(KeystoreError::InvalidKey(format!(
                    "keys stored for {address} belong to {}",
                    keypair.address
                ))
                .into());
            }
            self.keypairs.insert(keypair).await;
            enabled += 1;
        }
        self.metrics.keypairs_enabled.set(self.keypairs.len().await as i64);
        tracing::info!(enabled, "generator initialised");
        Ok(enabled)
    }

    /// Pull pooled transactions from peers, then start the generation loop,
    /// the broadcaster and the single-commit handler.
    pub async fn start(
        self: &Arc<Self>,
        finalized_events: mpsc::Receiver<FinalizedHeightChanged>,
    ) -> Result<(), GeneratorError> {
        if self.is_running().await {
            return Err(GeneratorError::AlreadyRunning);
        }

        // `running` is not held across the network pull.
        self.load_transactions_from_network().await;

        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(GeneratorError::AlreadyRunning);
        }
        self.broadcaster.start().await;

        let shutdown = ShutdownController::new();
        let mut shutdown_rx = shutdown.subscribe();
        let this = Arc::clone(self);
        let period = self.config.generation_interval();
        let loop_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => this.generate_loop_tick().await,
                }
            }
            tracing::debug!("generation loop stopped");
        });
        let commit_handle =
            Arc::clone(&self.single_commit).spawn(finalized_events, shutdown.subscribe());

        *running = Some(RunningTasks {
            shutdown,
            handles: vec![loop_handle, commit_handle],
        });
        tracing::info!(interval_ms = self.config.generation_interval_ms, "generator started");
        Ok(())
    }

    /// Stop every loop. An attempt already in flight completes; none follows.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        if let Some(RunningTasks { shutdown, handles }) = running {
            shutdown.shutdown();
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "generator task ended abnormally");
                }
            }
        }
        self.broadcaster.stop().await;
        tracing::info!("generator stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    async fn generate_loop_tick(&self) {
        match self.tick().await {
            Ok(TickOutcome::Generated { height, id }) => {
                tracing::debug!(height, %id, "generation tick produced a block");
            }
            Ok(outcome) => tracing::trace!(?outcome, "generation tick"),
            Err(e) => {
                self.metrics.generation_failures.inc();
                tracing::error!(error = %e, "failed to generate block");
            }
        }
    }

    /// One poll: decide whether this node produces the current slot's block
    /// and, if so, produce it.
    pub async fn tick(&self) -> Result<TickOutcome, GeneratorError> {
        let now = self.deps.clock.now();
        let current_slot = self.deps.consensus.slot_number(now);
        self.tick_at(now, current_slot)
            .instrument(generation_tick_span(current_slot))
            .await
    }

    async fn tick_at(
        &self,
        now: Timestamp,
        current_slot: u64,
    ) -> Result<TickOutcome, GeneratorError> {
        let consensus = &self.deps.consensus;
        let last = self.deps.chain.last_block_header().await?;
        let last_slot = consensus.slot_number(last.timestamp);
        if current_slot <= last_slot {
            return Ok(TickOutcome::SlotFilled);
        }

        let generator_address = consensus.generator_at_timestamp(now).await?;
        let Some(keypair) = self.keypairs.get(&generator_address).await else {
            return Ok(TickOutcome::NotScheduled(generator_address));
        };

        let slot_timestamp = consensus.slot_time(current_slot);
        let threshold = self.config.forging_wait_threshold_secs;
        if last_slot + 1 < current_slot && now <= slot_timestamp.saturating_add_secs(threshold) {
            tracing::debug!(
                current_slot,
                last_slot,
                threshold,
                "previous block missing, waiting before generating"
            );
            return Ok(TickOutcome::WaitingForPreviousBlock);
        }

        let ctx = GenerationContext {
            generator_address,
            slot_timestamp,
            height: last.height + 1,
            previous_block_id: last.id()?,
            keypair,
        };

        let started = Instant::now();
        let block = self.generate_block(&ctx).await?;
        let header = &block.header;
        let id = header.id()?;
        let height = header.height;
        let transactions = block.transactions.len();

        let info = GeneratedInfo {
            height,
            max_height_prevoted: header.max_height_prevoted,
            max_height_generated: header.max_height_generated,
        };
        set_generated_info(self.deps.store.as_ref(), &generator_address, &info)?;
        consensus.execute(block).await?;

        self.metrics.blocks_generated.inc();
        self.metrics.transactions_selected.inc_by(transactions as u64);
        self.metrics
            .block_generation_time_ms
            .observe(started.elapsed().as_secs_f64() * 1_000.0);
        tracing::info!(
            height,
            %id,
            generator = %generator_address,
            slot = current_slot,
            transactions,
            "generated block"
        );
        Ok(TickOutcome::Generated { height, id })
    }

    /// Assemble and sign a block. The execution context is always cleared.
    pub async fn generate_block(&self, ctx: &GenerationContext) -> Result<Block, GeneratorError> {
        let span = block_generate_span(ctx.height, &ctx.generator_address.to_hex());
        async {
            let result = self.assemble_block(ctx).await;
            if let Err(e) = self.deps.state_machine.clear().await {
                tracing::warn!(error = %e, "failed to clear execution context");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn assemble_block(&self, ctx: &GenerationContext) -> Result<Block, GeneratorError> {
        let sm = &self.deps.state_machine;
        let previous = get_generated_info(self.deps.store.as_ref(), &ctx.generator_address)?
            .unwrap_or_default();
        let bft_heights = self.deps.bft.bft_heights().await?;
        let consensus_params = self.deps.consensus.consensus_params().await?;

        let mut header = BlockHeader {
            version: BLOCK_HEADER_VERSION,
            timestamp: ctx.slot_timestamp,
            height: ctx.height,
            previous_block_id: ctx.previous_block_id,
            generator_address: ctx.generator_address,
            transaction_root: [0; 32],
            asset_root: [0; 32],
            event_root: [0; 32],
            state_root: [0; 32],
            max_height_prevoted: bft_heights.max_height_prevoted,
            max_height_generated: previous.height,
            implies_max_prevotes: consensus_params.implies_max_prevote,
            validators_hash: [0; 32],
            aggregate_commit: AggregateCommit::default(),
            signature: Signature::EMPTY,
        };

        let context = sm.init_state_machine(&header).await?;
        let finalized_height = self.deps.chain.finalized_height().await?;
        let assets = sm.insert_assets(&context, finalized_height).await?;
        let mut events = sm.before_transactions_execute(&context, &assets).await?;
        let selected = self
            .strategy
            .select_for_block(&context, &header, self.config.max_transactions_size)
            .await;
        events.extend(selected.events);
        events.extend(
            sm.after_transactions_execute(&context, &selected.transactions)
                .await?,
        );
        header.state_root = sm.commit(&context, true).await?;

        header.transaction_root = transaction_root(&selected.transactions)?;
        let encoded_assets = assets
            .iter()
            .map(BlockAsset::encode)
            .collect::<Result<Vec<_>, _>>()?;
        header.asset_root = merkle_root(&encoded_assets);
        header.event_root = event_root(&mut events, ctx.height)?;

        header.aggregate_commit = self.deps.consensus.aggregate_commit().await?;
        header.validators_hash = self.deps.bft.bft_parameters(ctx.height).await?.validators_hash;

        let signing_bytes = header.signing_bytes(&self.chain_id)?;
        header.signature = sign_message(&signing_bytes, &ctx.keypair.private_key);

        Ok(Block {
            header,
            transactions: selected.transactions,
            assets,
        })
    }

    /// Drop the block's transactions from the pool. Returns how many were pooled.
    pub async fn on_new_block(&self, block: &Block) -> usize {
        let mut removed = 0;
        for tx in &block.transactions {
            match tx.id() {
                Ok(id) => {
                    if self.deps.pool.remove(&id).await {
                        removed += 1;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "unhashable transaction in new block"),
            }
        }
        tracing::debug!(
            height = block.header.height,
            removed,
            "removed block transactions from pool"
        );
        removed
    }

    /// Return a reverted block's transactions to the pool.
    pub async fn on_delete_block(&self, block: &Block) -> usize {
        let mut readded = 0;
        for tx in &block.transactions {
            if self.deps.pool.add(tx.clone()).await {
                readded += 1;
            }
        }
        tracing::debug!(
            height = block.header.height,
            readded,
            "returned block transactions to pool"
        );
        readded
    }

    /// Pool a locally created transaction and queue it for announcement.
    pub async fn broadcast_transaction(&self, tx: Transaction) -> Result<TxId, GeneratorError> {
        let id = tx.id()?;
        if !self.deps.pool.contains(&id).await && !self.deps.pool.add(tx).await {
            let reason = format!("pool refused transaction {id}");
            return Err(CollaboratorError::Rejected(reason).into());
        }
        self.broadcaster.enqueue(id).await;
        Ok(id)
    }

    /// Best-effort pull of outstanding pool transactions from any peer.
    /// Returns the number of transactions added.
    pub async fn load_transactions_from_network(&self) -> usize {
        let request = match GetTransactionsRequest::default().encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode transactions request");
                return 0;
            }
        };

        let retries = self.config.load_transactions_retries;
        for attempt in 1..=retries {
            match self
                .deps
                .network
                .request_from_network(RPC_GET_TRANSACTIONS, request.clone())
                .await
            {
                Ok((data, peer_id)) => match decode_transactions(&data) {
                    Ok(transactions) => {
                        let mut added = 0;
                        for tx in transactions {
                            if self.deps.pool.add(tx).await {
                                added += 1;
                            }
                        }
                        tracing::info!(peer = %peer_id, added, "loaded transactions from network");
                        return added;
                    }
                    Err(e) => {
                        tracing::warn!(
                            peer = %peer_id,
                            error = %e,
                            "peer sent malformed transactions"
                        );
                        if let Err(e) = self
                            .deps
                            .network
                            .apply_penalty_on_peer(&peer_id, INVALID_DATA_PENALTY)
                            .await
                        {
                            tracing::warn!(peer = %peer_id, error = %e, "failed to penalise peer");
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(attempt, retries, error = %e, "failed to request transactions");
                }
            }
        }
        tracing::warn!(retries, "giving up loading transactions from network");
        0
    }
}

pub(crate) fn decode_transactions(
    data: &[u8],
) -> Result<Vec<Transaction>, delos_types::DelosError> {
    GetTransactionsResponse::decode(data)?
        .transactions
        .iter()
        .map(|bytes| Transaction::decode(bytes))
        .collect()
}

fn transaction_root(transactions: &[Transaction]) -> Result<[u8; 32], GeneratorError> {
    let ids = transactions
        .iter()
        .map(|tx| tx.id().map(|id| *id.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merkle_root(&ids))
}

/// Stamp events with their height and position, then hash them.
fn event_root(events: &mut [Event], height: u64) -> Result<[u8; 32], GeneratorError> {
    let mut encoded = Vec::with_capacity(events.len());
    for (index, event) in events.iter_mut().enumerate() {
        event.height = height;
        event.index = u32::try_from(index).unwrap_or(u32::MAX);
        encoded.push(event.encode()?);
    }
    Ok(merkle_root(&encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> Event {
        Event {
            module: "token".into(),
            name: name.into(),
            data: vec![],
            topics: vec![],
            height: 0,
            index: 0,
        }
    }

    #[test]
    fn events_are_stamped_before_hashing() {
        let mut events = vec![event("a"), event("b"), event("c")];
        let root = event_root(&mut events, 42).unwrap();

        assert!(events.iter().all(|e| e.height == 42));
        assert_eq!(events.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        let encoded: Vec<Vec<u8>> = events.iter().map(|e| e.encode().unwrap()).collect();
        assert_eq!(root, merkle_root(&encoded));
    }

    #[test]
    fn empty_block_roots_match_empty_merkle_root() {
        let empty: [&[u8]; 0] = [];
        assert_eq!(transaction_root(&[]).unwrap(), merkle_root(&empty));
        assert_eq!(event_root(&mut [], 1).unwrap(), merkle_root(&empty));
    }
}
