//! BFT single-commit certification for locally held validator keys.
//!
//! Driven by finalized-height notifications. For every newly finalized
//! height that can no longer be reorganized away, each local keypair that
//! is an active validator with a registered BLS key certifies the block
//! header at that height.

use std::sync::Arc;

use delos_types::{ActiveValidator, ForgingKeypair};
use futures_util::future::join_all;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::collaborators::{Bft, Chain, Consensus, FinalizedHeightChanged};
use crate::error::GeneratorError;
use crate::keypairs::KeypairTable;
use crate::metrics::GeneratorMetrics;
use crate::tracing_spans::single_commit_span;

pub struct SingleCommitHandler {
    consensus: Arc<dyn Consensus>,
    bft: Arc<dyn Bft>,
    chain: Arc<dyn Chain>,
    keypairs: KeypairTable,
    metrics: Arc<GeneratorMetrics>,
    /// Highest height already evaluated. Serialises handling of events.
    processed_up_to: Mutex<u64>,
}

impl SingleCommitHandler {
    pub fn new(
        consensus: Arc<dyn Consensus>,
        bft: Arc<dyn Bft>,
        chain: Arc<dyn Chain>,
        keypairs: KeypairTable,
        metrics: Arc<GeneratorMetrics>,
    ) -> Self {
        Self {
            consensus,
            bft,
            chain,
            keypairs,
            metrics,
            processed_up_to: Mutex::new(0),
        }
    }

    /// Certify every eligible `(height, keypair)` pair in `(from, to]`.
    /// Returns the number of successful certifications.
    ///
    /// Per-pair failures are logged and counted; only collaborator failures
    /// that prevent evaluating the range are returned as errors.
    pub async fn handle_finalized_height_changed(
        &self,
        from: u64,
        to: u64,
    ) -> Result<usize, GeneratorError> {
        self.handle(from, to).instrument(single_commit_span(from, to)).await
    }

    async fn handle(&self, from: u64, to: u64) -> Result<usize, GeneratorError> {
        let mut processed_up_to = self.processed_up_to.lock().await;
        if to <= from {
            return Ok(0);
        }

        let max_removal_height = self.consensus.max_removal_height().await?;
        if max_removal_height > to {
            tracing::debug!(max_removal_height, to, "finalized range may still be reorganized");
            return Ok(0);
        }

        let start = from.max(max_removal_height).max(*processed_up_to) + 1;
        let keypairs = self.keypairs.snapshot().await;
        if start > to || keypairs.is_empty() {
            *processed_up_to = (*processed_up_to).max(to);
            return Ok(0);
        }

        let mut eligible: Vec<(u64, Arc<ForgingKeypair>)> = Vec::new();
        for height in start..=to {
            let Some(validators) = self.validators_for(height, to).await else { continue };
            for keypair in &keypairs {
                if is_certifier(&validators, keypair, height) {
                    eligible.push((height, Arc::clone(keypair)));
                }
            }
        }

        let results = join_all(
            eligible
                .iter()
                .map(|(height, keypair)| self.certify(*height, keypair)),
        )
        .await;
        let certified = results.into_iter().filter(|ok| *ok).count();

        *processed_up_to = (*processed_up_to).max(to);
        tracing::debug!(
            start,
            to,
            eligible = eligible.len(),
            certified,
            "processed finalized range"
        );
        Ok(certified)
    }

    /// The active validators that must certify `height`, taken from the
    /// parameters registered at `height + 1`. The finalized tip falls back
    /// to the latest known set because its successor parameters may not be
    /// registered yet.
    async fn validators_for(&self, height: u64, tip: u64) -> Option<Vec<ActiveValidator>> {
        let next = height + 1;
        let query = match self.bft.exist_bft_parameters(next).await {
            Ok(true) => next,
            Ok(false) if height == tip => height,
            Ok(false) => return None,
            Err(e) => {
                tracing::warn!(height, error = %e, "failed to check BFT parameters");
                return None;
            }
        };
        match self.bft.active_validators(query).await {
            Ok(validators) => Some(validators),
            Err(e) => {
                tracing::warn!(height, error = %e, "failed to load active validators");
                None
            }
        }
    }

    async fn certify(&self, height: u64, keypair: &ForgingKeypair) -> bool {
        let header = match self.chain.block_header_by_height(height).await {
            Ok(header) => header,
            Err(e) => {
                tracing::error!(
                    height,
                    address = %keypair.address,
                    error = %e,
                    "failed to load header for single commit"
                );
                self.metrics.single_commits_failed.inc();
                return false;
            }
        };
        match self.consensus.certify_single_commit(&header, keypair).await {
            Ok(()) => {
                tracing::debug!(height, address = %keypair.address, "certified single commit");
                self.metrics.single_commits_issued.inc();
                true
            }
            Err(e) => {
                tracing::error!(
                    height,
                    address = %keypair.address,
                    error = %e,
                    "failed to certify single commit"
                );
                self.metrics.single_commits_failed.inc();
                false
            }
        }
    }

    /// Consume notifications one at a time until the channel closes or
    /// shutdown is signalled.
    pub fn spawn(
        self: Arc<Self>,
        mut events: mpsc::Receiver<FinalizedHeightChanged>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.recv() => break,
                    event = events.recv() => {
                        let Some(FinalizedHeightChanged { from, to }) = event else { break };
                        if let Err(e) = self.handle_finalized_height_changed(from, to).await {
                            tracing::error!(
                                from,
                                to,
                                error = %e,
                                "failed to handle finalized height change"
                            );
                        }
                    }
                }
            }
            tracing::debug!("single-commit handler stopped");
        })
    }
}

fn is_certifier(validators: &[ActiveValidator], keypair: &ForgingKeypair, height: u64) -> bool {
    let Some(entry) = validators.iter().find(|v| v.address == keypair.address) else {
        return false;
    };
    if entry.bls_key.is_zero() {
        tracing::debug!(height, address = %keypair.address, "validator has no registered BLS key");
        return false;
    }
    if entry.bls_key != keypair.bls_public_key {
        tracing::warn!(
            height,
            address = %keypair.address,
            "registered BLS key differs from local key"
        );
        return false;
    }
    true
}
