//! Outbound transaction-announcement broadcaster.
//!
//! Ids of locally created or re-gossiped transactions are queued (FIFO,
//! de-duplicated) and flushed to the network on a fixed interval, at most
//! `limit` ids per flush. Ids that left the pool before their flush are
//! dropped silently.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use delos_types::TxId;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::Instrument;

use crate::collaborators::{Network, TransactionPool};
use crate::error::CollaboratorError;
use crate::metrics::GeneratorMetrics;
use crate::shutdown::ShutdownController;
use crate::tracing_spans::broadcast_span;
use crate::wire_message::{
    TransactionsAnnouncement, WirePayload, EVENT_POST_TRANSACTIONS_ANNOUNCEMENT,
};

#[derive(Default)]
struct PendingAnnouncement {
    order: VecDeque<TxId>,
    members: HashSet<TxId>,
}

struct Inner {
    pending: Mutex<PendingAnnouncement>,
    pool: Arc<dyn TransactionPool>,
    network: Arc<dyn Network>,
    metrics: Arc<GeneratorMetrics>,
    limit: usize,
}

struct Running {
    shutdown: ShutdownController,
    handle: JoinHandle<()>,
}

pub struct Broadcaster {
    inner: Arc<Inner>,
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl Broadcaster {
    pub fn new(
        pool: Arc<dyn TransactionPool>,
        network: Arc<dyn Network>,
        metrics: Arc<GeneratorMetrics>,
        interval: Duration,
        limit: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(PendingAnnouncement::default()),
                pool,
                network,
                metrics,
                limit,
            }),
            interval,
            running: Mutex::new(None),
        }
    }

    /// Queue an id. Returns `false` if it was already queued.
    pub async fn enqueue(&self, id: TxId) -> bool {
        let mut pending = self.inner.pending.lock().await;
        if !pending.members.insert(id) {
            return false;
        }
        pending.order.push_back(id);
        true
    }

    pub async fn pending_len(&self) -> usize {
        self.inner.pending.lock().await.order.len()
    }

    /// Pop up to `limit` ids and broadcast those still pooled.
    /// Returns the number of ids announced.
    pub async fn flush(&self) -> Result<usize, CollaboratorError> {
        self.inner.flush().await
    }

    /// Start the periodic flush. A second call while running is a no-op.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return;
        }
        let shutdown = ShutdownController::new();
        let mut shutdown_rx = shutdown.subscribe();
        let inner = Arc::clone(&self.inner);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        if let Err(e) = inner.flush().await {
                            tracing::warn!(
                                error = %e,
                                "failed to broadcast transaction announcement"
                            );
                        }
                    }
                }
            }
            tracing::debug!("broadcaster stopped");
        });

        *running = Some(Running { shutdown, handle });
    }

    /// Stop the periodic flush without flushing. When this returns no
    /// further flush will run.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        if let Some(Running { shutdown, handle }) = running {
            shutdown.shutdown();
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "broadcaster task ended abnormally");
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

impl Inner {
    /// Pop up to `limit` ids that are still pooled; evicted ids are dropped
    /// without counting against the limit.
    async fn take_batch(&self) -> Vec<TxId> {
        let mut pending = self.pending.lock().await;
        let mut batch = Vec::with_capacity(self.limit.min(pending.order.len()));
        while batch.len() < self.limit {
            let Some(id) = pending.order.pop_front() else {
                break;
            };
            pending.members.remove(&id);
            if self.pool.contains(&id).await {
                batch.push(id);
            }
        }
        batch
    }

    /// Put an unsent batch back at the head of the queue, in its original
    /// order. Ids enqueued again in the meantime keep their newer position.
    async fn requeue_front(&self, batch: Vec<TxId>) {
        let mut pending = self.pending.lock().await;
        for id in batch.into_iter().rev() {
            if pending.members.insert(id) {
                pending.order.push_front(id);
            }
        }
    }

    async fn flush(&self) -> Result<usize, CollaboratorError> {
        let transaction_ids = self.take_batch().await;
        if transaction_ids.is_empty() {
            return Ok(0);
        }

        let count = transaction_ids.len();
        let data = TransactionsAnnouncement { transaction_ids: transaction_ids.clone() }
            .encode()
            .map_err(|e| CollaboratorError::Rejected(e.to_string()))?;
        let sent = self
            .network
            .broadcast(EVENT_POST_TRANSACTIONS_ANNOUNCEMENT, data)
            .instrument(broadcast_span(count))
            .await;
        if let Err(e) = sent {
            tracing::debug!(count, "announcement not sent, batch requeued");
            self.requeue_front(transaction_ids).await;
            return Err(e);
        }
        self.metrics.announcements_broadcast.inc();
        tracing::debug!(count, "broadcast transaction announcement");
        Ok(count)
    }
}
