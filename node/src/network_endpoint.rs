//! Handlers for transaction gossip arriving from peers.

use std::collections::HashMap;
use std::sync::Arc;

use delos_types::{Timestamp, TxId};
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::broadcaster::Broadcaster;
use crate::collaborators::{Clock, Network, TransactionPool};
use crate::error::NetworkEndpointError;
use crate::generator::decode_transactions;
use crate::tracing_spans::network_recv_span;
use crate::wire_message::{
    GetTransactionsRequest, GetTransactionsResponse, TransactionsAnnouncement, WirePayload,
    EVENT_POST_TRANSACTIONS_ANNOUNCEMENT, RPC_GET_TRANSACTIONS,
};

pub const RATE_LIMIT_WINDOW_SECS: u64 = 10;
/// `getTransactions` calls allowed per peer per window.
pub const GET_TRANSACTIONS_RATE_LIMIT: u32 = 3;
pub const RATE_LIMIT_PENALTY: u32 = 10;
pub const INVALID_DATA_PENALTY: u32 = 100;

/// Fixed-window request counter per peer.
#[derive(Default)]
struct RateTracker {
    windows: HashMap<String, (Timestamp, u32)>,
}

impl RateTracker {
    /// Count one request. Returns `false` once the peer is over the limit.
    fn allow(&mut self, peer_id: &str, now: Timestamp) -> bool {
        self.windows
            .retain(|_, (start, _)| start.elapsed_since(now) < RATE_LIMIT_WINDOW_SECS);
        let entry = self.windows.entry(peer_id.to_string()).or_insert((now, 0));
        entry.1 += 1;
        entry.1 <= GET_TRANSACTIONS_RATE_LIMIT
    }
}

pub struct NetworkEndpoint {
    pool: Arc<dyn TransactionPool>,
    network: Arc<dyn Network>,
    broadcaster: Arc<Broadcaster>,
    clock: Arc<dyn Clock>,
    announcement_limit: usize,
    rate: Mutex<RateTracker>,
}

impl NetworkEndpoint {
    pub fn new(
        pool: Arc<dyn TransactionPool>,
        network: Arc<dyn Network>,
        broadcaster: Arc<Broadcaster>,
        clock: Arc<dyn Clock>,
        announcement_limit: usize,
    ) -> Self {
        Self {
            pool,
            network,
            broadcaster,
            clock,
            announcement_limit,
            rate: Mutex::new(RateTracker::default()),
        }
    }

    /// Answer a `getTransactions` request with the pooled transactions it
    /// names, or with every processable transaction when it names none.
    pub async fn handle_rpc_get_transactions(
        &self,
        data: &[u8],
        peer_id: &str,
    ) -> Result<Vec<u8>, NetworkEndpointError> {
        self.get_transactions(data, peer_id)
            .instrument(network_recv_span(peer_id, RPC_GET_TRANSACTIONS))
            .await
    }

    async fn get_transactions(
        &self,
        data: &[u8],
        peer_id: &str,
    ) -> Result<Vec<u8>, NetworkEndpointError> {
        let allowed = self.rate.lock().await.allow(peer_id, self.clock.now());
        if !allowed {
            self.penalise(peer_id, RATE_LIMIT_PENALTY).await;
            return Err(NetworkEndpointError::RateLimited(peer_id.to_string()));
        }

        let request = match GetTransactionsRequest::decode(data) {
            Ok(request) => request,
            Err(e) => {
                self.penalise(peer_id, INVALID_DATA_PENALTY).await;
                return Err(NetworkEndpointError::Decode {
                    peer: peer_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let mut transactions = Vec::new();
        if request.transaction_ids.is_empty() {
            for queue in self.pool.processable_transactions().await.into_values() {
                for tx in queue {
                    transactions.push(tx.encode()?);
                }
            }
        } else {
            for id in &request.transaction_ids {
                if let Some(tx) = self.pool.get(id).await {
                    transactions.push(tx.encode()?);
                }
            }
        }
        tracing::debug!(peer = %peer_id, returned = transactions.len(), "served getTransactions");
        Ok(GetTransactionsResponse { transactions }.encode()?)
    }

    /// Fetch the unknown transactions of an announcement from the announcing
    /// peer, pool them and queue them for re-announcement.
    /// Returns the number of transactions added to the pool.
    pub async fn handle_event_post_transactions_announcement(
        &self,
        data: &[u8],
        peer_id: &str,
    ) -> Result<usize, NetworkEndpointError> {
        self.on_announcement(data, peer_id)
            .instrument(network_recv_span(peer_id, EVENT_POST_TRANSACTIONS_ANNOUNCEMENT))
            .await
    }

    async fn on_announcement(
        &self,
        data: &[u8],
        peer_id: &str,
    ) -> Result<usize, NetworkEndpointError> {
        let announcement = match TransactionsAnnouncement::decode(data) {
            Ok(announcement) => announcement,
            Err(e) => {
                self.penalise(peer_id, INVALID_DATA_PENALTY).await;
                return Err(NetworkEndpointError::Decode {
                    peer: peer_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };
        let count = announcement.transaction_ids.len();
        if count > self.announcement_limit {
            self.penalise(peer_id, INVALID_DATA_PENALTY).await;
            return Err(NetworkEndpointError::TooManyIds {
                peer: peer_id.to_string(),
                count,
                limit: self.announcement_limit,
            });
        }

        let mut unknown: Vec<TxId> = Vec::new();
        for id in announcement.transaction_ids {
            if !unknown.contains(&id) && !self.pool.contains(&id).await {
                unknown.push(id);
            }
        }
        if unknown.is_empty() {
            return Ok(0);
        }

        let request = GetTransactionsRequest {
            transaction_ids: unknown,
        }
        .encode()?;
        let response = self
            .network
            .request_from_peer(RPC_GET_TRANSACTIONS, request, peer_id)
            .await?;
        let transactions = match decode_transactions(&response) {
            Ok(transactions) => transactions,
            Err(e) => {
                self.penalise(peer_id, INVALID_DATA_PENALTY).await;
                return Err(NetworkEndpointError::Decode {
                    peer: peer_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let mut added = 0;
        for tx in transactions {
            let id = tx.id()?;
            if self.pool.add(tx).await {
                self.broadcaster.enqueue(id).await;
                added += 1;
            }
        }
        tracing::debug!(
            peer = %peer_id,
            announced = count,
            added,
            "processed transaction announcement"
        );
        Ok(added)
    }

    async fn penalise(&self, peer_id: &str, penalty: u32) {
        tracing::warn!(peer = %peer_id, penalty, "penalising peer");
        if let Err(e) = self.network.apply_penalty_on_peer(peer_id, penalty).await {
            tracing::warn!(peer = %peer_id, error = %e, "failed to apply penalty");
        }
    }
}
