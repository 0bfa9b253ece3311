//! Vote-weight snapshots taken at round boundaries.
//!
//! A candidate's weight is its total received votes capped at
//! `self_vote_factor × self_votes`, or zero while banned or punished.
//! Candidates are ranked by weight descending with ties broken by raw
//! address bytes ascending, which gives every node the same total order.

use delos_types::{Address, RoundParams};
use serde::{Deserialize, Serialize};

/// Input row: everything needed to weigh one validator candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateWeight {
    pub address: Address,
    pub total_votes: u128,
    pub self_votes: u128,
    pub banned: bool,
    /// Heights at which proofs of misbehaviour were applied.
    pub pom_heights: Vec<u64>,
}

/// A candidate's effective weight for one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelegateWeight {
    pub address: Address,
    pub weight: u128,
}

/// The active/standby partition of one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub round: u64,
    /// Top-ranked addresses, in rank order.
    pub active_addresses: Vec<Address>,
    /// Remaining candidates with at least the standby minimum, in rank order.
    pub standby_weights: Vec<DelegateWeight>,
}

impl Snapshot {
    pub fn standby_total_weight(&self) -> u128 {
        self.standby_weights
            .iter()
            .fold(0u128, |acc, w| acc.saturating_add(w.weight))
    }
}

/// Effective weight of `candidate` as of `height`.
pub fn compute_weight(candidate: &CandidateWeight, height: u64, params: &RoundParams) -> u128 {
    if candidate.banned {
        return 0;
    }
    let punished = candidate
        .pom_heights
        .iter()
        .any(|&p| height < p.saturating_add(params.punishment_window));
    if punished {
        return 0;
    }
    let cap = candidate.self_votes.saturating_mul(params.self_vote_factor);
    candidate.total_votes.min(cap)
}

/// Rank `candidates` and split them into the active set and standby pool.
///
/// Always total: with fewer candidates than active seats the active list is
/// short and the standby pool is empty.
pub fn compute_snapshot(
    round: u64,
    height: u64,
    candidates: &[CandidateWeight],
    params: &RoundParams,
) -> Snapshot {
    let mut ranked: Vec<DelegateWeight> = candidates
        .iter()
        .map(|c| DelegateWeight {
            address: c.address,
            weight: compute_weight(c, height, params),
        })
        .collect();

    ranked.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.address.cmp(&b.address)));

    let cut = params.number_active_validators.min(ranked.len());
    let standby_weights: Vec<DelegateWeight> = ranked[cut..]
        .iter()
        .filter(|w| w.weight >= params.min_weight_standby)
        .copied()
        .collect();
    let active_addresses: Vec<Address> = ranked[..cut].iter().map(|w| w.address).collect();

    tracing::debug!(
        round,
        height,
        active = active_addresses.len(),
        standby = standby_weights.len(),
        "computed weight snapshot"
    );

    Snapshot {
        round,
        active_addresses,
        standby_weights,
    }
}
