//! Round parameters governing validator selection.

use serde::{Deserialize, Serialize};

/// Base units per whole token.
pub const TOKEN_UNIT: u128 = 100_000_000;

/// Parameters that shape each round's snapshot and forger list.
///
/// Every node on a chain must use identical values; they are chain
/// constants, not local policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundParams {
    /// Size of the active validator set taken from the top of the ranking.
    pub number_active_validators: usize,
    /// Number of extra seats filled by weighted sampling of standby candidates.
    pub number_standby_seats: usize,
    /// Slots per round.
    pub round_length: u64,
    /// Minimum weight for a non-active candidate to be eligible for a standby seat.
    pub min_weight_standby: u128,
    /// Total votes are capped at `self_vote_factor * self_votes`.
    pub self_vote_factor: u128,
    /// Heights during which a proof of misbehaviour zeroes a candidate's weight.
    pub punishment_window: u64,
    /// Number of past rounds whose snapshots are kept.
    pub snapshot_retention_rounds: u64,
}

impl Default for RoundParams {
    fn default() -> Self {
        Self {
            number_active_validators: 101,
            number_standby_seats: 2,
            round_length: 103,
            min_weight_standby: 1_000 * TOKEN_UNIT,
            self_vote_factor: 10,
            punishment_window: 780_000,
            snapshot_retention_rounds: 3,
        }
    }
}

impl RoundParams {
    /// Total seats in a round's validator set.
    pub fn seats(&self) -> usize {
        self.number_active_validators + self.number_standby_seats
    }
}
