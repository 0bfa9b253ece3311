//! Round-boundary refresh: snapshot the candidate weights when a round's
//! last block executes and install the next round's forger list.

use delos_types::RoundParams;

use crate::forger_list::{build_forger_list, Seed};
use crate::schedule::LeaderSchedule;
use crate::slot::{is_last_of_round, round_of};
use crate::snapshot_cache::SnapshotCache;
use crate::weight_snapshot::{compute_snapshot, CandidateWeight, Snapshot};

pub struct RoundTransition {
    params: RoundParams,
    snapshots: SnapshotCache,
}

impl RoundTransition {
    pub fn new(params: RoundParams) -> Self {
        let snapshots = SnapshotCache::new(params.snapshot_retention_rounds);
        Self { params, snapshots }
    }

    pub fn params(&self) -> &RoundParams {
        &self.params
    }

    pub fn snapshot(&self, round: u64) -> Option<&Snapshot> {
        self.snapshots.get(round)
    }

    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.latest()
    }

    pub fn cached_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    /// Called after the block at `height` executed. When it closes a round,
    /// the snapshot of the following round is cached and its forger list is
    /// installed on `schedule`. Returns the round that was prepared.
    pub fn on_block_executed(
        &mut self,
        height: u64,
        candidates: &[CandidateWeight],
        seed1: &Seed,
        seed2: &Seed,
        schedule: &mut LeaderSchedule,
    ) -> Option<u64> {
        if !is_last_of_round(height, self.params.round_length) {
            return None;
        }
        let next_round = round_of(height, self.params.round_length) + 1;
        let snapshot = compute_snapshot(next_round, height, candidates, &self.params);
        let list = build_forger_list(&snapshot, seed1, seed2, self.params.number_standby_seats);
        self.snapshots.insert(snapshot);
        schedule.install(list);
        tracing::debug!(height, round = next_round, "prepared next round");
        Some(next_round)
    }
}
