//! Slot-to-generator lookup.

use std::collections::BTreeMap;

use delos_types::{Address, Timestamp};

use crate::forger_list::ForgerList;
use crate::slot::SlotClock;
use crate::ConsensusError;

/// Answers "who forges this slot" from the forger lists of recent rounds.
pub struct LeaderSchedule {
    clock: SlotClock,
    lists: BTreeMap<u64, ForgerList>,
    retention: u64,
}

impl LeaderSchedule {
    pub fn new(clock: SlotClock, retention: u64) -> Self {
        Self {
            clock,
            lists: BTreeMap::new(),
            retention,
        }
    }

    pub fn clock(&self) -> &SlotClock {
        &self.clock
    }

    /// Install the forger list of a new round, pruning lists beyond retention.
    pub fn install(&mut self, list: ForgerList) {
        let round = list.round;
        tracing::info!(round, generators = list.len(), "installed forger list");
        self.lists.insert(round, list);
        let oldest_kept = round.saturating_sub(self.retention);
        self.lists = self.lists.split_off(&oldest_kept);
    }

    pub fn list_for_round(&self, round: u64) -> Option<&ForgerList> {
        self.lists.get(&round)
    }

    pub fn current_round(&self) -> Option<u64> {
        self.lists.keys().next_back().copied()
    }

    /// Generator for `slot` according to the latest installed list.
    pub fn generator_at_slot(&self, slot: u64) -> Result<Address, ConsensusError> {
        let (round, list) = self
            .lists
            .iter()
            .next_back()
            .ok_or(ConsensusError::NoForgerList(0))?;
        list.generator_at(slot)
            .copied()
            .ok_or(ConsensusError::EmptyForgerList(*round))
    }

    pub fn generator_at_timestamp(&self, timestamp: Timestamp) -> Result<Address, ConsensusError> {
        self.generator_at_slot(self.clock.slot_number(timestamp))
    }
}
