//! Retention-bounded store of round snapshots.

use std::collections::BTreeMap;

use crate::weight_snapshot::Snapshot;

/// Keeps the snapshots of the most recent rounds.
///
/// Inserting the snapshot of round `r` drops every snapshot of a round
/// older than `r - retention`.
pub struct SnapshotCache {
    snapshots: BTreeMap<u64, Snapshot>,
    retention: u64,
}

impl SnapshotCache {
    pub fn new(retention: u64) -> Self {
        Self {
            snapshots: BTreeMap::new(),
            retention,
        }
    }

    pub fn insert(&mut self, snapshot: Snapshot) {
        let oldest_kept = snapshot.round.saturating_sub(self.retention);
        self.snapshots.insert(snapshot.round, snapshot);
        let before = self.snapshots.len();
        self.snapshots = self.snapshots.split_off(&oldest_kept);
        let pruned = before - self.snapshots.len();
        if pruned > 0 {
            tracing::trace!(oldest_kept, pruned, "pruned round snapshots");
        }
    }

    pub fn get(&self, round: u64) -> Option<&Snapshot> {
        self.snapshots.get(&round)
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.values().next_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(round: u64) -> Snapshot {
        Snapshot {
            round,
            active_addresses: vec![],
            standby_weights: vec![],
        }
    }

    #[test]
    fn prunes_rounds_outside_retention() {
        let mut cache = SnapshotCache::new(3);
        for r in 1..=6 {
            cache.insert(snap(r));
        }
        assert!(cache.get(2).is_none());
        assert!(cache.get(3).is_some());
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.latest().map(|s| s.round), Some(6));
    }

    #[test]
    fn early_rounds_are_kept() {
        let mut cache = SnapshotCache::new(3);
        cache.insert(snap(1));
        cache.insert(snap(2));
        assert_eq!(cache.len(), 2);
    }
}
