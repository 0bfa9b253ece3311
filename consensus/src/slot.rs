//! Slot and round arithmetic.

use delos_types::Timestamp;

use crate::ConsensusError;

/// Maps wall-clock time to slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotClock {
    genesis_timestamp: Timestamp,
    block_time: u64,
}

impl SlotClock {
    pub fn new(genesis_timestamp: Timestamp, block_time: u64) -> Result<Self, ConsensusError> {
        if block_time == 0 {
            return Err(ConsensusError::InvalidBlockTime);
        }
        Ok(Self {
            genesis_timestamp,
            block_time,
        })
    }

    pub fn block_time(&self) -> u64 {
        self.block_time
    }

    pub fn genesis_timestamp(&self) -> Timestamp {
        self.genesis_timestamp
    }

    /// Slot containing `timestamp`. Times before genesis map to slot 0.
    pub fn slot_number(&self, timestamp: Timestamp) -> u64 {
        self.genesis_timestamp.elapsed_since(timestamp) / self.block_time
    }

    /// Start time of `slot`.
    pub fn slot_time(&self, slot: u64) -> Timestamp {
        self.genesis_timestamp
            .saturating_add_secs(slot.saturating_mul(self.block_time))
    }
}

/// 1-based round containing `height`; height 0 belongs to round 0.
pub fn round_of(height: u64, round_length: u64) -> u64 {
    if round_length == 0 {
        return 0;
    }
    height.div_ceil(round_length)
}

/// First height of `round` (round >= 1).
pub fn round_start_height(round: u64, round_length: u64) -> u64 {
    round.saturating_sub(1) * round_length + 1
}

pub fn is_last_of_round(height: u64, round_length: u64) -> bool {
    round_length != 0 && height != 0 && height % round_length == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_block_time() {
        let clock = SlotClock::new(Timestamp::new(1_000), 10).unwrap();
        assert_eq!(clock.slot_number(Timestamp::new(1_000)), 0);
        assert_eq!(clock.slot_number(Timestamp::new(1_009)), 0);
        assert_eq!(clock.slot_number(Timestamp::new(1_010)), 1);
        assert_eq!(clock.slot_number(Timestamp::new(500)), 0);
        assert_eq!(clock.slot_time(3), Timestamp::new(1_030));
    }

    #[test]
    fn zero_block_time_rejected() {
        assert!(matches!(
            SlotClock::new(Timestamp::EPOCH, 0),
            Err(ConsensusError::InvalidBlockTime)
        ));
    }

    #[test]
    fn rounds_are_one_based() {
        assert_eq!(round_of(0, 103), 0);
        assert_eq!(round_of(1, 103), 1);
        assert_eq!(round_of(103, 103), 1);
        assert_eq!(round_of(104, 103), 2);
        assert_eq!(round_start_height(2, 103), 104);
        assert!(is_last_of_round(206, 103));
        assert!(!is_last_of_round(205, 103));
    }
}
