//! Nullable consensus: a leader schedule plus recorders for commits and
//! executed blocks.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use delos_consensus::{
    CandidateWeight, ConsensusError, ForgerList, LeaderSchedule, RoundTransition, Seed, SlotClock,
};
use delos_types::{
    AggregateCommit, Address, Block, BlockHeader, ConsensusParams, RoundParams, Timestamp,
};

/// A single commit the consensus layer was asked to certify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertifiedCommit {
    pub height: u64,
    pub address: Address,
}

/// Chain state read at a round boundary.
struct RoundInputs {
    candidates: Vec<CandidateWeight>,
    seed1: Seed,
    seed2: Seed,
}

pub struct NullConsensus {
    schedule: Mutex<LeaderSchedule>,
    rounds: Mutex<RoundTransition>,
    /// `None` keeps the installed forger lists fixed.
    round_inputs: Mutex<Option<RoundInputs>>,
    max_removal_height: AtomicU64,
    aggregate_commit: Mutex<AggregateCommit>,
    params: Mutex<ConsensusParams>,
    certified: Mutex<Vec<CertifiedCommit>>,
    failing_heights: Mutex<HashSet<u64>>,
    executed: Mutex<Vec<Block>>,
}

impl NullConsensus {
    pub fn new(clock: SlotClock) -> Self {
        Self {
            schedule: Mutex::new(LeaderSchedule::new(clock, 3)),
            rounds: Mutex::new(RoundTransition::new(RoundParams::default())),
            round_inputs: Mutex::new(None),
            max_removal_height: AtomicU64::new(0),
            aggregate_commit: Mutex::new(AggregateCommit::default()),
            params: Mutex::new(ConsensusParams::default()),
            certified: Mutex::new(Vec::new()),
            failing_heights: Mutex::new(HashSet::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn slot_clock(&self) -> SlotClock {
        *self.schedule.lock().unwrap().clock()
    }

    pub fn slot_number(&self, timestamp: Timestamp) -> u64 {
        self.slot_clock().slot_number(timestamp)
    }

    pub fn slot_time(&self, slot: u64) -> Timestamp {
        self.slot_clock().slot_time(slot)
    }

    pub fn install_forger_list(&self, list: ForgerList) {
        self.schedule.lock().unwrap().install(list);
    }

    pub fn generator_at_timestamp(&self, timestamp: Timestamp) -> Result<Address, ConsensusError> {
        self.schedule.lock().unwrap().generator_at_timestamp(timestamp)
    }

    pub fn current_round(&self) -> Option<u64> {
        self.schedule.lock().unwrap().current_round()
    }

    pub fn forger_list(&self, round: u64) -> Option<Vec<Address>> {
        self.schedule
            .lock()
            .unwrap()
            .list_for_round(round)
            .map(|list| list.as_slice().to_vec())
    }

    /// Refresh the forger list whenever an executed block closes a round,
    /// ranking `candidates` and shuffling with the given seeds.
    pub fn refresh_rounds(
        &self,
        params: RoundParams,
        candidates: Vec<CandidateWeight>,
        seed1: Seed,
        seed2: Seed,
    ) {
        *self.rounds.lock().unwrap() = RoundTransition::new(params);
        *self.round_inputs.lock().unwrap() = Some(RoundInputs {
            candidates,
            seed1,
            seed2,
        });
    }

    /// Rounds whose snapshot is still cached, oldest first.
    pub fn cached_snapshot_rounds(&self) -> Vec<u64> {
        let rounds = self.rounds.lock().unwrap();
        let Some(latest) = rounds.latest_snapshot().map(|s| s.round) else {
            return Vec::new();
        };
        (0..=latest).filter(|r| rounds.snapshot(*r).is_some()).collect()
    }

    pub fn set_max_removal_height(&self, height: u64) {
        self.max_removal_height.store(height, Ordering::SeqCst);
    }

    pub fn max_removal_height(&self) -> u64 {
        self.max_removal_height.load(Ordering::SeqCst)
    }

    pub fn set_aggregate_commit(&self, commit: AggregateCommit) {
        *self.aggregate_commit.lock().unwrap() = commit;
    }

    pub fn aggregate_commit(&self) -> AggregateCommit {
        self.aggregate_commit.lock().unwrap().clone()
    }

    pub fn set_consensus_params(&self, params: ConsensusParams) {
        *self.params.lock().unwrap() = params;
    }

    pub fn consensus_params(&self) -> ConsensusParams {
        self.params.lock().unwrap().clone()
    }

    /// Make certification at `height` fail.
    pub fn fail_certification_at(&self, height: u64) {
        self.failing_heights.lock().unwrap().insert(height);
    }

    /// Record a certification; `Err` when `height` was marked failing.
    pub fn certify(&self, header: &BlockHeader, address: Address) -> Result<(), String> {
        if self.failing_heights.lock().unwrap().contains(&header.height) {
            return Err(format!("certification rejected at height {}", header.height));
        }
        self.certified.lock().unwrap().push(CertifiedCommit {
            height: header.height,
            address,
        });
        Ok(())
    }

    /// Everything certified so far, ordered by (height, address).
    pub fn certified(&self) -> Vec<CertifiedCommit> {
        let mut out = self.certified.lock().unwrap().clone();
        out.sort_by(|a, b| a.height.cmp(&b.height).then_with(|| a.address.cmp(&b.address)));
        out
    }

    pub fn execute(&self, block: Block) {
        let height = block.header.height;
        self.executed.lock().unwrap().push(block);
        if let Some(inputs) = self.round_inputs.lock().unwrap().as_ref() {
            self.rounds.lock().unwrap().on_block_executed(
                height,
                &inputs.candidates,
                &inputs.seed1,
                &inputs.seed2,
                &mut self.schedule.lock().unwrap(),
            );
        }
    }

    pub fn executed(&self) -> Vec<Block> {
        self.executed.lock().unwrap().clone()
    }
}
