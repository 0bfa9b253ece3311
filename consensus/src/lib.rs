//! Consensus-side scheduling for Delos DPoS.
//!
//! Everything in this crate is pure and synchronous: the same chain state
//! must yield byte-identical results on every node.
//!
//! ## Module overview
//!
//! - [`weight_snapshot`]: capped vote weights and the active/standby partition of a round.
//! - [`forger_list`]: weighted standby sampling and the seeded shuffle producing a
//!   round's slot order.
//! - [`snapshot_cache`]: bounded retention of past snapshots.
//! - [`slot`]: slot and round arithmetic.
//! - [`schedule`]: slot-to-generator lookup over installed forger lists.
//! - [`round_transition`]: snapshot and forger-list refresh at round boundaries.
//! - [`error`]: consensus error types.

pub mod error;
pub mod forger_list;
pub mod round_transition;
pub mod schedule;
pub mod slot;
pub mod snapshot_cache;
pub mod weight_snapshot;

pub use error::ConsensusError;
pub use forger_list::{
    build_forger_list, pick_standby_validators, shuffle_validator_list, ForgerList, Seed,
};
pub use round_transition::RoundTransition;
pub use schedule::LeaderSchedule;
pub use slot::{is_last_of_round, round_of, round_start_height, SlotClock};
pub use snapshot_cache::SnapshotCache;
pub use weight_snapshot::{
    compute_snapshot, compute_weight, CandidateWeight, DelegateWeight, Snapshot,
};
