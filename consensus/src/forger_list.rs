//! Round forger lists.
//!
//! A round's validator set is the snapshot's active addresses plus a
//! weight-proportional sample of standby candidates. The set is then put in
//! slot order by a Fisher–Yates pass whose swap positions are read from a
//! SHA-256 hash chain over the first seed. Both steps depend only on the
//! snapshot and the two seeds.

use delos_crypto::sha256;
use delos_types::Address;
use serde::{Deserialize, Serialize};

use crate::weight_snapshot::{DelegateWeight, Snapshot};

/// A 32-byte random seed taken from the chain's randomness source.
pub type Seed = [u8; 32];

/// The slot order of one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgerList {
    pub round: u64,
    generators: Vec<Address>,
}

impl ForgerList {
    pub fn new(round: u64, generators: Vec<Address>) -> Self {
        Self { round, generators }
    }

    /// Generator for the `slot_index`-th slot, wrapping when the list is
    /// shorter than the round. `None` only for an empty list.
    pub fn generator_at(&self, slot_index: u64) -> Option<&Address> {
        if self.generators.is_empty() {
            return None;
        }
        let idx = (slot_index % self.generators.len() as u64) as usize;
        self.generators.get(idx)
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.generators.contains(address)
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.generators
    }
}

fn u64_be(bytes: &[u8; 32]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

/// Draw up to `seats` addresses from `standby` without replacement,
/// each draw proportional to the remaining weights.
///
/// Draw `k` reads its threshold from `s_k`, where `s_0 = seed` and
/// `s_{k+1} = sha256(s_k)`. Zero-weight candidates are never drawn.
pub fn pick_standby_validators(
    standby: &[DelegateWeight],
    seed: &Seed,
    seats: usize,
) -> Vec<Address> {
    let mut remaining: Vec<DelegateWeight> = standby.to_vec();
    let mut total: u128 = remaining.iter().fold(0u128, |acc, w| acc.saturating_add(w.weight));
    let mut current = *seed;
    let mut picked = Vec::with_capacity(seats.min(remaining.len()));

    for _ in 0..seats {
        if total == 0 {
            break;
        }
        let mut threshold = u64_be(&current) as u128 % total;
        let mut chosen = None;
        for (i, candidate) in remaining.iter().enumerate() {
            if candidate.weight > threshold {
                chosen = Some(i);
                break;
            }
            threshold -= candidate.weight;
        }
        // threshold < total, so the walk always lands on a candidate.
        let Some(i) = chosen else { break };
        let winner = remaining.remove(i);
        total -= winner.weight;
        picked.push(winner.address);
        current = sha256(&current);
    }
    picked
}

/// Seeded Fisher–Yates shuffle.
///
/// Walks from the last index down; each swap position is the next
/// big-endian `u32` of the hash chain `sha256(seed), sha256(sha256(seed)), ...`
/// reduced modulo `i + 1`.
pub fn shuffle_validator_list(seed: &Seed, addresses: &[Address]) -> Vec<Address> {
    let mut list = addresses.to_vec();
    let mut hash = sha256(seed);
    let mut word = 0usize;

    for i in (1..list.len()).rev() {
        if word == 8 {
            hash = sha256(&hash);
            word = 0;
        }
        let offset = word * 4;
        let mut word_bytes = [0u8; 4];
        word_bytes.copy_from_slice(&hash[offset..offset + 4]);
        let w = u32::from_be_bytes(word_bytes);
        word += 1;
        let j = (w as u64 % (i as u64 + 1)) as usize;
        list.swap(i, j);
    }
    list
}

/// Build the slot order for `snapshot.round`.
///
/// `seed1` drives the shuffle, `seed2` the standby sampling.
pub fn build_forger_list(
    snapshot: &Snapshot,
    seed1: &Seed,
    seed2: &Seed,
    standby_seats: usize,
) -> ForgerList {
    let mut validators = snapshot.active_addresses.clone();
    if standby_seats > 0 && !snapshot.standby_weights.is_empty() {
        let standby = pick_standby_validators(&snapshot.standby_weights, seed2, standby_seats);
        tracing::debug!(round = snapshot.round, picked = standby.len(), "standby seats filled");
        validators.extend(standby);
    }
    ForgerList::new(snapshot.round, shuffle_validator_list(seed1, &validators))
}
