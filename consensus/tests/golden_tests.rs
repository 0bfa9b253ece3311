//! Fixed-input vectors for snapshot ranking, standby sampling and the
//! shuffle. Any change to these outputs is a consensus-breaking change.

use delos_consensus::{
    build_forger_list, compute_snapshot, pick_standby_validators, shuffle_validator_list,
    CandidateWeight,
};
use delos_types::{Address, RoundParams};

fn addr(b: u8) -> Address {
    Address::new([b; 20])
}

fn first_bytes(list: &[Address]) -> Vec<u8> {
    list.iter().map(|a| a.as_bytes()[0]).collect()
}

fn candidates() -> Vec<CandidateWeight> {
    [
        (0x11, 500, 100),
        (0x22, 900, 50),
        (0x33, 500, 60),
        (0x44, 300, 300),
        (0x55, 200, 100),
        (0x66, 120, 12),
        (0x77, 80, 80),
        (0x08, 500, 50),
    ]
    .into_iter()
    .map(|(b, total, own)| CandidateWeight {
        address: addr(b),
        total_votes: total,
        self_votes: own,
        banned: false,
        pom_heights: vec![],
    })
    .collect()
}

fn params() -> RoundParams {
    RoundParams {
        number_active_validators: 3,
        number_standby_seats: 2,
        min_weight_standby: 100,
        ..RoundParams::default()
    }
}

fn seed1() -> [u8; 32] {
    let mut s = [0u8; 32];
    for (i, b) in s.iter_mut().enumerate() {
        *b = i as u8;
    }
    s
}

#[test]
fn snapshot_ranking_vector() {
    let snap = compute_snapshot(12, 1_236, &candidates(), &params());
    // Four candidates tie at 500; raw address bytes decide.
    assert_eq!(first_bytes(&snap.active_addresses), vec![0x08, 0x11, 0x22]);
    let standby: Vec<(u8, u128)> = snap
        .standby_weights
        .iter()
        .map(|w| (w.address.as_bytes()[0], w.weight))
        .collect();
    assert_eq!(standby, vec![(0x33, 500), (0x44, 300), (0x55, 200), (0x66, 120)]);
}

#[test]
fn standby_sampling_vector() {
    let snap = compute_snapshot(12, 1_236, &candidates(), &params());
    let picked = pick_standby_validators(&snap.standby_weights, &[0xAB; 32], 2);
    assert_eq!(first_bytes(&picked), vec![0x33, 0x44]);
    let picked = pick_standby_validators(&snap.standby_weights, &[1; 32], 2);
    assert_eq!(first_bytes(&picked), vec![0x33, 0x55]);
    let picked = pick_standby_validators(&snap.standby_weights, &[10; 32], 2);
    assert_eq!(first_bytes(&picked), vec![0x33, 0x66]);
}

#[test]
fn forger_list_vector() {
    let snap = compute_snapshot(12, 1_236, &candidates(), &params());
    let list = build_forger_list(&snap, &seed1(), &[10; 32], 2);
    assert_eq!(first_bytes(list.as_slice()), vec![0x08, 0x66, 0x11, 0x22, 0x33]);
}

#[test]
fn shuffle_vector_spans_hash_refresh() {
    // 20 entries need 19 words, so the hash chain is extended twice.
    let input: Vec<Address> = (0..20).map(addr).collect();
    let out = shuffle_validator_list(&[7; 32], &input);
    assert_eq!(
        first_bytes(&out),
        vec![
            0x00, 0x0c, 0x10, 0x13, 0x03, 0x07, 0x04, 0x0f, 0x12, 0x0d, 0x0a, 0x02, 0x11, 0x08,
            0x01, 0x0b, 0x06, 0x05, 0x09, 0x0e
        ]
    );
}
