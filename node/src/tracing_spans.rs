//! Span constructors shared by the forging loops, so traces can be filtered
//! by operation name.

use tracing::{debug_span, info_span, Span};

/// One poll of the generation loop.
pub fn generation_tick_span(slot: u64) -> Span {
    debug_span!("generation_tick", slot)
}

pub fn block_generate_span(height: u64, generator: &str) -> Span {
    info_span!("block_generate", height, generator = %generator)
}

pub fn selection_span(height: u64, budget: u64) -> Span {
    debug_span!("transaction_selection", height, budget)
}

pub fn single_commit_span(from: u64, to: u64) -> Span {
    info_span!("single_commit", from, to)
}

pub fn broadcast_span(ids: usize) -> Span {
    debug_span!("announcement_broadcast", ids)
}

/// Handling of a single inbound request or event from a peer.
pub fn network_recv_span(peer: &str, procedure: &str) -> Span {
    info_span!("network_recv", peer = %peer, procedure = %procedure)
}
