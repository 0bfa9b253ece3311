//! Shapes of the data exchanged with the BFT and consensus collaborators.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::keys::BlsPublicKey;

/// The three BFT watermarks tracked by the consensus layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BftHeights {
    pub max_height_prevoted: u64,
    pub max_height_precommitted: u64,
    pub max_height_certified: u64,
}

/// One validator entry of a BFT parameter set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BftValidator {
    pub address: Address,
    pub bft_weight: u64,
    pub bls_key: BlsPublicKey,
}

/// BFT parameters effective from some height onward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BftParameters {
    pub prevote_threshold: u64,
    pub precommit_threshold: u64,
    pub certificate_threshold: u64,
    pub validators: Vec<BftValidator>,
    pub validators_hash: [u8; 32],
}

/// A validator that can sign single commits: non-zero BFT weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveValidator {
    pub address: Address,
    pub bls_key: BlsPublicKey,
}

impl BftParameters {
    /// Validators carrying non-zero BFT weight.
    pub fn active_validators(&self) -> Vec<ActiveValidator> {
        self.validators
            .iter()
            .filter(|v| v.bft_weight > 0)
            .map(|v| ActiveValidator {
                address: v.address,
                bls_key: v.bls_key,
            })
            .collect()
    }
}

/// Consensus-side parameters needed when assembling a header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub current_validators: Vec<BftValidator>,
    pub implies_max_prevote: bool,
    pub max_height_certified: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_validators_are_not_active() {
        let params = BftParameters {
            prevote_threshold: 1,
            precommit_threshold: 1,
            certificate_threshold: 1,
            validators: vec![
                BftValidator {
                    address: Address::new([1; 20]),
                    bft_weight: 1,
                    bls_key: BlsPublicKey([1; 48]),
                },
                BftValidator {
                    address: Address::new([2; 20]),
                    bft_weight: 0,
                    bls_key: BlsPublicKey([2; 48]),
                },
            ],
            validators_hash: [0; 32],
        };
        let active = params.active_validators();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].address, Address::new([1; 20]));
    }
}
