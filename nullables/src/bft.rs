//! Nullable BFT store: parameter sets keyed by the height they take effect.

use std::collections::BTreeMap;
use std::sync::Mutex;

use delos_types::{ActiveValidator, BftHeights, BftParameters};

pub struct NullBft {
    heights: Mutex<BftHeights>,
    params: Mutex<BTreeMap<u64, BftParameters>>,
}

impl NullBft {
    pub fn new() -> Self {
        Self {
            heights: Mutex::new(BftHeights::default()),
            params: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn set_heights(&self, heights: BftHeights) {
        *self.heights.lock().unwrap() = heights;
    }

    pub fn heights(&self) -> BftHeights {
        *self.heights.lock().unwrap()
    }

    /// Register a parameter set effective from `height`.
    pub fn set_parameters(&self, height: u64, params: BftParameters) {
        self.params.lock().unwrap().insert(height, params);
    }

    /// Whether a parameter set was registered exactly at `height`.
    pub fn exist_parameters(&self, height: u64) -> bool {
        self.params.lock().unwrap().contains_key(&height)
    }

    /// The parameter set in effect at `height`: the latest registered at or below it.
    pub fn parameters(&self, height: u64) -> Option<BftParameters> {
        self.params
            .lock()
            .unwrap()
            .range(..=height)
            .next_back()
            .map(|(_, p)| p.clone())
    }

    pub fn active_validators(&self, height: u64) -> Option<Vec<ActiveValidator>> {
        self.parameters(height).map(|p| p.active_validators())
    }
}

impl Default for NullBft {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(tag: u8) -> BftParameters {
        BftParameters {
            prevote_threshold: 1,
            precommit_threshold: 1,
            certificate_threshold: 1,
            validators: vec![],
            validators_hash: [tag; 32],
        }
    }

    #[test]
    fn parameters_apply_until_replaced() {
        let bft = NullBft::new();
        bft.set_parameters(1, params(1));
        bft.set_parameters(104, params(2));
        assert!(bft.exist_parameters(104));
        assert!(!bft.exist_parameters(103));
        assert_eq!(bft.parameters(103).unwrap().validators_hash, [1; 32]);
        assert_eq!(bft.parameters(200).unwrap().validators_hash, [2; 32]);
        assert!(bft.parameters(0).is_none());
    }
}
