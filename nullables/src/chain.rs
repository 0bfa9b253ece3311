//! Nullable chain: headers by height and a finalized-height marker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use delos_types::BlockHeader;

pub struct NullChain {
    headers: Mutex<BTreeMap<u64, BlockHeader>>,
    finalized_height: AtomicU64,
}

impl NullChain {
    pub fn new() -> Self {
        Self {
            headers: Mutex::new(BTreeMap::new()),
            finalized_height: AtomicU64::new(0),
        }
    }

    pub fn add_header(&self, header: BlockHeader) {
        self.headers.lock().unwrap().insert(header.height, header);
    }

    pub fn header_by_height(&self, height: u64) -> Option<BlockHeader> {
        self.headers.lock().unwrap().get(&height).cloned()
    }

    /// Highest stored header.
    pub fn last_header(&self) -> Option<BlockHeader> {
        self.headers.lock().unwrap().values().next_back().cloned()
    }

    pub fn set_finalized_height(&self, height: u64) {
        self.finalized_height.store(height, Ordering::SeqCst);
    }

    pub fn finalized_height(&self) -> u64 {
        self.finalized_height.load(Ordering::SeqCst)
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}
