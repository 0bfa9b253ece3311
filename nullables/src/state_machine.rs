//! Nullable state machine: scripted verification and execution outcomes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use delos_types::{BlockAsset, TxId};

/// What the state machine does with a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Ok,
    /// Verification rejects the transaction.
    Invalid,
    /// Executes, but the command fails (fee is still charged).
    Fail,
    /// The execution call itself errors.
    Error,
}

pub struct NullStateMachine {
    invalid: Mutex<HashSet<TxId>>,
    failing: Mutex<HashSet<TxId>>,
    erroring: Mutex<HashSet<TxId>>,
    executed: Mutex<Vec<TxId>>,
    assets: Mutex<Vec<BlockAsset>>,
    state_root: Mutex<[u8; 32]>,
    next_context: AtomicU64,
    clears: AtomicUsize,
    fail_commit: Mutex<bool>,
}

impl NullStateMachine {
    pub fn new() -> Self {
        Self {
            invalid: Mutex::new(HashSet::new()),
            failing: Mutex::new(HashSet::new()),
            erroring: Mutex::new(HashSet::new()),
            executed: Mutex::new(Vec::new()),
            assets: Mutex::new(Vec::new()),
            state_root: Mutex::new([0xAA; 32]),
            next_context: AtomicU64::new(1),
            clears: AtomicUsize::new(0),
            fail_commit: Mutex::new(false),
        }
    }

    pub fn script(&self, id: TxId, outcome: ScriptedOutcome) {
        self.invalid.lock().unwrap().remove(&id);
        self.failing.lock().unwrap().remove(&id);
        self.erroring.lock().unwrap().remove(&id);
        match outcome {
            ScriptedOutcome::Ok => {}
            ScriptedOutcome::Invalid => {
                self.invalid.lock().unwrap().insert(id);
            }
            ScriptedOutcome::Fail => {
                self.failing.lock().unwrap().insert(id);
            }
            ScriptedOutcome::Error => {
                self.erroring.lock().unwrap().insert(id);
            }
        }
    }

    pub fn outcome(&self, id: &TxId) -> ScriptedOutcome {
        if self.invalid.lock().unwrap().contains(id) {
            ScriptedOutcome::Invalid
        } else if self.failing.lock().unwrap().contains(id) {
            ScriptedOutcome::Fail
        } else if self.erroring.lock().unwrap().contains(id) {
            ScriptedOutcome::Error
        } else {
            ScriptedOutcome::Ok
        }
    }

    /// Fresh 32-byte context id.
    pub fn open_context(&self) -> [u8; 32] {
        let n = self.next_context.fetch_add(1, Ordering::SeqCst);
        let mut ctx = [0u8; 32];
        ctx[..8].copy_from_slice(&n.to_be_bytes());
        ctx
    }

    pub fn record_executed(&self, id: TxId) {
        self.executed.lock().unwrap().push(id);
    }

    pub fn executed(&self) -> Vec<TxId> {
        self.executed.lock().unwrap().clone()
    }

    pub fn set_assets(&self, assets: Vec<BlockAsset>) {
        *self.assets.lock().unwrap() = assets;
    }

    pub fn assets(&self) -> Vec<BlockAsset> {
        self.assets.lock().unwrap().clone()
    }

    pub fn set_state_root(&self, root: [u8; 32]) {
        *self.state_root.lock().unwrap() = root;
    }

    pub fn set_fail_commit(&self, fail: bool) {
        *self.fail_commit.lock().unwrap() = fail;
    }

    pub fn commit(&self) -> Result<[u8; 32], String> {
        if *self.fail_commit.lock().unwrap() {
            return Err("commit failed".to_string());
        }
        Ok(*self.state_root.lock().unwrap())
    }

    pub fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of times the execution context was cleared.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl Default for NullStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
