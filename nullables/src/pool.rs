//! Nullable transaction pool: insertion-ordered, no admission policy.

use std::collections::BTreeMap;
use std::sync::Mutex;

use delos_types::{Address, Transaction, TxId};

struct PoolState {
    next_seq: u64,
    by_id: BTreeMap<TxId, (u64, Transaction)>,
}

pub struct NullTransactionPool {
    state: Mutex<PoolState>,
}

impl NullTransactionPool {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PoolState {
                next_seq: 0,
                by_id: BTreeMap::new(),
            }),
        }
    }

    /// Add a transaction. Returns `false` if it was already pooled or cannot be hashed.
    pub fn add(&self, tx: Transaction) -> bool {
        let Ok(id) = tx.id() else { return false };
        let mut state = self.state.lock().unwrap();
        if state.by_id.contains_key(&id) {
            return false;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.by_id.insert(id, (seq, tx));
        true
    }

    pub fn remove(&self, id: &TxId) -> bool {
        self.state.lock().unwrap().by_id.remove(id).is_some()
    }

    pub fn contains(&self, id: &TxId) -> bool {
        self.state.lock().unwrap().by_id.contains_key(id)
    }

    pub fn get(&self, id: &TxId) -> Option<Transaction> {
        self.state.lock().unwrap().by_id.get(id).map(|(_, tx)| tx.clone())
    }

    /// All transactions in insertion order.
    pub fn all(&self) -> Vec<Transaction> {
        let state = self.state.lock().unwrap();
        let mut entries: Vec<&(u64, Transaction)> = state.by_id.values().collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, tx)| tx.clone()).collect()
    }

    /// Transactions grouped by sender, each group in ascending nonce order.
    pub fn processable(&self) -> BTreeMap<Address, Vec<Transaction>> {
        let mut out: BTreeMap<Address, Vec<Transaction>> = BTreeMap::new();
        for tx in self.all() {
            out.entry(tx.sender_address()).or_default().push(tx);
        }
        for txs in out.values_mut() {
            txs.sort_by_key(|tx| tx.nonce);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NullTransactionPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delos_types::PublicKey;

    fn tx(sender: u8, nonce: u64) -> Transaction {
        Transaction {
            module: "token".into(),
            command: "transfer".into(),
            nonce,
            fee: 100,
            sender_public_key: PublicKey([sender; 32]),
            params: vec![],
            signatures: vec![],
        }
    }

    #[test]
    fn groups_by_sender_in_nonce_order() {
        let pool = NullTransactionPool::new();
        assert!(pool.add(tx(1, 2)));
        assert!(pool.add(tx(1, 0)));
        assert!(pool.add(tx(2, 0)));
        assert!(!pool.add(tx(2, 0)));
        let groups = pool.processable();
        assert_eq!(groups.len(), 2);
        let sender1 = tx(1, 0).sender_address();
        let nonces: Vec<u64> = groups[&sender1].iter().map(|t| t.nonce).collect();
        assert_eq!(nonces, vec![0, 2]);
    }

    #[test]
    fn remove_by_id() {
        let pool = NullTransactionPool::new();
        let t = tx(3, 0);
        let id = t.id().unwrap();
        pool.add(t);
        assert!(pool.contains(&id));
        assert!(pool.remove(&id));
        assert!(!pool.contains(&id));
        assert!(pool.is_empty());
    }
}
