//! The in-memory table of keypairs this node forges for.

use std::collections::HashMap;
use std::sync::Arc;

use delos_types::{Address, ForgingKeypair};
use tokio::sync::RwLock;

/// Shared, mutex-guarded map from validator address to its key material.
///
/// Cloning is cheap and every clone sees the same table; the generation
/// loop, the single-commit handler and the administrative endpoint each hold
/// one.
#[derive(Clone, Default)]
pub struct KeypairTable {
    inner: Arc<RwLock<HashMap<Address, Arc<ForgingKeypair>>>>,
}

impl KeypairTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the keypair for its address.
    pub async fn insert(&self, keypair: ForgingKeypair) {
        let address = keypair.address;
        self.inner.write().await.insert(address, Arc::new(keypair));
    }

    pub async fn remove(&self, address: &Address) -> bool {
        self.inner.write().await.remove(address).is_some()
    }

    pub async fn get(&self, address: &Address) -> Option<Arc<ForgingKeypair>> {
        self.inner.read().await.get(address).cloned()
    }

    pub async fn contains(&self, address: &Address) -> bool {
        self.inner.read().await.contains_key(address)
    }

    /// Addresses in ascending byte order.
    pub async fn addresses(&self) -> Vec<Address> {
        let mut out: Vec<Address> = self.inner.read().await.keys().copied().collect();
        out.sort();
        out
    }

    /// All keypairs, ordered by address.
    pub async fn snapshot(&self) -> Vec<Arc<ForgingKeypair>> {
        let mut out: Vec<Arc<ForgingKeypair>> = self.inner.read().await.values().cloned().collect();
        out.sort_by_key(|kp| kp.address);
        out
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
