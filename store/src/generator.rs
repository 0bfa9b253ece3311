//! Key/value storage for generator state.

use crate::StoreError;

/// Opaque blobs under string keys.
///
/// Keys are namespaced by the caller (`generator-keys:<address>`,
/// `generator-info:<address>`); the store only needs prefix iteration to
/// enumerate a namespace.
pub trait GeneratorStore: Send + Sync {
    /// Store a value, replacing any previous one.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Retrieve a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete a value. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All entries whose key starts with `prefix`, in key order.
    fn iter_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }
}
