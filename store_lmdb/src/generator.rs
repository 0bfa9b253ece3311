//! LMDB implementation of GeneratorStore.

use heed::types::Bytes;
use heed::{Database, Env};

use delos_store::{GeneratorStore, StoreError};

use crate::LmdbError;

#[derive(Clone)]
pub struct LmdbGeneratorStore {
    pub(crate) env: Env,
    pub(crate) db: Database<Bytes, Bytes>,
}

impl GeneratorStore for LmdbGeneratorStore {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(val.map(|v| v.to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn iter_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self
            .db
            .prefix_iter(&rtxn, prefix.as_bytes())
            .map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for entry in iter {
            let (k, v) = entry.map_err(LmdbError::from)?;
            let key = std::str::from_utf8(k)
                .map_err(|e| LmdbError::Corruption(format!("non-utf8 key: {e}")))?
                .to_string();
            out.push((key, v.to_vec()));
        }
        Ok(out)
    }
}
