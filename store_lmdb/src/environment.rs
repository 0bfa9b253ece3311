//! LMDB environment setup.

use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::generator::LmdbGeneratorStore;
use crate::LmdbError;

const GENERATOR_DB: &str = "generator";

/// Default map size: generator state is tiny, 64 MiB is ample.
pub const DEFAULT_MAP_SIZE: usize = 64 * 1024 * 1024;

/// Wraps the LMDB environment and its database handles.
pub struct LmdbEnvironment {
    env: Env,
    generator_db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process for this path
        // and never opened twice concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };
        let mut wtxn = env.write_txn()?;
        let generator_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(GENERATOR_DB))?;
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(Self {
            env,
            generator_db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store handle for generator keys and bookkeeping.
    pub fn generator_store(&self) -> LmdbGeneratorStore {
        LmdbGeneratorStore {
            env: self.env.clone(),
            db: self.generator_db,
        }
    }
}
