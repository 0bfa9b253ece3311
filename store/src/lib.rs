//! Abstract storage traits for the Delos forging core.
//!
//! The forging core persists only small opaque blobs (generator keys and
//! previously-generated bookkeeping). Backends (LMDB, in-memory for
//! testing) implement [`GeneratorStore`]; the rest of the codebase depends
//! only on the trait.

pub mod error;
pub mod generator;

pub use error::StoreError;
pub use generator::GeneratorStore;
