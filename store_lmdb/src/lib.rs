//! LMDB storage backend for the Delos forging core.
//!
//! Implements [`delos_store::GeneratorStore`] using the `heed` LMDB bindings.
//! All generator state lives in one named database inside a single environment.

pub mod environment;
pub mod error;
pub mod generator;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use generator::LmdbGeneratorStore;
