//! Cryptographic primitives for the Delos forging core.
//!
//! - **Ed25519** for block and transaction signatures
//! - **BLS12-381** (min-pk) key material for BFT single commits
//! - **Blake2b** for identifiers and merkle roots
//! - **SHA-256** for the seed chains that drive forger-list sampling

pub mod bls;
pub mod error;
pub mod hash;
pub mod keys;
pub mod merkle;
pub mod sign;

pub use bls::{
    bls_keypair_from_seed, bls_public_from_secret, bls_sign, bls_verify, generate_bls_keypair,
};
pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi, hash_transaction, sha256};
pub use keys::{generate_keypair, keypair_from_seed, public_from_private, KeyPair};
pub use merkle::merkle_root;
pub use sign::{sign_message, verify_signature};
