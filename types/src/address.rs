//! 20-byte validator and account addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::hash::blake2b_256;
use crate::keys::PublicKey;
use crate::DelosError;

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// A 20-byte address, derived from the first 20 bytes of the Blake2b-256
/// digest of an Ed25519 public key.
///
/// `Ord` compares raw bytes lexicographically. Snapshot tie-breaking relies on
/// this ordering, so it must never change.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);

    pub fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derive the address belonging to an Ed25519 public key.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = blake2b_256(public_key.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[..ADDRESS_LENGTH]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase hex form, used for store keys and logs.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = DelosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s).map_err(|e| DelosError::InvalidAddress(format!("{s}: {e}")))?;
        let bytes: [u8; ADDRESS_LENGTH] = raw.try_into().map_err(|v: Vec<u8>| {
            DelosError::InvalidAddress(format!("expected {ADDRESS_LENGTH} bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}
