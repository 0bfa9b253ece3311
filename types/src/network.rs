//! Chain identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DelosError;

/// Identifies which chain a node belongs to. Mixed into every signed header
/// so that signatures cannot be replayed across chains.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChainId(pub [u8; 4]);

impl ChainId {
    pub const MAINNET: Self = Self([0x00, 0x00, 0x00, 0x00]);
    pub const DEVNET: Self = Self([0x04, 0x00, 0x00, 0x00]);

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", hex::encode(self.0))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ChainId {
    type Err = DelosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s).map_err(|e| DelosError::InvalidChainId(format!("{s}: {e}")))?;
        let bytes: [u8; 4] = raw
            .try_into()
            .map_err(|_| DelosError::InvalidChainId(format!("{s}: expected 4 bytes")))?;
        Ok(Self(bytes))
    }
}
