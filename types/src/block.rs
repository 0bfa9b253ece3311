//! Block header, assets and the assembled block.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::hash::{blake2b_256, BlockId};
use crate::keys::Signature;
use crate::network::ChainId;
use crate::time::Timestamp;
use crate::transaction::Transaction;
use crate::DelosError;

pub const BLOCK_HEADER_VERSION: u32 = 2;

/// Domain tag mixed into header signing bytes.
pub const BLOCK_HEADER_TAG: &[u8] = b"DELOS_BH_";

/// Aggregated BFT certificate carried by a header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCommit {
    pub height: u64,
    pub aggregation_bits: Vec<u8>,
    pub certificate_signature: Vec<u8>,
}

/// Module-provided data attached to a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAsset {
    pub module: String,
    pub data: Vec<u8>,
}

impl BlockAsset {
    pub fn encode(&self) -> Result<Vec<u8>, DelosError> {
        Ok(bincode::serialize(self)?)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub timestamp: Timestamp,
    pub height: u64,
    pub previous_block_id: BlockId,
    pub generator_address: Address,
    pub transaction_root: [u8; 32],
    pub asset_root: [u8; 32],
    pub event_root: [u8; 32],
    pub state_root: [u8; 32],
    pub max_height_prevoted: u64,
    pub max_height_generated: u64,
    pub implies_max_prevotes: bool,
    pub validators_hash: [u8; 32],
    pub aggregate_commit: AggregateCommit,
    pub signature: Signature,
}

impl BlockHeader {
    /// Bytes covered by the generator's signature: every field except `signature`.
    pub fn signing_bytes(&self, chain_id: &ChainId) -> Result<Vec<u8>, DelosError> {
        let unsigned = (
            self.version,
            self.timestamp,
            self.height,
            &self.previous_block_id,
            &self.generator_address,
            &self.transaction_root,
            &self.asset_root,
            &self.event_root,
            &self.state_root,
            self.max_height_prevoted,
            self.max_height_generated,
            self.implies_max_prevotes,
            &self.validators_hash,
            &self.aggregate_commit,
        );
        let mut out = Vec::with_capacity(BLOCK_HEADER_TAG.len() + 4 + 320);
        out.extend_from_slice(BLOCK_HEADER_TAG);
        out.extend_from_slice(chain_id.as_bytes());
        out.extend_from_slice(&bincode::serialize(&unsigned)?);
        Ok(out)
    }

    pub fn encode(&self) -> Result<Vec<u8>, DelosError> {
        Ok(bincode::serialize(self)?)
    }

    /// Blake2b-256 of the signed header encoding.
    pub fn id(&self) -> Result<BlockId, DelosError> {
        Ok(BlockId::new(blake2b_256(&self.encode()?)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub assets: Vec<BlockAsset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> BlockHeader {
        BlockHeader {
            version: BLOCK_HEADER_VERSION,
            timestamp: Timestamp::new(1_700_000_000),
            height: 42,
            previous_block_id: BlockId::new([1; 32]),
            generator_address: Address::new([2; 20]),
            transaction_root: [3; 32],
            asset_root: [4; 32],
            event_root: [5; 32],
            state_root: [6; 32],
            max_height_prevoted: 40,
            max_height_generated: 30,
            implies_max_prevotes: true,
            validators_hash: [7; 32],
            aggregate_commit: AggregateCommit::default(),
            signature: Signature::EMPTY,
        }
    }

    #[test]
    fn signing_bytes_ignore_signature() {
        let unsigned = header();
        let mut signed = header();
        signed.signature = Signature([8; 64]);
        let chain = ChainId::DEVNET;
        assert_eq!(
            unsigned.signing_bytes(&chain).unwrap(),
            signed.signing_bytes(&chain).unwrap()
        );
        assert!(unsigned
            .signing_bytes(&chain)
            .unwrap()
            .starts_with(BLOCK_HEADER_TAG));
    }

    #[test]
    fn id_covers_signature() {
        let unsigned = header();
        let mut signed = header();
        signed.signature = Signature([8; 64]);
        assert_ne!(unsigned.id().unwrap(), signed.id().unwrap());
    }
}
