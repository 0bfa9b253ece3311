//! Transactions as seen by the forging core.
//!
//! The core never interprets `params`; it only needs ids, sizes, fees,
//! nonces and the sender to order and budget transactions.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::hash::{blake2b_256, TxId};
use crate::keys::{PublicKey, Signature};
use crate::network::ChainId;
use crate::DelosError;

/// Domain tag mixed into transaction signing bytes.
pub const TRANSACTION_TAG: &[u8] = b"DELOS_TX_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub module: String,
    pub command: String,
    pub nonce: u64,
    pub fee: u64,
    pub sender_public_key: PublicKey,
    pub params: Vec<u8>,
    pub signatures: Vec<Signature>,
}

impl Transaction {
    /// Canonical encoding, signatures included.
    pub fn encode(&self) -> Result<Vec<u8>, DelosError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DelosError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Blake2b-256 of the canonical encoding.
    pub fn id(&self) -> Result<TxId, DelosError> {
        Ok(TxId::new(blake2b_256(&self.encode()?)))
    }

    /// Encoded size in bytes; this is what block budgets are charged.
    pub fn size(&self) -> Result<u64, DelosError> {
        Ok(bincode::serialized_size(self)?)
    }

    pub fn sender_address(&self) -> Address {
        Address::from_public_key(&self.sender_public_key)
    }

    /// Bytes covered by the sender's signature.
    pub fn signing_bytes(&self, chain_id: &ChainId) -> Result<Vec<u8>, DelosError> {
        let unsigned = (
            &self.module,
            &self.command,
            self.nonce,
            self.fee,
            &self.sender_public_key,
            &self.params,
        );
        let mut out = Vec::with_capacity(TRANSACTION_TAG.len() + 4 + 128);
        out.extend_from_slice(TRANSACTION_TAG);
        out.extend_from_slice(chain_id.as_bytes());
        out.extend_from_slice(&bincode::serialize(&unsigned)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            module: "token".into(),
            command: "transfer".into(),
            nonce: 3,
            fee: 1_000,
            sender_public_key: PublicKey([7; 32]),
            params: vec![1, 2, 3],
            signatures: vec![Signature([9; 64])],
        }
    }

    #[test]
    fn id_changes_with_nonce() {
        let a = sample();
        let mut b = sample();
        b.nonce += 1;
        assert_ne!(a.id().unwrap(), b.id().unwrap());
    }

    #[test]
    fn size_matches_encoding() {
        let tx = sample();
        assert_eq!(tx.size().unwrap() as usize, tx.encode().unwrap().len());
        assert_eq!(Transaction::decode(&tx.encode().unwrap()).unwrap(), tx);
    }

    #[test]
    fn signing_bytes_exclude_signatures() {
        let a = sample();
        let mut b = sample();
        b.signatures.clear();
        assert_eq!(
            a.signing_bytes(&ChainId::DEVNET).unwrap(),
            b.signing_bytes(&ChainId::DEVNET).unwrap()
        );
        assert_ne!(
            a.signing_bytes(&ChainId::DEVNET).unwrap(),
            a.signing_bytes(&ChainId::MAINNET).unwrap()
        );
    }
}
