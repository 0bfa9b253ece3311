//! Gossip payloads exchanged by the forging core.
//!
//! Payloads are bincode-encoded and carried by the network collaborator
//! under the event and procedure names below.

use delos_types::{DelosError, TxId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Event carrying a batch of freshly seen transaction ids.
pub const EVENT_POST_TRANSACTIONS_ANNOUNCEMENT: &str = "postTransactionsAnnouncement";
/// RPC returning full transactions for a list of ids.
pub const RPC_GET_TRANSACTIONS: &str = "getTransactions";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionsAnnouncement {
    pub transaction_ids: Vec<TxId>,
}

/// An empty id list asks for every processable transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTransactionsRequest {
    pub transaction_ids: Vec<TxId>,
}

/// Encoded transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTransactionsResponse {
    pub transactions: Vec<Vec<u8>>,
}

pub trait WirePayload: Serialize + DeserializeOwned {
    fn encode(&self) -> Result<Vec<u8>, DelosError> {
        Ok(bincode::serialize(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DelosError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl WirePayload for TransactionsAnnouncement {}
impl WirePayload for GetTransactionsRequest {}
impl WirePayload for GetTransactionsResponse {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_announcement_is_rejected() {
        let announcement = TransactionsAnnouncement {
            transaction_ids: vec![TxId::new([1; 32]), TxId::new([2; 32])],
        };
        let mut bytes = announcement.encode().unwrap();
        assert_eq!(TransactionsAnnouncement::decode(&bytes).unwrap(), announcement);
        bytes.truncate(bytes.len() - 1);
        assert!(TransactionsAnnouncement::decode(&bytes).is_err());
    }

    #[test]
    fn empty_request_encodes_compactly() {
        let bytes = GetTransactionsRequest::default().encode().unwrap();
        // bincode: u64 length prefix only.
        assert_eq!(bytes, vec![0u8; 8]);
    }
}
