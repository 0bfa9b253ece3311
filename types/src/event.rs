//! Events emitted while executing a block.

use serde::{Deserialize, Serialize};

use crate::DelosError;

/// A single state-machine event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub module: String,
    pub name: String,
    pub data: Vec<u8>,
    pub topics: Vec<Vec<u8>>,
    pub height: u64,
    pub index: u32,
}

impl Event {
    pub fn encode(&self) -> Result<Vec<u8>, DelosError> {
        Ok(bincode::serialize(self)?)
    }
}
