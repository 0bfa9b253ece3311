//! Typed access to the generator namespaces of a [`GeneratorStore`].

use std::str::FromStr;

use delos_store::{GeneratorStore, StoreError};
use delos_types::Address;
use serde::{Deserialize, Serialize};

use crate::keystore::GeneratorKeys;

pub const GENERATOR_KEYS_PREFIX: &str = "generator-keys:";
pub const GENERATED_INFO_PREFIX: &str = "generator-info:";

/// What an address last generated. Guards against double forging after a
/// restart or a key move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedInfo {
    pub height: u64,
    pub max_height_prevoted: u64,
    pub max_height_generated: u64,
}

impl GeneratedInfo {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

fn keys_key(address: &Address) -> String {
    format!("{GENERATOR_KEYS_PREFIX}{}", address.to_hex())
}

fn info_key(address: &Address) -> String {
    format!("{GENERATED_INFO_PREFIX}{}", address.to_hex())
}

fn parse_address(key: &str, prefix: &str) -> Result<Address, StoreError> {
    let hex = key.strip_prefix(prefix).unwrap_or(key);
    Address::from_str(hex).map_err(|e| StoreError::Corruption(format!("bad key {key}: {e}")))
}

pub fn get_generator_keys(
    store: &dyn GeneratorStore,
    address: &Address,
) -> Result<Option<GeneratorKeys>, StoreError> {
    store
        .get(&keys_key(address))?
        .map(|bytes| {
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
}

pub fn set_generator_keys(
    store: &dyn GeneratorStore,
    address: &Address,
    keys: &GeneratorKeys,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(keys).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.put(&keys_key(address), &bytes)
}

pub fn get_all_generator_keys(
    store: &dyn GeneratorStore,
) -> Result<Vec<(Address, GeneratorKeys)>, StoreError> {
    store
        .iter_prefix(GENERATOR_KEYS_PREFIX)?
        .into_iter()
        .map(|(key, bytes)| {
            let address = parse_address(&key, GENERATOR_KEYS_PREFIX)?;
            let keys = serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            Ok((address, keys))
        })
        .collect()
}

pub fn get_generated_info(
    store: &dyn GeneratorStore,
    address: &Address,
) -> Result<Option<GeneratedInfo>, StoreError> {
    store
        .get(&info_key(address))?
        .map(|bytes| {
            bincode::deserialize(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
}

pub fn set_generated_info(
    store: &dyn GeneratorStore,
    address: &Address,
    info: &GeneratedInfo,
) -> Result<(), StoreError> {
    let bytes = bincode::serialize(info).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.put(&info_key(address), &bytes)
}

pub fn get_all_generated_info(
    store: &dyn GeneratorStore,
) -> Result<Vec<(Address, GeneratedInfo)>, StoreError> {
    store
        .iter_prefix(GENERATED_INFO_PREFIX)?
        .into_iter()
        .map(|(key, bytes)| {
            let address = parse_address(&key, GENERATED_INFO_PREFIX)?;
            let info = bincode::deserialize(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            Ok((address, info))
        })
        .collect()
}
