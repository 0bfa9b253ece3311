//! Administrative operations on the local forging set.
//!
//! Requests arrive with string addresses from an operator-facing surface;
//! every request is validated before any state changes.

use std::str::FromStr;
use std::sync::Arc;

use delos_store::GeneratorStore;
use delos_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::{EndpointError, KeystoreError};
use crate::generator_store::{
    get_all_generated_info, get_all_generator_keys, get_generated_info, get_generator_keys,
    set_generated_info, set_generator_keys, GeneratedInfo,
};
use crate::keypairs::KeypairTable;
use crate::keystore::{GeneratorKeys, KeysFileEntry};
use crate::metrics::GeneratorMetrics;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub address: String,
    #[serde(default)]
    pub password: String,
    pub enable: bool,
    pub height: u64,
    pub max_height_prevoted: u64,
    pub max_height_generated: u64,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusResponse {
    pub address: Address,
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub address: String,
    pub height: u64,
    pub max_height_prevoted: u64,
    pub max_height_generated: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorStatus {
    pub address: Address,
    pub height: u64,
    pub max_height_prevoted: u64,
    pub max_height_generated: u64,
    pub enabled: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetKeysRequest {
    pub address: String,
    pub keys: GeneratorKeys,
}

pub struct Endpoint {
    store: Arc<dyn GeneratorStore>,
    keypairs: KeypairTable,
    metrics: Arc<GeneratorMetrics>,
}

impl Endpoint {
    pub fn new(
        store: Arc<dyn GeneratorStore>,
        keypairs: KeypairTable,
        metrics: Arc<GeneratorMetrics>,
    ) -> Self {
        Self {
            store,
            keypairs,
            metrics,
        }
    }

    /// Enable or disable forging for an address.
    ///
    /// Enabling unlocks the stored keys and checks the supplied BFT heights
    /// against what this node last generated for the address, so a key moved
    /// between machines cannot sign two blocks for the same height.
    pub async fn update_status(
        &self,
        req: UpdateStatusRequest,
    ) -> Result<UpdateStatusResponse, EndpointError> {
        let address = parse_address(&req.address)?;
        let info = GeneratedInfo {
            height: req.height,
            max_height_prevoted: req.max_height_prevoted,
            max_height_generated: req.max_height_generated,
        };
        validate_heights(&info)?;

        if !req.enable {
            let removed = self.keypairs.remove(&address).await;
            self.refresh_gauge().await;
            tracing::info!(%address, removed, "forging disabled");
            return Ok(UpdateStatusResponse {
                address,
                enabled: false,
            });
        }

        let store = self.store.as_ref();
        let keys = get_generator_keys(store, &address)?
            .ok_or(EndpointError::AddressNotConfigured(address))?;
        let keypair = keys.unlock(&req.password).map_err(|e| match e {
            KeystoreError::Decryption => EndpointError::AuthenticationFailed(address),
            other => EndpointError::Keystore(other),
        })?;
        if keypair.address != address {
            return Err(EndpointError::Keystore(KeystoreError::InvalidKey(format!(
                "keys stored for {address} belong to {}",
                keypair.address
            ))));
        }

        if req.overwrite {
            set_generated_info(store, &address, &info)?;
        } else {
            match get_generated_info(store, &address)? {
                Some(stored) if stored != info => {
                    return Err(EndpointError::InvalidBftHeightState(format!(
                        "request ({}, {}, {}) does not match stored ({}, {}, {})",
                        info.height,
                        info.max_height_prevoted,
                        info.max_height_generated,
                        stored.height,
                        stored.max_height_prevoted,
                        stored.max_height_generated
                    )));
                }
                Some(_) => {}
                None if !info.is_zero() => {
                    return Err(EndpointError::InvalidBftHeightState(
                        "no generated info is stored; heights must all be zero or overwrite must be set"
                            .to_string(),
                    ));
                }
                None => {}
            }
        }

        self.keypairs.insert(keypair).await;
        self.refresh_gauge().await;
        tracing::info!(
            %address,
            height = info.height,
            overwrite = req.overwrite,
            "forging enabled"
        );
        Ok(UpdateStatusResponse {
            address,
            enabled: true,
        })
    }

    /// Overwrite the generated info of an address.
    pub async fn set_status(&self, req: SetStatusRequest) -> Result<(), EndpointError> {
        let address = parse_address(&req.address)?;
        let info = GeneratedInfo {
            height: req.height,
            max_height_prevoted: req.max_height_prevoted,
            max_height_generated: req.max_height_generated,
        };
        validate_heights(&info)?;
        set_generated_info(self.store.as_ref(), &address, &info)?;
        tracing::info!(%address, height = info.height, "generated info set");
        Ok(())
    }

    /// Status of every address with keys or generated info, ordered by address.
    pub async fn get_status(&self) -> Result<Vec<GeneratorStatus>, EndpointError> {
        let store = self.store.as_ref();
        let mut infos: std::collections::BTreeMap<Address, GeneratedInfo> =
            get_all_generated_info(store)?.into_iter().collect();
        for (address, _) in get_all_generator_keys(store)? {
            infos.entry(address).or_default();
        }

        let mut statuses = Vec::with_capacity(infos.len());
        for (address, info) in infos {
            statuses.push(GeneratorStatus {
                address,
                height: info.height,
                max_height_prevoted: info.max_height_prevoted,
                max_height_generated: info.max_height_generated,
                enabled: self.keypairs.contains(&address).await,
            });
        }
        Ok(statuses)
    }

    /// Store keys for an address.
    ///
    /// Plain keys are enabled at once. Encrypted keys replace any enabled
    /// keypair for the address and wait for `update_status`.
    pub async fn set_keys(&self, req: SetKeysRequest) -> Result<(), EndpointError> {
        let address = parse_address(&req.address)?;
        let keypair = match &req.keys {
            GeneratorKeys::Plain(plain) => {
                if plain.address() != address {
                    return Err(EndpointError::Validation(format!(
                        "keys belong to {}, not {address}",
                        plain.address()
                    )));
                }
                Some(plain.to_forging_keypair()?)
            }
            GeneratorKeys::Encrypted(_) => None,
        };

        set_generator_keys(self.store.as_ref(), &address, &req.keys)?;
        match keypair {
            Some(keypair) => {
                self.keypairs.insert(keypair).await;
            }
            None => {
                self.keypairs.remove(&address).await;
            }
        }
        self.refresh_gauge().await;
        tracing::info!(%address, encrypted = req.keys.is_encrypted(), "generator keys set");
        Ok(())
    }

    pub async fn get_all_keys(&self) -> Result<Vec<KeysFileEntry>, EndpointError> {
        Ok(get_all_generator_keys(self.store.as_ref())?
            .into_iter()
            .map(|(address, keys)| KeysFileEntry { address, keys })
            .collect())
    }

    pub async fn has_keys(&self, address: &str) -> Result<bool, EndpointError> {
        let address = parse_address(address)?;
        Ok(get_generator_keys(self.store.as_ref(), &address)?.is_some())
    }

    async fn refresh_gauge(&self) {
        self.metrics.keypairs_enabled.set(self.keypairs.len().await as i64);
    }
}

fn parse_address(s: &str) -> Result<Address, EndpointError> {
    Address::from_str(s)
        .map_err(|e| EndpointError::Validation(format!("invalid address {s:?}: {e}")))
}

fn validate_heights(info: &GeneratedInfo) -> Result<(), EndpointError> {
    if info.max_height_prevoted > info.height || info.max_height_generated > info.height {
        return Err(EndpointError::Validation(format!(
            "max heights ({}, {}) must not exceed height {}",
            info.max_height_prevoted, info.max_height_generated, info.height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::{encrypt_generator_keys_with, KdfParams, PlainGeneratorKeys};
    use delos_nullables::NullGeneratorStore;

    const CHEAP_KDF: KdfParams = KdfParams {
        memory: 1024,
        iterations: 1,
        parallelism: 1,
    };

    fn endpoint() -> (Endpoint, Arc<NullGeneratorStore>, KeypairTable) {
        let store = Arc::new(NullGeneratorStore::new());
        let keypairs = KeypairTable::new();
        let endpoint =
            Endpoint::new(store.clone(), keypairs.clone(), Arc::new(GeneratorMetrics::new()));
        (endpoint, store, keypairs)
    }

    fn enable(
        address: Address,
        password: &str,
        height: u64,
        overwrite: bool,
    ) -> UpdateStatusRequest {
        UpdateStatusRequest {
            address: address.to_hex(),
            password: password.to_string(),
            enable: true,
            height,
            max_height_prevoted: height.saturating_sub(1),
            max_height_generated: height.saturating_sub(2),
            overwrite,
        }
    }

    fn zero_enable(address: Address, password: &str) -> UpdateStatusRequest {
        UpdateStatusRequest {
            max_height_prevoted: 0,
            max_height_generated: 0,
            ..enable(address, password, 0, false)
        }
    }

    async fn store_encrypted(endpoint: &Endpoint, password: &str) -> Address {
        let plain = PlainGeneratorKeys::generate().unwrap();
        let address = plain.address();
        let encrypted = encrypt_generator_keys_with(&plain, password, CHEAP_KDF).unwrap();
        endpoint
            .set_keys(SetKeysRequest {
                address: address.to_hex(),
                keys: GeneratorKeys::Encrypted(encrypted),
            })
            .await
            .unwrap();
        address
    }

    #[tokio::test]
    async fn enable_requires_configured_keys() {
        let (endpoint, _, _) = endpoint();
        let address = Address::new([7; 20]);
        let err = endpoint.update_status(zero_enable(address, "pw")).await.unwrap_err();
        assert!(matches!(err, EndpointError::AddressNotConfigured(a) if a == address));
    }

    #[tokio::test]
    async fn wrong_password_is_authentication_failure() {
        let (endpoint, _, keypairs) = endpoint();
        let address = store_encrypted(&endpoint, "correct").await;
        let err = endpoint.update_status(zero_enable(address, "wrong")).await.unwrap_err();
        assert!(matches!(err, EndpointError::AuthenticationFailed(_)));
        assert!(!keypairs.contains(&address).await);
    }

    #[tokio::test]
    async fn fresh_address_enables_with_zero_heights_only() {
        let (endpoint, _, keypairs) = endpoint();
        let address = store_encrypted(&endpoint, "pw").await;

        let err = endpoint.update_status(enable(address, "pw", 10, false)).await.unwrap_err();
        assert!(matches!(err, EndpointError::InvalidBftHeightState(_)));
        assert!(!keypairs.contains(&address).await);

        let response = endpoint.update_status(zero_enable(address, "pw")).await.unwrap();
        assert!(response.enabled);
        assert!(keypairs.contains(&address).await);
    }

    #[tokio::test]
    async fn stored_info_must_match_unless_overwritten() {
        let (endpoint, store, keypairs) = endpoint();
        let address = store_encrypted(&endpoint, "pw").await;
        set_generated_info(
            store.as_ref(),
            &address,
            &GeneratedInfo {
                height: 50,
                max_height_prevoted: 49,
                max_height_generated: 48,
            },
        )
        .unwrap();

        let err = endpoint.update_status(enable(address, "pw", 40, false)).await.unwrap_err();
        assert!(matches!(err, EndpointError::InvalidBftHeightState(_)));

        endpoint.update_status(enable(address, "pw", 50, false)).await.unwrap();
        assert!(keypairs.contains(&address).await);

        endpoint.update_status(enable(address, "pw", 60, true)).await.unwrap();
        let stored = get_generated_info(store.as_ref(), &address).unwrap().unwrap();
        assert_eq!(stored.height, 60);
    }

    #[tokio::test]
    async fn validation_runs_before_any_change() {
        let (endpoint, store, _) = endpoint();
        let address = store_encrypted(&endpoint, "pw").await;
        let req = UpdateStatusRequest {
            max_height_prevoted: 11,
            ..enable(address, "pw", 10, true)
        };
        let err = endpoint.update_status(req).await.unwrap_err();
        assert!(matches!(err, EndpointError::Validation(_)));
        assert!(get_generated_info(store.as_ref(), &address).unwrap().is_none());

        let err = endpoint
            .set_status(SetStatusRequest {
                address: "not-hex".into(),
                height: 1,
                max_height_prevoted: 0,
                max_height_generated: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointError::Validation(_)));
    }

    #[tokio::test]
    async fn disable_removes_keypair() {
        let (endpoint, _, keypairs) = endpoint();
        let address = store_encrypted(&endpoint, "pw").await;
        endpoint.update_status(zero_enable(address, "pw")).await.unwrap();

        let response = endpoint
            .update_status(UpdateStatusRequest {
                enable: false,
                ..zero_enable(address, "")
            })
            .await
            .unwrap();
        assert!(!response.enabled);
        assert!(!keypairs.contains(&address).await);
    }

    #[tokio::test]
    async fn plain_keys_are_enabled_immediately() {
        let (endpoint, _, keypairs) = endpoint();
        let plain = PlainGeneratorKeys::generate().unwrap();
        let address = plain.address();
        endpoint
            .set_keys(SetKeysRequest {
                address: address.to_hex(),
                keys: GeneratorKeys::Plain(plain),
            })
            .await
            .unwrap();

        assert!(keypairs.contains(&address).await);
        assert!(endpoint.has_keys(&address.to_hex()).await.unwrap());
        assert_eq!(endpoint.get_all_keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn plain_keys_for_another_address_are_rejected() {
        let (endpoint, _, _) = endpoint();
        let plain = PlainGeneratorKeys::generate().unwrap();
        let err = endpoint
            .set_keys(SetKeysRequest {
                address: Address::new([1; 20]).to_hex(),
                keys: GeneratorKeys::Plain(plain),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EndpointError::Validation(_)));
        assert!(endpoint.get_all_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_lists_keys_and_info() {
        let (endpoint, _, _) = endpoint();
        let address = store_encrypted(&endpoint, "pw").await;
        let other = Address::new([3; 20]);
        endpoint
            .set_status(SetStatusRequest {
                address: other.to_hex(),
                height: 9,
                max_height_prevoted: 8,
                max_height_generated: 7,
            })
            .await
            .unwrap();

        let statuses = endpoint.get_status().await.unwrap();
        assert_eq!(statuses.len(), 2);
        let mine = statuses.iter().find(|s| s.address == address).unwrap();
        assert_eq!((mine.height, mine.enabled), (0, false));
        let theirs = statuses.iter().find(|s| s.address == other).unwrap();
        assert_eq!(theirs.height, 9);
    }
}
