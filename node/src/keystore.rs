//! Generator key material at rest.
//!
//! Keys are either held in plain form or encrypted with a password:
//! 1. Argon2id derives a 32-byte encryption key from the password + random salt
//! 2. AES-256-GCM encrypts the Ed25519 seed followed by the BLS secret key
//! 3. All parameters needed for decryption travel with the ciphertext
//!
//! Keys files are JSON documents listing `{ address, keys }` entries.

use std::fmt;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use delos_crypto::{
    bls_public_from_secret, generate_bls_keypair, generate_keypair, public_from_private,
};
use delos_types::{Address, BlsPublicKey, BlsSecretKey, ForgingKeypair, PrivateKey, PublicKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::KeystoreError;

/// Argon2id parameters: 64 MB memory, 3 iterations, 1 lane of parallelism.
const ARGON2_MEMORY_KIB: u32 = 65536; // 64 MB
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

const SALT_LEN: usize = 32;
/// AES-GCM nonce length in bytes (96 bits).
const NONCE_LEN: usize = 12;

const KEYSTORE_VERSION: u32 = 1;

/// Unencrypted generator keys.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PlainGeneratorKeys {
    #[serde(with = "hex_array")]
    pub generator_key: [u8; 32],
    #[serde(with = "hex_array")]
    pub generator_private_key: [u8; 32],
    #[serde(with = "hex_array")]
    pub bls_key: [u8; 48],
    #[serde(with = "hex_array")]
    pub bls_private_key: [u8; 32],
}

impl PlainGeneratorKeys {
    /// Fresh random Ed25519 and BLS key material.
    pub fn generate() -> Result<Self, KeystoreError> {
        let ed = generate_keypair();
        let (bls_public, bls_secret) =
            generate_bls_keypair().map_err(|e| KeystoreError::InvalidKey(e.to_string()))?;
        Ok(Self {
            generator_key: ed.public.0,
            generator_private_key: ed.private.0,
            bls_key: bls_public.0,
            bls_private_key: bls_secret.0,
        })
    }

    /// Rebuild the public halves from the two secrets.
    pub fn from_secrets(
        generator_private_key: [u8; 32],
        bls_private_key: [u8; 32],
    ) -> Result<Self, KeystoreError> {
        let generator_key = public_from_private(&PrivateKey(generator_private_key));
        let bls_key = bls_public_from_secret(&BlsSecretKey(bls_private_key))
            .map_err(|e| KeystoreError::InvalidKey(e.to_string()))?;
        Ok(Self {
            generator_key: generator_key.0,
            generator_private_key,
            bls_key: bls_key.0,
            bls_private_key,
        })
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&PublicKey(self.generator_key))
    }

    /// Check that the public keys match the secrets and build the in-memory keypair.
    pub fn to_forging_keypair(&self) -> Result<ForgingKeypair, KeystoreError> {
        let public_key = public_from_private(&PrivateKey(self.generator_private_key));
        if public_key.0 != self.generator_key {
            return Err(KeystoreError::InvalidKey(
                "generator key does not match its private key".to_string(),
            ));
        }
        let bls_public_key = bls_public_from_secret(&BlsSecretKey(self.bls_private_key))
            .map_err(|e| KeystoreError::InvalidKey(e.to_string()))?;
        if bls_public_key.0 != self.bls_key {
            return Err(KeystoreError::InvalidKey(
                "BLS key does not match its private key".to_string(),
            ));
        }
        Ok(ForgingKeypair {
            address: Address::from_public_key(&public_key),
            public_key,
            private_key: PrivateKey(self.generator_private_key),
            bls_public_key: BlsPublicKey(self.bls_key),
            bls_secret_key: BlsSecretKey(self.bls_private_key),
        })
    }
}

impl fmt::Debug for PlainGeneratorKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainGeneratorKeys")
            .field("generator_key", &hex::encode(self.generator_key))
            .field("bls_key", &hex::encode(self.bls_key))
            .finish_non_exhaustive()
    }
}

/// Password-protected generator keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeystore {
    pub version: u32,
    pub crypto: KeystoreCrypto,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreCrypto {
    pub cipher: String,
    pub kdf: String,
    pub kdf_params: KdfParams,
    /// Hex-encoded salt.
    pub salt: String,
    /// Hex-encoded nonce.
    pub nonce: String,
    /// Hex-encoded ciphertext.
    pub ciphertext: String,
}

/// KDF parameters for Argon2id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory: ARGON2_MEMORY_KIB,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }
}

/// Keys as persisted under `generator-keys:<address>` and in keys files.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKeys {
    Plain(PlainGeneratorKeys),
    Encrypted(EncryptedKeystore),
}

impl GeneratorKeys {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, GeneratorKeys::Encrypted(_))
    }

    /// Resolve to usable key material. `password` is only consulted for encrypted keys.
    pub fn unlock(&self, password: &str) -> Result<ForgingKeypair, KeystoreError> {
        match self {
            GeneratorKeys::Plain(plain) => plain.to_forging_keypair(),
            GeneratorKeys::Encrypted(keystore) => {
                decrypt_generator_keys(keystore, password)?.to_forging_keypair()
            }
        }
    }
}

/// Encrypt both secrets with the default Argon2id parameters.
pub fn encrypt_generator_keys(
    keys: &PlainGeneratorKeys,
    password: &str,
) -> Result<EncryptedKeystore, KeystoreError> {
    encrypt_generator_keys_with(keys, password, KdfParams::default())
}

pub fn encrypt_generator_keys_with(
    keys: &PlainGeneratorKeys,
    password: &str,
    kdf_params: KdfParams,
) -> Result<EncryptedKeystore, KeystoreError> {
    let mut rng = rand::thread_rng();

    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);

    let derived_key = derive_key(password, &salt, &kdf_params)?;
    let cipher = Aes256Gcm::new_from_slice(&derived_key[..])
        .map_err(|e| KeystoreError::Cipher(format!("AES key init failed: {e}")))?;

    let mut plaintext = Zeroizing::new([0u8; 64]);
    plaintext[..32].copy_from_slice(&keys.generator_private_key);
    plaintext[32..].copy_from_slice(&keys.bls_private_key);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), &plaintext[..])
        .map_err(|e| KeystoreError::Cipher(format!("encryption failed: {e}")))?;

    Ok(EncryptedKeystore {
        version: KEYSTORE_VERSION,
        crypto: KeystoreCrypto {
            cipher: "aes-256-gcm".to_string(),
            kdf: "argon2id".to_string(),
            kdf_params,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
        },
    })
}

/// Decrypt with `password`, re-deriving the public keys from the secrets.
pub fn decrypt_generator_keys(
    keystore: &EncryptedKeystore,
    password: &str,
) -> Result<PlainGeneratorKeys, KeystoreError> {
    if keystore.version != KEYSTORE_VERSION {
        return Err(KeystoreError::InvalidFormat(format!(
            "unsupported keystore version: {}",
            keystore.version
        )));
    }

    let salt = decode_hex_field("salt", &keystore.crypto.salt)?;
    let nonce_bytes = decode_hex_field("nonce", &keystore.crypto.nonce)?;
    let ciphertext = decode_hex_field("ciphertext", &keystore.crypto.ciphertext)?;

    if nonce_bytes.len() != NONCE_LEN {
        return Err(KeystoreError::InvalidFormat(format!(
            "invalid nonce length: expected {NONCE_LEN}, got {}",
            nonce_bytes.len()
        )));
    }

    let derived_key = derive_key(password, &salt, &keystore.crypto.kdf_params)?;
    let cipher = Aes256Gcm::new_from_slice(&derived_key[..])
        .map_err(|e| KeystoreError::Cipher(format!("AES key init failed: {e}")))?;

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| KeystoreError::Decryption)?,
    );

    if plaintext.len() != 64 {
        return Err(KeystoreError::InvalidFormat(format!(
            "decrypted keys have wrong length: expected 64, got {}",
            plaintext.len()
        )));
    }

    let mut generator_private_key = [0u8; 32];
    let mut bls_private_key = [0u8; 32];
    generator_private_key.copy_from_slice(&plaintext[..32]);
    bls_private_key.copy_from_slice(&plaintext[32..]);
    let keys = PlainGeneratorKeys::from_secrets(generator_private_key, bls_private_key);
    generator_private_key.zeroize();
    bls_private_key.zeroize();
    keys
}

/// One entry of a keys file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeysFileEntry {
    pub address: Address,
    pub keys: GeneratorKeys,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KeysFile {
    pub keys: Vec<KeysFileEntry>,
}

pub fn save_keys_file(file: &KeysFile, path: &Path) -> Result<(), KeystoreError> {
    let json = serde_json::to_string_pretty(file)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_keys_file(path: &Path) -> Result<KeysFile, KeystoreError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn derive_key(
    password: &str,
    salt: &[u8],
    kdf_params: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>, KeystoreError> {
    let params = Params::new(
        kdf_params.memory,
        kdf_params.iterations,
        kdf_params.parallelism,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| KeystoreError::Kdf(format!("Argon2 params error: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut output[..])
        .map_err(|e| KeystoreError::Kdf(format!("Argon2 hashing failed: {e}")))?;

    Ok(output)
}

fn decode_hex_field(name: &str, value: &str) -> Result<Vec<u8>, KeystoreError> {
    hex::decode(value).map_err(|e| KeystoreError::InvalidFormat(format!("invalid {name} hex: {e}")))
}

/// Fixed-size byte arrays as hex strings.
mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| serde::de::Error::invalid_length(bytes.len(), &"a fixed-size hex array"))
    }
}
