//! BLS12-381 key material (min-pk: 48-byte public keys, 96-byte signatures).
//!
//! The forging core only holds BLS keys and hands them to the consensus
//! layer, which produces the actual single-commit signatures. Signing and
//! verification are exposed for key-ownership checks and tests.

use blst::min_pk;
use delos_types::{BlsPublicKey, BlsSecretKey};
use rand::RngCore;

use crate::CryptoError;

/// Proof-of-possession ciphersuite tag.
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Derive a BLS key pair from 32 bytes of input keying material.
pub fn bls_keypair_from_seed(ikm: &[u8; 32]) -> Result<(BlsPublicKey, BlsSecretKey), CryptoError> {
    let sk = min_pk::SecretKey::key_gen(ikm, &[])
        .map_err(|e| CryptoError::BlsKeyGen(format!("{e:?}")))?;
    Ok((BlsPublicKey(sk.sk_to_pk().to_bytes()), BlsSecretKey(sk.to_bytes())))
}

/// Generate a fresh BLS key pair from the OS random source.
pub fn generate_bls_keypair() -> Result<(BlsPublicKey, BlsSecretKey), CryptoError> {
    let mut ikm = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut ikm);
    bls_keypair_from_seed(&ikm)
}

fn secret_key(secret: &BlsSecretKey) -> Result<min_pk::SecretKey, CryptoError> {
    min_pk::SecretKey::from_bytes(&secret.0)
        .map_err(|e| CryptoError::InvalidBlsKey(format!("{e:?}")))
}

/// Recompute the public key belonging to `secret`.
pub fn bls_public_from_secret(secret: &BlsSecretKey) -> Result<BlsPublicKey, CryptoError> {
    Ok(BlsPublicKey(secret_key(secret)?.sk_to_pk().to_bytes()))
}

pub fn bls_sign(message: &[u8], secret: &BlsSecretKey) -> Result<[u8; 96], CryptoError> {
    Ok(secret_key(secret)?.sign(message, BLS_DST, &[]).to_bytes())
}

pub fn bls_verify(message: &[u8], signature: &[u8; 96], public: &BlsPublicKey) -> bool {
    let Ok(pk) = min_pk::PublicKey::from_bytes(&public.0) else {
        return false;
    };
    let Ok(sig) = min_pk::Signature::from_bytes(signature) else {
        return false;
    };
    sig.verify(true, message, BLS_DST, &[], &pk, true) == blst::BLST_ERROR::BLST_SUCCESS
}
