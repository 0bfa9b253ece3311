//! Blake2b and SHA-256 hashing.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use delos_types::TxId;
use sha2::Sha256;

type Blake2b256 = Blake2b<U32>;

pub use delos_types::blake2b_256;

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256, used for the seed chains of forger-list construction.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash a serialized transaction to produce its `TxId`.
pub fn hash_transaction(tx_bytes: &[u8]) -> TxId {
    TxId::new(blake2b_256(tx_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_deterministic() {
        assert_eq!(blake2b_256(b"delos"), blake2b_256(b"delos"));
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn sha256_known_vector() {
        let h = sha256(b"abc");
        assert_eq!(
            h[..4],
            [0xba, 0x78, 0x16, 0xbf],
            "sha256(\"abc\") starts with ba7816bf"
        );
    }

    #[test]
    fn hash_transaction_returns_txid() {
        assert!(!hash_transaction(b"test tx data").is_zero());
    }
}
