//! Binary merkle root over ordered leaves.
//!
//! Leaves and branches are domain separated (`0x00` / `0x01` prefix) so a
//! leaf can never be confused with an interior node. An odd node at any
//! level is promoted unchanged.

use crate::hash::{blake2b_256, blake2b_256_multi};

const LEAF_PREFIX: u8 = 0x00;
const BRANCH_PREFIX: u8 = 0x01;

#[inline]
fn hash_leaf(value: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[&[LEAF_PREFIX], value])
}

#[inline]
fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    blake2b_256_multi(&[&[BRANCH_PREFIX], left, right])
}

/// Merkle root of `leaves` in order. The empty tree hashes to `blake2b_256(b"")`.
pub fn merkle_root<T: AsRef<[u8]>>(leaves: &[T]) -> [u8; 32] {
    if leaves.is_empty() {
        return blake2b_256(&[]);
    }
    let mut level: Vec<[u8; 32]> = leaves.iter().map(|l| hash_leaf(l.as_ref())).collect();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [single] => *single,
                _ => unreachable!(),
            })
            .collect();
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_root() {
        let leaves: [&[u8]; 0] = [];
        assert_eq!(merkle_root(&leaves), blake2b_256(b""));
    }

    #[test]
    fn single_leaf_is_prefixed() {
        assert_eq!(merkle_root(&[b"a"]), hash_leaf(b"a"));
        assert_ne!(merkle_root(&[b"a"]), blake2b_256(b"a"));
    }

    #[test]
    fn odd_leaf_promoted() {
        let a = hash_leaf(b"a");
        let b = hash_leaf(b"b");
        let c = hash_leaf(b"c");
        assert_eq!(merkle_root(&[b"a", b"b", b"c"]), hash_pair(&hash_pair(&a, &b), &c));
    }

    #[test]
    fn order_matters() {
        assert_ne!(merkle_root(&[b"a", b"b"]), merkle_root(&[b"b", b"a"]));
    }
}
