//! Deterministic commitment over the committed key-value store.
//!
//! The app hash returned from `commit()` is a binary BLAKE3 Merkle root over
//! all (key, value) pairs in ascending key order. The same set of entries
//! always produces the same root regardless of how it was built.

use crate::crypto::hash_blake3;
use crate::types::{Hash, ZERO_HASH};

/// Domain separator for leaf nodes.
const LEAF_PREFIX: u8 = 0x00;
/// Domain separator for internal nodes.
const INTERNAL_PREFIX: u8 = 0x01;

/// Compute the Merkle root of entries that are already sorted by key.
///
/// Empty input returns `ZERO_HASH`; a single entry returns its leaf hash.
pub fn state_root<'a, I>(sorted_entries: I) -> Hash
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let leaves: Vec<Hash> = sorted_entries
        .into_iter()
        .map(|(k, v)| hash_leaf(k, v))
        .collect();
    root_from_leaves(leaves)
}

/// H(LEAF_PREFIX || key_len_le32 || key || value)
fn hash_leaf(key: &[u8], value: &[u8]) -> Hash {
    let mut data = Vec::with_capacity(1 + 4 + key.len() + value.len());
    data.push(LEAF_PREFIX);
    data.extend_from_slice(&(key.len() as u32).to_le_bytes());
    data.extend_from_slice(key);
    data.extend_from_slice(value);
    hash_blake3(&data)
}

/// H(INTERNAL_PREFIX || left || right)
fn hash_internal(left: &Hash, right: &Hash) -> Hash {
    let mut data = [0u8; 1 + 32 + 32];
    data[0] = INTERNAL_PREFIX;
    data[1..33].copy_from_slice(left);
    data[33..65].copy_from_slice(right);
    hash_blake3(&data)
}

/// Pair and hash level by level; an odd trailing node is promoted as-is.
fn root_from_leaves(mut level: Vec<Hash>) -> Hash {
    if level.is_empty() {
        return ZERO_HASH;
    }
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_internal(left, right),
                [single] => *single,
                _ => unreachable!("chunks(2) yields one or two elements"),
            })
            .collect();
    }
    level[0]
}
