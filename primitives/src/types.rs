//! Core identifiers and constants for the keel ledger.
//!
//! Addresses and public keys are fixed-size byte arrays wrapped in newtypes
//! so they cannot be confused with one another. Both render as lowercase hex
//! in JSON and in `Display`.

use core::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::hash_sha256;

/// 32-byte hash used for state roots.
pub type Hash = [u8; 32];

/// Block height (monotonically increasing, genesis is 0).
pub type BlockHeight = u64;

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Length of an Ed25519 public key in bytes.
pub const PUB_KEY_LEN: usize = 32;

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// A zero-valued hash (32 zero bytes).
pub const ZERO_HASH: Hash = [0u8; 32];

/// Account address: the first 20 bytes of SHA-256 over the owner's public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse an address from a slice, failing unless it is exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Parse an address from hex (an optional `0x` prefix is accepted).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let raw = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        Self::from_slice(&raw).ok_or(hex::FromHexError::InvalidStringLength)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Ed25519 verifying key bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PubKey(pub [u8; PUB_KEY_LEN]);

impl PubKey {
    /// Derive the account address controlled by this key.
    pub fn address(&self) -> Address {
        let digest = hash_sha256(&self.0);
        let mut addr = [0u8; ADDRESS_LEN];
        addr.copy_from_slice(&digest[..ADDRESS_LEN]);
        Address(addr)
    }

    pub fn as_bytes(&self) -> &[u8; PUB_KEY_LEN] {
        &self.0
    }
}

impl From<&ed25519_dalek::VerifyingKey> for PubKey {
    fn from(vk: &ed25519_dalek::VerifyingKey) -> Self {
        Self(*vk.as_bytes())
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", hex::encode(self.0))
    }
}

impl Serialize for PubKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex_bytes::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        hex_bytes::deserialize(deserializer).map(Self)
    }
}

/// Serde helpers for fixed-size byte arrays rendered as hex strings.
pub mod hex_bytes {
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
        let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
        raw.as_slice().try_into().map_err(|_| {
            serde::de::Error::custom(format!("expected {} bytes, got {}", N, raw.len()))
        })
    }
}

/// Convert a `Hash` to a hex string for display purposes.
pub fn hash_to_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}
