//! Key-value stores.
//!
//! The committed [`MemDb`] is the only durable store. Everything above it is
//! a [`StateOverlay`] layer: the per-block deliver state, the check state, and
//! a [`CacheStore`] opened per transaction. Layers read through to their
//! parent and are merged into it (or dropped) by their owner.
//!
//! Store partitions are plain key prefixes named by a [`StoreKey`].

use std::collections::BTreeMap;

use keel_primitives::{state_root, Hash, StateOverlay};

/// Read access to a key-value store.
pub trait KVReader {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Read-write access to a key-value store.
pub trait KVStore: KVReader {
    fn set(&mut self, key: &[u8], value: &[u8]);
}

/// Name of one store partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey(&'static str);

impl StoreKey {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }

    /// `name/`
    pub fn prefix(&self) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(self.0.len() + 1);
        prefix.extend_from_slice(self.0.as_bytes());
        prefix.push(b'/');
        prefix
    }
}

/// Accounts.
pub const ACCOUNT_STORE: StoreKey = StoreKey::new("acc");
/// IBC egress queues and ingress counters.
pub const IBC_STORE: StoreKey = StoreKey::new("ibc");
/// Collected fees.
pub const FEE_STORE: StoreKey = StoreKey::new("fee");

// ── MemDb: committed state ──

/// Committed state, backed by a `BTreeMap` for deterministic iteration.
#[derive(Debug, Clone, Default)]
pub struct MemDb {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write in `overlay` durable.
    pub fn apply(&mut self, overlay: StateOverlay) {
        self.data.extend(overlay.drain());
    }

    /// Merkle root over every committed entry.
    pub fn root(&self) -> Hash {
        state_root(self.data.iter().map(|(k, v)| (k.as_slice(), v.as_slice())))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KVReader for MemDb {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn has(&self, key: &[u8]) -> bool {
        self.data.contains_key(key)
    }
}

// ── Layered: committed state plus one overlay, read-only ──

/// Read view of `base` with `overlay` on top.
pub struct Layered<'a> {
    base: &'a dyn KVReader,
    overlay: &'a StateOverlay,
}

impl<'a> Layered<'a> {
    pub fn new(base: &'a dyn KVReader, overlay: &'a StateOverlay) -> Self {
        Self { base, overlay }
    }
}

impl KVReader for Layered<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.overlay.get(key) {
            Some(value) => Some(value.to_vec()),
            None => self.base.get(key),
        }
    }
}

// ── CacheStore: buffered writes over a parent ──

/// Write buffer over a read-only parent. Dropping it discards every write.
pub struct CacheStore<'a> {
    parent: &'a dyn KVReader,
    overlay: StateOverlay,
}

impl<'a> CacheStore<'a> {
    pub fn new(parent: &'a dyn KVReader) -> Self {
        Self {
            parent,
            overlay: StateOverlay::new(),
        }
    }

    /// Consume the cache, returning the buffered writes for the owner to
    /// merge into the parent's layer.
    pub fn into_overlay(self) -> StateOverlay {
        self.overlay
    }
}

impl KVReader for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.overlay.get(key) {
            Some(value) => Some(value.to_vec()),
            None => self.parent.get(key),
        }
    }
}

impl KVStore for CacheStore<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.overlay.set(key.to_vec(), value.to_vec());
    }
}

// ── PrefixStore: one partition of a parent store ──

/// View of the keys of `parent` that start with a partition prefix.
pub struct PrefixStore<'a> {
    parent: &'a mut dyn KVStore,
    prefix: Vec<u8>,
}

impl<'a> PrefixStore<'a> {
    pub fn new(parent: &'a mut dyn KVStore, key: &StoreKey) -> Self {
        Self {
            parent,
            prefix: key.prefix(),
        }
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }
}

impl KVReader for PrefixStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.parent.get(&self.full_key(key))
    }
}

impl KVStore for PrefixStore<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) {
        let full = self.full_key(key);
        self.parent.set(&full, value);
    }
}
