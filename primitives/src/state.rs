//! Write buffer layered over committed state.
//!
//! Writes made while executing a block (or a single transaction) are buffered
//! here and are visible to subsequent reads through the same layer. The owner
//! either merges the buffer into its parent on success or drops it.
//! Records in this ledger are never deleted, so the overlay only holds sets.

use std::collections::BTreeMap;

/// Buffered key → value writes in deterministic key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateOverlay {
    writes: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Keys + values currently buffered, in bytes.
    total_write_bytes: u64,
}

impl StateOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any earlier write to it in this overlay.
    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let new_bytes = (key.len() + value.len()) as u64;
        if let Some(prev) = self.writes.get(&key) {
            let prev_bytes = (key.len() + prev.len()) as u64;
            self.total_write_bytes = self.total_write_bytes.saturating_sub(prev_bytes);
        }
        self.total_write_bytes = self.total_write_bytes.saturating_add(new_bytes);
        self.writes.insert(key, value);
    }

    /// `None` means the key was not written here; the caller falls through to
    /// the layer below.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.writes.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.writes.contains_key(key)
    }

    /// Apply every write of `child` on top of this overlay.
    pub fn merge(&mut self, child: StateOverlay) {
        for (key, value) in child.writes {
            self.set(key, value);
        }
    }

    /// Consume the overlay, yielding writes in ascending key order.
    pub fn drain(self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.writes
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.writes.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn clear(&mut self) {
        self.writes.clear();
        self.total_write_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn total_write_bytes(&self) -> u64 {
        self.total_write_bytes
    }
}
