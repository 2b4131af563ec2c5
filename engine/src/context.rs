//! Per-call execution context.
//!
//! A [`Context`] bundles the store a handler may touch with the header of the
//! block being executed and the execution mode. The application creates one
//! per transaction (or per genesis import) and lends it by `&mut` to mappers
//! and handlers; nothing retains it past the call.

use keel_primitives::{BlockHeader, BlockHeight};

use crate::store::{KVStore, PrefixStore, StoreKey};

/// Which state a transaction runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Mempool admission against the check state.
    Check,
    /// Block execution against the deliver state.
    Deliver,
}

impl ExecMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Deliver => "deliver",
        }
    }
}

pub struct Context<'a> {
    store: &'a mut dyn KVStore,
    header: BlockHeader,
    mode: ExecMode,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KVStore, header: BlockHeader, mode: ExecMode) -> Self {
        Self {
            store,
            header,
            mode,
        }
    }

    /// The partition named by `key`.
    pub fn kv_store(&mut self, key: &StoreKey) -> PrefixStore<'_> {
        PrefixStore::new(&mut *self.store, key)
    }

    pub fn chain_id(&self) -> &str {
        &self.header.chain_id
    }

    pub fn height(&self) -> BlockHeight {
        self.header.height
    }

    pub fn mode(&self) -> ExecMode {
        self.mode
    }
}
