//! Block metadata delivered by the consensus engine.
//!
//! The application never reads the OS clock; `time` is whatever the consensus
//! header says it is.

use serde::{Deserialize, Serialize};

use crate::types::{Address, BlockHeight, Hash};

/// Header of the block being executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain identifier (e.g. "keel-test").
    pub chain_id: String,
    /// Block height; the first block after genesis is 1.
    pub height: BlockHeight,
    /// Logical block time from consensus, in seconds.
    pub time: u64,
    /// Address of the block proposer.
    pub proposer: Address,
}

impl BlockHeader {
    pub fn new(chain_id: impl Into<String>, height: BlockHeight, time: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            height,
            time,
            proposer: Address::default(),
        }
    }

    pub fn with_proposer(mut self, proposer: Address) -> Self {
        self.proposer = proposer;
        self
    }
}

/// Result of committing a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    pub height: BlockHeight,
    /// Merkle root of the committed store after this block.
    pub app_hash: Hash,
}
