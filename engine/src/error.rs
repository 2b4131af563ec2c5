//! Engine error types.
//!
//! Three layers, kept apart so a transaction failure can never be mistaken
//! for a broken node:
//!
//! - [`TxError`]: the transaction is rejected with a response code; state is
//!   unchanged and the block continues.
//! - [`InvariantViolation`]: stored data or construction is inconsistent.
//!   Block processing must stop.
//! - [`AppError`]: what the lifecycle entry points return to the caller.

use keel_primitives::{Address, BlockHeight, CodeType, CodecError, Coins, MsgError, RegistryError};

/// A condition that must never happen on a correctly operating node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// Stored bytes under `key` no longer decode.
    #[error("corrupt {what} record at {key}: {source}")]
    CorruptRecord {
        what: &'static str,
        key: String,
        source: CodecError,
    },

    /// Type registration failed while building the application.
    #[error("codec misconfigured: {0}")]
    Registry(#[from] RegistryError),
}

impl InvariantViolation {
    pub fn corrupt(what: &'static str, key: &[u8], source: CodecError) -> Self {
        Self::CorruptRecord {
            what,
            key: hex::encode(key),
            source,
        }
    }
}

/// Transaction rejection. Each variant maps onto exactly one [`CodeType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error("decode: {0}")]
    Decode(String),

    #[error("invalid sequence for {address}: expected {expected}, got {got}")]
    InvalidSequence {
        address: Address,
        expected: u64,
        got: u64,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("insufficient funds for {address}: has {has:?}, needs {needs}")]
    InsufficientFunds {
        address: Address,
        has: String,
        needs: String,
    },

    #[error("unknown address {0}")]
    UnknownAddress(Address),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("invalid ibc packet: {0}")]
    InvalidIbcPacket(String),

    /// `new_account` on an address that already has a record.
    #[error("account {0} already exists")]
    AccountExists(Address),

    #[error(transparent)]
    Fatal(#[from] InvariantViolation),
}

impl TxError {
    pub fn code(&self) -> CodeType {
        match self {
            Self::Decode(_) => CodeType::DecodeError,
            Self::InvalidSequence { .. } => CodeType::InvalidSequence,
            Self::Unauthorized(_) => CodeType::Unauthorized,
            Self::InsufficientFunds { .. } => CodeType::InsufficientFunds,
            Self::UnknownAddress(_) => CodeType::UnknownAddress,
            Self::InvalidSignature(_) => CodeType::InvalidSignature,
            Self::InvalidCoins(_) => CodeType::InvalidCoins,
            Self::InvalidIbcPacket(_) => CodeType::InvalidIbcPacket,
            Self::AccountExists(_) | Self::Fatal(_) => CodeType::Internal,
        }
    }

    pub fn insufficient_funds(address: Address, has: &Coins, needs: &Coins) -> Self {
        Self::InsufficientFunds {
            address,
            has: has.to_string(),
            needs: needs.to_string(),
        }
    }

    /// Transaction bytes that failed to decode, including message kinds
    /// missing from the registry.
    pub fn from_decode(err: CodecError) -> Self {
        if err.is_unregistered() {
            Self::Decode(format!("unknown message kind: {}", err))
        } else {
            Self::Decode(err.to_string())
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl From<MsgError> for TxError {
    fn from(err: MsgError) -> Self {
        match err {
            MsgError::InvalidCoins(m) => Self::InvalidCoins(m),
            MsgError::InvalidPacket(m) => Self::InvalidIbcPacket(m),
        }
    }
}

/// Misuse of the block lifecycle by the driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("chain not initialized")]
    NotInitialized,

    #[error("chain already initialized")]
    AlreadyInitialized,

    #[error("a block is already in progress")]
    BlockInProgress,

    #[error("no block in progress")]
    NoBlockInProgress,

    #[error("unexpected block height: expected {expected}, got {got}")]
    UnexpectedHeight {
        expected: BlockHeight,
        got: BlockHeight,
    },

    #[error("chain id mismatch: expected {expected:?}, got {got:?}")]
    ChainIdMismatch { expected: String, got: String },
}

/// Error returned by the lifecycle entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("lifecycle: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("genesis: {0}")]
    Genesis(String),

    #[error("fatal: {0}")]
    Fatal(#[from] InvariantViolation),

    #[error("config: {0}")]
    Config(String),

    /// A read-only query could not be answered.
    #[error("query: {0}")]
    Query(String),
}

impl AppError {
    /// Lift a failure from a read against committed state. Invariant
    /// violations stay fatal.
    pub fn from_query(err: TxError) -> Self {
        match err {
            TxError::Fatal(violation) => Self::Fatal(violation),
            other => Self::Query(other.to_string()),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        Self::Fatal(InvariantViolation::Registry(err))
    }
}
