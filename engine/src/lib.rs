//! `keel-engine`: deterministic state machine of the keel ledger.
//!
//! The consensus engine drives an [`App`] through `init_chain`,
//! `begin_block`, `check_tx`, `deliver_tx` and `commit`. Each transaction is
//! decoded, validated, authenticated and dispatched to its handler inside a
//! transaction-scoped cache, so it either applies completely or not at all.
//!
//! ## Architecture
//!
//! - [`store`]: committed `MemDb`, layered caches, prefixed partitions
//! - [`context::Context`]: store view, block header and mode for one call
//! - [`account_mapper`]: address-keyed accounts (full and sealed mapper)
//! - [`bank`]: balances and the send handler
//! - [`ibc`]: egress queues, ingress sequences, transfer/receive handlers
//! - [`fees`]: fee collection into the fee pool
//! - [`auth`]: signature and sequence checks
//! - [`processor::TxProcessor`]: the per-transaction pipeline
//! - [`app::App`]: the lifecycle controller

pub mod error;
pub mod config;
pub mod store;
pub mod context;
pub mod account_mapper;
pub mod bank;
pub mod ibc;
pub mod fees;
pub mod auth;
pub mod genesis;
pub mod processor;
pub mod app;

// Re-export key types for convenience
pub use app::{App, TxResponse};
pub use config::AppConfig;
pub use context::{Context, ExecMode};
pub use error::{AppError, InvariantViolation, LifecycleError, TxError};
pub use genesis::GenesisState;
pub use account_mapper::{AccountMapper, SealedAccountMapper};
pub use ibc::IbcMapper;
pub use processor::TxProcessor;
