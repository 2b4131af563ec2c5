//! `keel-primitives`: foundational types for the keel ledger.
//!
//! Identifiers, coins, accounts, messages and transactions, the binary/JSON
//! codec with its type registry, cryptography, the write overlay, and the
//! Merkle commitment over committed state. Shared by the engine and by any
//! tooling that builds or inspects transactions.

pub mod types;
pub mod error;
pub mod coin;
pub mod codec;
pub mod crypto;
pub mod account;
pub mod msg;
pub mod tx;
pub mod block;
pub mod state;
pub mod merkle;

// Re-export commonly used types at the crate root for convenience.
pub use types::{Address, BlockHeight, Hash, PubKey, ZERO_HASH};
pub use error::{CodeType, CodecError, CodecResult};
pub use coin::{Coin, Coins};
pub use codec::{Codec, RegistryError, TypeFamily, TypeTag};
pub use account::{Account, AccountError, AppAccount, BaseAccount, StoredAccount};
pub use msg::{IbcPacket, IbcReceiveMsg, IbcTransferMsg, Input, Msg, MsgError, Output, SendMsg};
pub use tx::{sign_bytes, StdFee, StdSignature, Tx};
pub use block::{BlockHeader, CommitInfo};
pub use state::StateOverlay;
pub use merkle::state_root;
