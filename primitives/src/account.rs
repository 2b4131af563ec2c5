//! Account records.
//!
//! [`Account`] is the capability every concrete account kind provides. The
//! address is fixed when the account is constructed and there is no way to
//! change it afterwards; the public key can be bound once; the sequence only
//! moves forward one step at a time.
//!
//! Stored accounts are encoded as `[type tag][body]` so a record written by
//! one account kind is never misread as another.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::{
    BinaryDecode, BinaryEncode, Reader, Tagged, TypeFamily, TypeRegistry, TypeTag, Writer,
};
use crate::coin::Coins;
use crate::error::{CodecError, CodecResult};
use crate::types::{Address, PubKey};

/// Type tag of [`BaseAccount`].
pub const BASE_ACCOUNT: TypeTag = TypeTag::new(TypeFamily::Account, 0x01, "keel/BaseAccount");

/// Type tag of [`AppAccount`].
pub const APP_ACCOUNT: TypeTag = TypeTag::new(TypeFamily::Account, 0x02, "keel/AppAccount");

/// Rejected account mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("public key already bound for {0}")]
    PubKeyAlreadySet(Address),

    #[error("sequence overflow for {0}")]
    SequenceOverflow(Address),
}

/// A ledger account of some concrete kind.
pub trait Account:
    Clone + core::fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Registry identity of this kind.
    const TYPE: TypeTag;

    /// Fresh account with `address` set and every other field zero.
    fn from_address(address: Address) -> Self;

    fn address(&self) -> Address;

    fn coins(&self) -> &Coins;

    fn set_coins(&mut self, coins: Coins);

    fn pub_key(&self) -> Option<&PubKey>;

    /// Bind the public key. Fails if one is already bound.
    fn set_pub_key(&mut self, pub_key: PubKey) -> Result<(), AccountError>;

    fn sequence(&self) -> u64;

    /// Advance the replay-protection counter by exactly one.
    fn increment_sequence(&mut self) -> Result<(), AccountError>;

    /// Encode the kind-specific body (without the type tag).
    fn encode_body(&self, w: &mut Writer);

    /// Decode the kind-specific body (without the type tag).
    fn decode_body(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self>;
}

/// Wrapper giving any [`Account`] its tagged binary encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAccount<A>(pub A);

impl<A: Account> BinaryEncode for StoredAccount<A> {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(A::TYPE.tag);
        self.0.encode_body(w);
    }
}

impl<A: Account> BinaryDecode for StoredAccount<A> {
    fn decode(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        let tag = r.read_u8()?;
        let name = registry.require_tag(TypeFamily::Account, tag)?;
        if tag != A::TYPE.tag {
            return Err(CodecError::malformed(
                "account kind",
                format!("expected {}, found {}", A::TYPE.name, name),
            ));
        }
        A::decode_body(r, registry).map(StoredAccount)
    }
}

/// The standard account: balance, optional key, sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseAccount {
    address: Address,
    #[serde(default)]
    coins: Coins,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub_key: Option<PubKey>,
    #[serde(default)]
    sequence: u64,
}

impl BaseAccount {
    pub fn new(address: Address, coins: Coins) -> Self {
        Self {
            address,
            coins,
            pub_key: None,
            sequence: 0,
        }
    }
}

impl Account for BaseAccount {
    const TYPE: TypeTag = BASE_ACCOUNT;

    fn from_address(address: Address) -> Self {
        Self::new(address, Coins::empty())
    }

    fn address(&self) -> Address {
        self.address
    }

    fn coins(&self) -> &Coins {
        &self.coins
    }

    fn set_coins(&mut self, coins: Coins) {
        self.coins = coins;
    }

    fn pub_key(&self) -> Option<&PubKey> {
        self.pub_key.as_ref()
    }

    fn set_pub_key(&mut self, pub_key: PubKey) -> Result<(), AccountError> {
        if self.pub_key.is_some() {
            return Err(AccountError::PubKeyAlreadySet(self.address));
        }
        self.pub_key = Some(pub_key);
        Ok(())
    }

    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn increment_sequence(&mut self) -> Result<(), AccountError> {
        self.sequence = self
            .sequence
            .checked_add(1)
            .ok_or(AccountError::SequenceOverflow(self.address))?;
        Ok(())
    }

    fn encode_body(&self, w: &mut Writer) {
        self.address.encode(w);
        self.coins.encode(w);
        self.pub_key.encode(w);
        w.write_u64(self.sequence);
    }

    fn decode_body(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        Ok(Self {
            address: Address::decode(r, registry)?,
            coins: Coins::decode(r, registry)?,
            pub_key: Option::<PubKey>::decode(r, registry)?,
            sequence: r.read_u64()?,
        })
    }
}

/// Application account: a [`BaseAccount`] plus a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAccount {
    #[serde(flatten)]
    pub base: BaseAccount,
    #[serde(default)]
    pub name: String,
}

impl AppAccount {
    pub fn new(base: BaseAccount, name: impl Into<String>) -> Self {
        Self {
            base,
            name: name.into(),
        }
    }
}

impl Account for AppAccount {
    const TYPE: TypeTag = APP_ACCOUNT;

    fn from_address(address: Address) -> Self {
        Self::new(BaseAccount::from_address(address), "")
    }

    fn address(&self) -> Address {
        self.base.address()
    }

    fn coins(&self) -> &Coins {
        self.base.coins()
    }

    fn set_coins(&mut self, coins: Coins) {
        self.base.set_coins(coins);
    }

    fn pub_key(&self) -> Option<&PubKey> {
        self.base.pub_key()
    }

    fn set_pub_key(&mut self, pub_key: PubKey) -> Result<(), AccountError> {
        self.base.set_pub_key(pub_key)
    }

    fn sequence(&self) -> u64 {
        self.base.sequence()
    }

    fn increment_sequence(&mut self) -> Result<(), AccountError> {
        self.base.increment_sequence()
    }

    fn encode_body(&self, w: &mut Writer) {
        self.base.encode_body(w);
        w.write_string(&self.name);
    }

    fn decode_body(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        Ok(Self {
            base: BaseAccount::decode_body(r, registry)?,
            name: r.read_string()?,
        })
    }
}

impl Tagged for BaseAccount {
    fn type_tags(&self) -> Vec<TypeTag> {
        vec![BASE_ACCOUNT]
    }
}

impl Tagged for AppAccount {
    fn type_tags(&self) -> Vec<TypeTag> {
        vec![APP_ACCOUNT]
    }
}
