//! Address-keyed account storage.
//!
//! An [`AccountMapper`] owns the codec used for its records and is fixed to
//! one concrete account kind `A` at construction. While the application is
//! being built the full mapper exposes [`AccountMapper::codec_mut`]; once
//! sealed, only the three record operations remain.

use std::marker::PhantomData;

use keel_primitives::{Account, Address, Codec, RegistryError, StoredAccount};

use crate::context::Context;
use crate::error::{InvariantViolation, TxError};
use crate::store::{KVReader, KVStore, StoreKey};

/// Account storage with registry access, used during construction.
#[derive(Debug, Clone)]
pub struct AccountMapper<A: Account> {
    key: StoreKey,
    codec: Codec,
    _account: PhantomData<fn() -> A>,
}

impl<A: Account> AccountMapper<A> {
    /// Mapper over the `key` partition with `A` registered in its codec.
    pub fn new(key: StoreKey) -> Result<Self, RegistryError> {
        let mut codec = Codec::new();
        codec.register(A::TYPE)?;
        Ok(Self {
            key,
            codec,
            _account: PhantomData,
        })
    }

    pub fn store_key(&self) -> StoreKey {
        self.key
    }

    /// Registry access for construction-time registration.
    pub fn codec_mut(&mut self) -> &mut Codec {
        &mut self.codec
    }

    /// Freeze the codec and drop registry access.
    pub fn seal(self) -> SealedAccountMapper<A> {
        SealedAccountMapper { inner: self }
    }

    /// A fresh zero-valued account for `address`. Not persisted.
    pub fn new_account(&self, ctx: &mut Context<'_>, address: Address) -> Result<A, TxError> {
        if ctx.kv_store(&self.key).has(address.as_bytes()) {
            return Err(TxError::AccountExists(address));
        }
        Ok(A::from_address(address))
    }

    /// `None` if no record exists. Bytes that do not decode are fatal.
    pub fn get_account(&self, ctx: &mut Context<'_>, address: Address) -> Result<Option<A>, TxError> {
        let Some(bytes) = ctx.kv_store(&self.key).get(address.as_bytes()) else {
            return Ok(None);
        };
        let stored: StoredAccount<A> = self.codec.decode_binary(&bytes).map_err(|err| {
            let mut key = self.key.prefix();
            key.extend_from_slice(address.as_bytes());
            InvariantViolation::corrupt("account", &key, err)
        })?;
        Ok(Some(stored.0))
    }

    /// Overwrite the record at `account.address()`.
    pub fn set_account(&self, ctx: &mut Context<'_>, account: &A) {
        let bytes = self.codec.encode_binary(&StoredAccount(account.clone()));
        ctx.kv_store(&self.key)
            .set(account.address().as_bytes(), &bytes);
    }
}

/// Account storage after construction: records only, no codec access.
#[derive(Debug, Clone)]
pub struct SealedAccountMapper<A: Account> {
    inner: AccountMapper<A>,
}

impl<A: Account> SealedAccountMapper<A> {
    pub fn new_account(&self, ctx: &mut Context<'_>, address: Address) -> Result<A, TxError> {
        self.inner.new_account(ctx, address)
    }

    pub fn get_account(&self, ctx: &mut Context<'_>, address: Address) -> Result<Option<A>, TxError> {
        self.inner.get_account(ctx, address)
    }

    pub fn set_account(&self, ctx: &mut Context<'_>, account: &A) {
        self.inner.set_account(ctx, account)
    }
}
