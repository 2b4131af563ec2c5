//! Transaction fee collection.
//!
//! Fees are moved from the paying account into a single pool stored under
//! `collected` in the fee partition. Nothing is burned, so supply is
//! conserved across accounts plus the pool.

use keel_primitives::{Account, Address, Codec, Coins};

use crate::bank::CoinKeeper;
use crate::context::Context;
use crate::error::{InvariantViolation, TxError};
use crate::store::{KVReader, KVStore, StoreKey};

const COLLECTED_KEY: &[u8] = b"collected";

#[derive(Debug, Clone)]
pub struct FeePool {
    key: StoreKey,
    codec: Codec,
}

impl FeePool {
    pub fn new(key: StoreKey) -> Self {
        Self {
            key,
            codec: Codec::new(),
        }
    }

    /// Everything collected so far.
    pub fn collected(&self, ctx: &mut Context<'_>) -> Result<Coins, TxError> {
        match ctx.kv_store(&self.key).get(COLLECTED_KEY) {
            None => Ok(Coins::empty()),
            Some(bytes) => self
                .codec
                .decode_binary::<Coins>(&bytes)
                .map_err(|err| InvariantViolation::corrupt("fee pool", COLLECTED_KEY, err).into()),
        }
    }

    /// Move `fee` from `payer` into the pool. A zero fee is a no-op.
    ///
    /// Relayed packets can mint more than genesis did, so a full pool rejects
    /// the transaction instead of stopping the chain.
    pub fn collect<A: Account>(
        &self,
        ctx: &mut Context<'_>,
        keeper: &CoinKeeper<'_, A>,
        payer: Address,
        fee: &Coins,
    ) -> Result<(), TxError> {
        if fee.is_zero() {
            return Ok(());
        }
        keeper.subtract_coins(ctx, payer, fee)?;
        let total = self
            .collected(ctx)?
            .checked_add(fee)
            .ok_or_else(|| TxError::InvalidCoins(format!("fee pool cannot hold another {}", fee)))?;
        let bytes = self.codec.encode_binary(&total);
        ctx.kv_store(&self.key).set(COLLECTED_KEY, &bytes);
        Ok(())
    }
}
