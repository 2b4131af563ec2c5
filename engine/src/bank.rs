//! Balances and the send handler.

use keel_primitives::{Account, Address, Coins, SendMsg};
use tracing::debug;

use crate::account_mapper::SealedAccountMapper;
use crate::context::Context;
use crate::error::TxError;

/// Balance operations on top of the account mapper.
pub struct CoinKeeper<'m, A: Account> {
    accounts: &'m SealedAccountMapper<A>,
}

impl<'m, A: Account> CoinKeeper<'m, A> {
    pub fn new(accounts: &'m SealedAccountMapper<A>) -> Self {
        Self { accounts }
    }

    /// Balance of `address`; empty for an unknown address.
    pub fn get_coins(&self, ctx: &mut Context<'_>, address: Address) -> Result<Coins, TxError> {
        Ok(self
            .accounts
            .get_account(ctx, address)?
            .map(|acc| acc.coins().clone())
            .unwrap_or_default())
    }

    pub fn has_coins(&self, ctx: &mut Context<'_>, address: Address, amount: &Coins) -> Result<bool, TxError> {
        Ok(self.get_coins(ctx, address)?.is_all_gte(amount))
    }

    /// Debit `amount`. The account must exist and hold enough of every
    /// denomination. Returns the new balance.
    pub fn subtract_coins(
        &self,
        ctx: &mut Context<'_>,
        address: Address,
        amount: &Coins,
    ) -> Result<Coins, TxError> {
        let mut acc = self
            .accounts
            .get_account(ctx, address)?
            .ok_or(TxError::UnknownAddress(address))?;
        let remaining = acc
            .coins()
            .checked_sub(amount)
            .ok_or_else(|| TxError::insufficient_funds(address, acc.coins(), amount))?;
        acc.set_coins(remaining.clone());
        self.accounts.set_account(ctx, &acc);
        Ok(remaining)
    }

    /// Credit `amount`, creating the account on first credit. Returns the new
    /// balance.
    pub fn add_coins(
        &self,
        ctx: &mut Context<'_>,
        address: Address,
        amount: &Coins,
    ) -> Result<Coins, TxError> {
        let mut acc = match self.accounts.get_account(ctx, address)? {
            Some(acc) => acc,
            None => {
                debug!(mode = ctx.mode().as_str(), address = %address, "creating account on first credit");
                self.accounts.new_account(ctx, address)?
            }
        };
        let total = acc
            .coins()
            .checked_add(amount)
            .ok_or_else(|| TxError::InvalidCoins(format!("balance of {} overflows", address)))?;
        acc.set_coins(total.clone());
        self.accounts.set_account(ctx, &acc);
        Ok(total)
    }
}

/// Debit every input in order, then credit every output in order.
pub fn handle_send<A: Account>(
    ctx: &mut Context<'_>,
    keeper: &CoinKeeper<'_, A>,
    msg: &SendMsg,
) -> Result<(), TxError> {
    for input in &msg.inputs {
        keeper.subtract_coins(ctx, input.address, &input.coins)?;
    }
    for output in &msg.outputs {
        keeper.add_coins(ctx, output.address, &output.coins)?;
    }
    Ok(())
}
