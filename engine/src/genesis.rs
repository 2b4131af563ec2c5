//! Genesis state import.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use keel_primitives::{Account, Coins};

use crate::account_mapper::SealedAccountMapper;
use crate::context::Context;
use crate::error::AppError;

/// Initial ledger contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "A: Account"))]
pub struct GenesisState<A> {
    #[serde(default)]
    pub accounts: Vec<A>,
}

impl<A: Account> GenesisState<A> {
    pub fn new(accounts: Vec<A>) -> Self {
        Self { accounts }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(bytes).map_err(|e| AppError::Genesis(e.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>, AppError> {
        serde_json::to_vec(self).map_err(|e| AppError::Genesis(e.to_string()))
    }

    /// Write every account with canonical coins. Duplicate addresses, coin
    /// sets that cannot be made canonical, and a per-denomination supply
    /// beyond u64 are rejected.
    pub fn apply(self, ctx: &mut Context<'_>, accounts: &SealedAccountMapper<A>) -> Result<usize, AppError> {
        let mut seen = BTreeSet::new();
        let mut supply = Coins::empty();
        let count = self.accounts.len();
        for mut acc in self.accounts {
            let address = acc.address();
            if !seen.insert(address) {
                return Err(AppError::Genesis(format!("duplicate account {}", address)));
            }
            let coins = acc
                .coins()
                .clone()
                .sanitize()
                .ok_or_else(|| AppError::Genesis(format!("invalid coins for {}", address)))?;
            supply = supply
                .checked_add(&coins)
                .ok_or_else(|| AppError::Genesis(format!("total supply overflows at {}", address)))?;
            acc.set_coins(coins);
            accounts.set_account(ctx, &acc);
        }
        Ok(count)
    }
}
