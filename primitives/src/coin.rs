//! Coins: multi-denomination balances.
//!
//! A valid `Coins` value is sorted by denomination, holds each denomination at
//! most once, and never carries a zero amount. Arithmetic preserves those
//! invariants; values decoded from untrusted input are checked with
//! [`Coins::is_valid`] rather than silently repaired.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A single denomination and amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A set of coins keyed by denomination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Wrap a list of coins as-is. Use [`Coins::sanitize`] or
    /// [`Coins::is_valid`] before trusting the result.
    pub fn from_vec(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    /// Build canonical coins from a single denomination.
    pub fn single(denom: impl Into<String>, amount: u64) -> Self {
        if amount == 0 {
            return Self::empty();
        }
        Self(vec![Coin::new(denom, amount)])
    }

    /// Parse `"77foocoin,99barcoin"`. Whitespace around entries is ignored,
    /// the result is sanitized.
    pub fn parse(s: &str) -> Option<Self> {
        let mut coins = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let split = part.find(|c: char| !c.is_ascii_digit())?;
            if split == 0 {
                return None;
            }
            let amount = part[..split].parse::<u64>().ok()?;
            let denom = &part[split..];
            if !denom.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
                return None;
            }
            coins.push(Coin::new(denom, amount));
        }
        Self::from_vec(coins).sanitize()
    }

    /// Sort by denomination, merge duplicates, drop zeros.
    ///
    /// Returns `None` if merging duplicates overflows or a denomination is
    /// empty.
    pub fn sanitize(self) -> Option<Self> {
        let mut coins = self.0;
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        let mut out: Vec<Coin> = Vec::with_capacity(coins.len());
        for coin in coins {
            if coin.denom.is_empty() {
                return None;
            }
            match out.last_mut() {
                Some(last) if last.denom == coin.denom => {
                    last.amount = last.amount.checked_add(coin.amount)?;
                }
                _ => out.push(coin),
            }
        }
        out.retain(|c| c.amount > 0);
        Some(Self(out))
    }

    /// Sorted strictly by denomination, no empty denominations, all amounts
    /// positive.
    pub fn is_valid(&self) -> bool {
        let sorted = self
            .0
            .windows(2)
            .all(|pair| pair[0].denom < pair[1].denom);
        sorted && self.0.iter().all(|c| !c.denom.is_empty() && c.amount > 0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|c| c.amount == 0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn amount_of(&self, denom: &str) -> u64 {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .map(|idx| self.0[idx].amount)
            .unwrap_or(0)
    }

    /// Merge two canonical coin sets. `None` on overflow.
    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        let (lhs, rhs) = (&self.0, &other.0);
        let mut out = Vec::with_capacity(lhs.len() + rhs.len());
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() || j < rhs.len() {
            let coin = if j == rhs.len() || (i < lhs.len() && lhs[i].denom < rhs[j].denom) {
                i += 1;
                lhs[i - 1].clone()
            } else if i == lhs.len() || rhs[j].denom < lhs[i].denom {
                j += 1;
                rhs[j - 1].clone()
            } else {
                let amount = lhs[i].amount.checked_add(rhs[j].amount)?;
                let coin = Coin::new(lhs[i].denom.clone(), amount);
                i += 1;
                j += 1;
                coin
            };
            if coin.amount > 0 {
                out.push(coin);
            }
        }
        Some(Coins(out))
    }

    /// Subtract `other` from `self`. `None` if any denomination would go
    /// negative. Denominations that reach zero are removed.
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut out = self.0.clone();
        for coin in other.iter().filter(|c| c.amount > 0) {
            let idx = out
                .binary_search_by(|c| c.denom.cmp(&coin.denom))
                .ok()?;
            out[idx].amount = out[idx].amount.checked_sub(coin.amount)?;
        }
        out.retain(|c| c.amount > 0);
        Some(Coins(out))
    }

    /// True if `self` holds at least `other` of every denomination.
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", coin)?;
        }
        Ok(())
    }
}

impl FromIterator<Coin> for Coins {
    fn from_iter<I: IntoIterator<Item = Coin>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(s: &str) -> Coins {
        Coins::parse(s).unwrap()
    }

    #[test]
    fn test_parse_sorts_and_displays() {
        let c = coins("99barcoin, 77foocoin");
        assert!(c.is_valid());
        assert_eq!(c.to_string(), "99barcoin,77foocoin");
        assert_eq!(c.amount_of("foocoin"), 77);
        assert_eq!(c.amount_of("nope"), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Coins::parse("foocoin").is_none());
        assert!(Coins::parse("10").is_none());
        assert!(Coins::parse("10Foo").is_none());
        assert_eq!(Coins::parse("").unwrap(), Coins::empty());
    }

    #[test]
    fn test_empty_displays_as_empty_string() {
        assert_eq!(Coins::empty().to_string(), "");
    }

    #[test]
    fn test_sanitize_merges_duplicates_and_drops_zero() {
        let raw = Coins::from_vec(vec![
            Coin::new("foo", 3),
            Coin::new("bar", 0),
            Coin::new("foo", 4),
        ]);
        assert!(!raw.is_valid());
        let clean = raw.sanitize().unwrap();
        assert_eq!(clean, Coins::single("foo", 7));
        assert!(clean.is_valid());
    }

    #[test]
    fn test_is_valid_rejects_unsorted_and_zero() {
        let unsorted = Coins::from_vec(vec![Coin::new("b", 1), Coin::new("a", 1)]);
        assert!(!unsorted.is_valid());
        let zero = Coins::from_vec(vec![Coin::new("a", 0)]);
        assert!(!zero.is_valid());
        let dup = Coins::from_vec(vec![Coin::new("a", 1), Coin::new("a", 1)]);
        assert!(!dup.is_valid());
    }

    #[test]
    fn test_checked_add_merges() {
        let sum = coins("1a,2b").checked_add(&coins("3b,4c")).unwrap();
        assert_eq!(sum, coins("1a,5b,4c"));
        assert!(sum.is_valid());
    }

    #[test]
    fn test_checked_add_overflow() {
        let max = Coins::single("a", u64::MAX);
        assert!(max.checked_add(&Coins::single("a", 1)).is_none());
    }

    #[test]
    fn test_checked_sub_removes_zero_entries() {
        let left = coins("10foocoin").checked_sub(&coins("10foocoin")).unwrap();
        assert!(left.is_empty());
        let left = coins("77foocoin").checked_sub(&coins("10foocoin")).unwrap();
        assert_eq!(left.to_string(), "67foocoin");
    }

    #[test]
    fn test_checked_sub_insufficient() {
        assert!(coins("5a").checked_sub(&coins("6a")).is_none());
        assert!(coins("5a").checked_sub(&coins("1b")).is_none());
    }

    #[test]
    fn test_is_all_gte() {
        assert!(coins("5a,5b").is_all_gte(&coins("5a")));
        assert!(!coins("5a").is_all_gte(&coins("5a,1b")));
        assert!(coins("5a").is_all_gte(&Coins::empty()));
    }
}
