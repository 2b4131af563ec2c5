//! Transaction processing: decode → validate → authenticate → fee → dispatch.
//!
//! Everything up to and including stateless validation happens before any
//! store access. From authentication on, all writes go to a cache opened
//! over the caller's state; the cache is returned only if every step
//! succeeds, so a rejected transaction leaves no trace, not even a sequence
//! bump.

use keel_primitives::codec::TypeTag;
use keel_primitives::msg::{ALL_MSG_TYPES, SEND_MSG};
use keel_primitives::{Account, Address, BlockHeader, Codec, Msg, RegistryError, StateOverlay, Tx};

use crate::account_mapper::SealedAccountMapper;
use crate::auth::authenticate;
use crate::bank::{handle_send, CoinKeeper};
use crate::config::AppConfig;
use crate::context::{Context, ExecMode};
use crate::error::TxError;
use crate::fees::FeePool;
use crate::ibc::{handle_receive, handle_transfer, IbcMapper};
use crate::store::{CacheStore, KVReader, FEE_STORE, IBC_STORE};

/// Stateless transaction pipeline plus the mappers handlers run against.
#[derive(Debug, Clone)]
pub struct TxProcessor<A: Account> {
    codec: Codec,
    accounts: SealedAccountMapper<A>,
    ibc: IbcMapper,
    fees: FeePool,
    max_tx_bytes: usize,
    max_signatures: usize,
}

impl<A: Account> TxProcessor<A> {
    /// Register the message kinds enabled by `config`.
    pub fn new(config: &AppConfig, accounts: SealedAccountMapper<A>) -> Result<Self, RegistryError> {
        let mut codec = Codec::new();
        let kinds: Vec<TypeTag> = if config.enable_ibc {
            ALL_MSG_TYPES.to_vec()
        } else {
            vec![SEND_MSG]
        };
        codec.register_all(&kinds)?;
        Ok(Self {
            codec,
            accounts,
            ibc: IbcMapper::new(IBC_STORE),
            fees: FeePool::new(FEE_STORE),
            max_tx_bytes: config.max_tx_bytes,
            max_signatures: config.max_signatures,
        })
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn accounts(&self) -> &SealedAccountMapper<A> {
        &self.accounts
    }

    pub fn ibc(&self) -> &IbcMapper {
        &self.ibc
    }

    pub fn fees(&self) -> &FeePool {
        &self.fees
    }

    pub fn decode(&self, tx_bytes: &[u8]) -> Result<Tx, TxError> {
        if tx_bytes.len() > self.max_tx_bytes {
            return Err(TxError::Decode(format!(
                "transaction is {} bytes, limit is {}",
                tx_bytes.len(),
                self.max_tx_bytes
            )));
        }
        self.codec.decode_binary::<Tx>(tx_bytes).map_err(TxError::from_decode)
    }

    /// Checks needing no state. Returns the signers in signature order.
    pub fn validate(&self, tx: &Tx) -> Result<Vec<Address>, TxError> {
        tx.msg.validate_basic()?;

        let signers = tx.msg.signers();
        if signers.is_empty() {
            return Err(TxError::Unauthorized("message has no signers".into()));
        }
        if tx.signatures.len() != signers.len() {
            return Err(TxError::Unauthorized(format!(
                "{} signatures for {} signers",
                tx.signatures.len(),
                signers.len()
            )));
        }
        if signers.len() > self.max_signatures {
            return Err(TxError::Unauthorized(format!(
                "{} signers exceeds limit of {}",
                signers.len(),
                self.max_signatures
            )));
        }
        // An all-zero fee such as `[0foocoin]` means no fee.
        if !tx.fee.amount.is_zero() && !tx.fee.amount.is_valid() {
            return Err(TxError::InvalidCoins(format!("fee {:?} is not canonical", tx.fee.amount)));
        }
        Ok(signers)
    }

    /// Run one encoded transaction over `parent`. On success returns the
    /// writes it made, for the caller to merge into its state.
    pub fn run_tx(
        &self,
        parent: &dyn KVReader,
        header: &BlockHeader,
        mode: ExecMode,
        tx_bytes: &[u8],
    ) -> Result<StateOverlay, TxError> {
        let tx = self.decode(tx_bytes)?;
        let signers = self.validate(&tx)?;

        let mut cache = CacheStore::new(parent);
        {
            let mut ctx = Context::new(&mut cache, header.clone(), mode);
            self.execute(&mut ctx, &tx, &signers)?;
        }
        Ok(cache.into_overlay())
    }

    fn execute(&self, ctx: &mut Context<'_>, tx: &Tx, signers: &[Address]) -> Result<(), TxError> {
        authenticate(ctx, &self.accounts, tx, signers)?;

        let keeper = CoinKeeper::new(&self.accounts);
        self.fees.collect(ctx, &keeper, signers[0], &tx.fee.amount)?;

        match &tx.msg {
            Msg::Send(msg) => handle_send(ctx, &keeper, msg),
            Msg::IbcTransfer(msg) => handle_transfer(ctx, &keeper, &self.ibc, msg),
            Msg::IbcReceive(msg) => handle_receive(ctx, &keeper, &self.ibc, msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account_mapper::AccountMapper;
    use crate::store::{Layered, MemDb, ACCOUNT_STORE};
    use ed25519_dalek::SigningKey;
    use keel_primitives::crypto::{keypair_from_seed, pub_key_of};
    use keel_primitives::{
        AppAccount, BaseAccount, CodeType, Coin, Coins, IbcPacket, IbcTransferMsg, SendMsg, StdFee,
    };

    const CHAIN: &str = "keel-test";

    fn key(seed: u8) -> (Address, SigningKey) {
        let sk = keypair_from_seed(seed);
        (pub_key_of(&sk).address(), sk)
    }

    fn processor(config: &AppConfig) -> TxProcessor<AppAccount> {
        let accounts = AccountMapper::new(ACCOUNT_STORE).unwrap().seal();
        TxProcessor::new(config, accounts).unwrap()
    }

    fn funded_db(p: &TxProcessor<AppAccount>, who: Address, coins: &str) -> MemDb {
        let mut db = MemDb::new();
        let mut cache = CacheStore::new(&db);
        {
            let mut ctx = Context::new(&mut cache, header(), ExecMode::Deliver);
            let acc = AppAccount::new(BaseAccount::new(who, Coins::parse(coins).unwrap()), "");
            p.accounts().set_account(&mut ctx, &acc);
        }
        let writes = cache.into_overlay();
        db.apply(writes);
        db
    }

    fn header() -> BlockHeader {
        BlockHeader::new(CHAIN, 1, 0)
    }

    fn encode(p: &TxProcessor<AppAccount>, tx: &Tx) -> Vec<u8> {
        p.codec().encode_binary(tx)
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let p = processor(&AppConfig::default());
        let db = MemDb::new();
        let err = p.run_tx(&db, &header(), ExecMode::Check, &[SEND_MSG.tag, 0xad]).unwrap_err();
        assert_eq!(err.code(), CodeType::DecodeError);

        // Unregistered tag.
        let err = p.run_tx(&db, &header(), ExecMode::Check, &[0x7e, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err.code(), CodeType::DecodeError);
    }

    #[test]
    fn test_oversized_tx_rejected() {
        let config = AppConfig { max_tx_bytes: 4, ..AppConfig::default() };
        let p = processor(&config);
        let db = MemDb::new();
        let err = p.run_tx(&db, &header(), ExecMode::Check, &[0u8; 5]).unwrap_err();
        assert_eq!(err.code(), CodeType::DecodeError);
    }

    #[test]
    fn test_ibc_disabled_is_decode_error() {
        let full = processor(&AppConfig::default());
        let bank_only = processor(&AppConfig { enable_ibc: false, ..AppConfig::default() });
        let (alice, sk) = key(1);
        let (bob, _) = key(2);
        let packet = IbcPacket {
            src_addr: alice,
            dest_addr: bob,
            coins: Coins::single("foocoin", 1),
            src_chain: CHAIN.into(),
            dest_chain: "other".into(),
        };
        let tx = Tx::new(Msg::IbcTransfer(IbcTransferMsg { packet }), StdFee::zero())
            .sign(CHAIN, &[(&sk, 0)]);
        let db = MemDb::new();
        let err = bank_only
            .run_tx(&db, &header(), ExecMode::Deliver, &encode(&full, &tx))
            .unwrap_err();
        assert_eq!(err.code(), CodeType::DecodeError);
    }

    #[test]
    fn test_zero_amount_fee_is_no_fee() {
        let p = processor(&AppConfig::default());
        let (alice, sk) = key(1);
        let (bob, _) = key(2);
        let db = funded_db(&p, alice, "10foocoin");

        let fee = StdFee::new(Coins::from_vec(vec![Coin::new("foocoin", 0)]), 0);
        let tx = Tx::new(Msg::Send(SendMsg::single(alice, bob, Coins::single("foocoin", 3))), fee)
            .sign(CHAIN, &[(&sk, 0)]);
        let writes = p.run_tx(&db, &header(), ExecMode::Deliver, &encode(&p, &tx)).unwrap();

        let view = Layered::new(&db, &writes);
        let mut cache = CacheStore::new(&view);
        let mut ctx = Context::new(&mut cache, header(), ExecMode::Deliver);
        assert_eq!(p.fees().collected(&mut ctx).unwrap(), Coins::empty());

        // Unsorted nonzero fees are still rejected.
        let fee = StdFee::new(
            Coins::from_vec(vec![Coin::new("b", 1), Coin::new("a", 1)]),
            0,
        );
        let tx = Tx::new(Msg::Send(SendMsg::single(alice, bob, Coins::single("foocoin", 3))), fee);
        let tx = tx.sign(CHAIN, &[(&sk, 0)]);
        assert_eq!(p.validate(&tx).unwrap_err().code(), CodeType::InvalidCoins);
    }

    #[test]
    fn test_signature_count_must_match_signers() {
        let p = processor(&AppConfig::default());
        let (alice, _) = key(1);
        let (bob, _) = key(2);
        let tx = Tx::new(
            Msg::Send(SendMsg::single(alice, bob, Coins::single("foocoin", 1))),
            StdFee::zero(),
        );
        assert_eq!(p.validate(&tx).unwrap_err().code(), CodeType::Unauthorized);
    }

    #[test]
    fn test_too_many_signers() {
        let p = processor(&AppConfig { max_signatures: 1, ..AppConfig::default() });
        let (alice, ska) = key(1);
        let (bob, skb) = key(2);
        let msg = SendMsg::new(
            vec![
                keel_primitives::Input::new(alice, Coins::single("a", 1)),
                keel_primitives::Input::new(bob, Coins::single("a", 1)),
            ],
            vec![keel_primitives::Output::new(alice, Coins::single("a", 2))],
        );
        let tx = Tx::new(Msg::Send(msg), StdFee::zero()).sign(CHAIN, &[(&ska, 0), (&skb, 0)]);
        assert_eq!(p.validate(&tx).unwrap_err().code(), CodeType::Unauthorized);
    }

    #[test]
    fn test_invalid_coins_rejected_before_state() {
        let p = processor(&AppConfig::default());
        let (alice, sk) = key(1);
        let (bob, _) = key(2);
        let tx = Tx::new(
            Msg::Send(SendMsg::single(alice, bob, Coins::empty())),
            StdFee::zero(),
        )
        .sign(CHAIN, &[(&sk, 0)]);
        // Empty db: a stateful check would have said UnknownAddress.
        let db = MemDb::new();
        let err = p.run_tx(&db, &header(), ExecMode::Deliver, &encode(&p, &tx)).unwrap_err();
        assert_eq!(err.code(), CodeType::InvalidCoins);
    }

    #[test]
    fn test_send_and_fee() {
        let p = processor(&AppConfig::default());
        let (alice, sk) = key(1);
        let (bob, _) = key(2);
        let db = funded_db(&p, alice, "100foocoin");

        let tx = Tx::new(
            Msg::Send(SendMsg::single(alice, bob, Coins::single("foocoin", 10))),
            StdFee::new(Coins::single("foocoin", 1), 0),
        )
        .sign(CHAIN, &[(&sk, 0)]);
        let writes = p.run_tx(&db, &header(), ExecMode::Deliver, &encode(&p, &tx)).unwrap();

        let view = Layered::new(&db, &writes);
        let mut cache = CacheStore::new(&view);
        let mut ctx = Context::new(&mut cache, header(), ExecMode::Deliver);
        let keeper = CoinKeeper::new(p.accounts());
        assert_eq!(keeper.get_coins(&mut ctx, alice).unwrap(), Coins::single("foocoin", 89));
        assert_eq!(keeper.get_coins(&mut ctx, bob).unwrap(), Coins::single("foocoin", 10));
        assert_eq!(p.fees().collected(&mut ctx).unwrap(), Coins::single("foocoin", 1));
    }

    #[test]
    fn test_failed_handler_discards_sequence_bump() {
        let p = processor(&AppConfig::default());
        let (alice, sk) = key(1);
        let (bob, _) = key(2);
        let db = funded_db(&p, alice, "5foocoin");

        let tx = Tx::new(
            Msg::Send(SendMsg::single(alice, bob, Coins::single("foocoin", 6))),
            StdFee::zero(),
        )
        .sign(CHAIN, &[(&sk, 0)]);
        let err = p.run_tx(&db, &header(), ExecMode::Deliver, &encode(&p, &tx)).unwrap_err();
        assert_eq!(err.code(), CodeType::InsufficientFunds);

        // Same tx at the same sequence still authenticates.
        let mut cache = CacheStore::new(&db);
        let mut ctx = Context::new(&mut cache, header(), ExecMode::Deliver);
        let acc = p.accounts().get_account(&mut ctx, alice).unwrap().unwrap();
        assert_eq!(acc.sequence(), 0);
        assert!(acc.pub_key().is_none());
    }
}
