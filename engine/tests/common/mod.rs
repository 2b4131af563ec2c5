//! Shared test helpers for integration tests.
//!
//! Provides deterministic keypairs, genesis builders, transaction signing
//! and block-driving helpers. Every test builds its own `App`.

#![allow(dead_code)]

use ed25519_dalek::SigningKey;

use keel_engine::{App, AppConfig, GenesisState, TxResponse};
use keel_primitives::crypto::{keypair_from_seed, pub_key_of};
use keel_primitives::{
    Account, Address, AppAccount, BaseAccount, BlockHeader, Coins, Msg, SendMsg, StdFee, Tx,
};

pub const CHAIN_ID: &str = "keel-test";
pub const BLOCK_TIME: u64 = 1_700_000_000;

// ── Deterministic Keypairs ──

/// Signing key whose secret is `[seed; 32]`, with its ledger address.
pub fn deterministic_keypair(seed: u8) -> (Address, SigningKey) {
    let sk = keypair_from_seed(seed);
    (pub_key_of(&sk).address(), sk)
}

/// Alice: seed=1, stable address across all tests.
pub fn alice() -> (Address, SigningKey) {
    deterministic_keypair(1)
}

/// Bob: seed=2, stable address across all tests.
pub fn bob() -> (Address, SigningKey) {
    deterministic_keypair(2)
}

/// Charlie: seed=3, stable address across all tests.
pub fn charlie() -> (Address, SigningKey) {
    deterministic_keypair(3)
}

pub fn coins(s: &str) -> Coins {
    Coins::parse(s).expect("test coins must parse")
}

// ── Genesis ──

/// Genesis JSON funding each `(address, coins)` pair, named "foobart".
pub fn genesis_json(accounts: &[(Address, &str)]) -> Vec<u8> {
    let accounts: Vec<AppAccount> = accounts
        .iter()
        .map(|(addr, amount)| AppAccount::new(BaseAccount::new(*addr, coins(amount)), "foobart"))
        .collect();
    GenesisState::new(accounts).to_json().expect("genesis encodes")
}

/// Fresh app with genesis imported but not yet committed.
pub fn init_app(accounts: &[(Address, &str)]) -> App {
    init_app_with_config(AppConfig::default(), accounts)
}

pub fn init_app_with_config(config: AppConfig, accounts: &[(Address, &str)]) -> App {
    let mut app = App::new(config).expect("app builds");
    app.init_chain(&genesis_json(accounts)).expect("genesis imports");
    app
}

/// Fresh app with genesis committed at height 0.
pub fn committed_app(accounts: &[(Address, &str)]) -> App {
    let mut app = init_app(accounts);
    app.commit().expect("genesis commits");
    app
}

// ── Transactions ──

pub fn send_msg(from: Address, to: Address, amount: &str) -> Msg {
    Msg::Send(SendMsg::single(from, to, coins(amount)))
}

/// Sign `msg` with zero fee for the given (key, sequence) pairs.
pub fn signed(msg: Msg, signers: &[(&SigningKey, u64)]) -> Tx {
    Tx::new(msg, StdFee::zero()).sign(CHAIN_ID, signers)
}

pub fn encode(app: &App, tx: &Tx) -> Vec<u8> {
    app.processor().codec().encode_binary(tx)
}

// ── Blocks ──

pub fn header(height: u64) -> BlockHeader {
    BlockHeader::new(CHAIN_ID, height, BLOCK_TIME + height)
}

/// Begin the next block, deliver every tx, commit. Returns the responses.
pub fn run_block(app: &mut App, txs: &[Vec<u8>]) -> Vec<TxResponse> {
    app.begin_block(header(app.last_height() + 1)).expect("begin_block");
    let responses = txs
        .iter()
        .map(|tx| app.deliver_tx(tx).expect("deliver_tx"))
        .collect();
    app.commit().expect("commit");
    responses
}

// ── State ──

pub fn balance(app: &App, addr: Address) -> Coins {
    app.query_account(addr)
        .expect("query")
        .map(|acc| acc.coins().clone())
        .unwrap_or_default()
}

pub fn sequence(app: &App, addr: Address) -> u64 {
    app.query_account(addr)
        .expect("query")
        .map(|acc| acc.sequence())
        .unwrap_or(0)
}
