//! End-to-end tests through the lifecycle entry points:
//! init_chain → begin_block → check_tx / deliver_tx → commit.

mod common;

use keel_engine::{AppConfig, TxResponse};
use keel_primitives::{Account, CodeType, Coins, Input, Msg, Output, SendMsg, StdFee, Tx, ZERO_HASH};

use common::*;

// ── Test: send, replay, re-sign ──

#[test]
fn test_send_replay_and_resign() {
    let (a, ska) = alice();
    let (b, _) = bob();
    let mut app = committed_app(&[(a, "77foocoin")]);

    let tx0 = encode(&app, &signed(send_msg(a, b, "10foocoin"), &[(&ska, 0)]));
    let res = run_block(&mut app, &[tx0.clone()]);
    assert_eq!(res, vec![TxResponse::ok()]);
    assert_eq!(balance(&app, a), coins("67foocoin"));
    assert_eq!(balance(&app, b), coins("10foocoin"));
    assert_eq!(sequence(&app, a), 1);

    // Replay of the identical bytes.
    let res = run_block(&mut app, &[tx0.clone()]);
    assert_eq!(res[0].code, CodeType::InvalidSequence);

    // Claim sequence 1 without re-signing.
    let mut bumped: Tx = app.processor().codec().decode_binary(&tx0).unwrap();
    bumped.signatures[0].sequence = 1;
    let bytes = encode(&app, &bumped);
    let res = run_block(&mut app, &[bytes]);
    assert_eq!(res[0].code, CodeType::Unauthorized);

    // Properly re-signed at sequence 1.
    let tx1 = encode(&app, &signed(send_msg(a, b, "10foocoin"), &[(&ska, 1)]));
    let res = run_block(&mut app, &[tx1]);
    assert!(res[0].is_ok(), "{:?}", res[0]);
    assert_eq!(balance(&app, a), coins("57foocoin"));
    assert_eq!(balance(&app, b), coins("20foocoin"));
}

// ── Test: sequences advance within one block ──

#[test]
fn test_sequences_within_block() {
    let (a, ska) = alice();
    let (b, _) = bob();
    let mut app = committed_app(&[(a, "100foocoin")]);

    let txs: Vec<Vec<u8>> = (0..3)
        .map(|seq| encode(&app, &signed(send_msg(a, b, "5foocoin"), &[(&ska, seq)])))
        .collect();
    let res = run_block(&mut app, &txs);
    assert!(res.iter().all(TxResponse::is_ok), "{:?}", res);
    assert_eq!(balance(&app, b), coins("15foocoin"));
    assert_eq!(sequence(&app, a), 3);
}

// ── Test: out-of-order sequence ──

#[test]
fn test_future_sequence_rejected() {
    let (a, ska) = alice();
    let (b, _) = bob();
    let mut app = committed_app(&[(a, "100foocoin")]);

    let tx = encode(&app, &signed(send_msg(a, b, "5foocoin"), &[(&ska, 1)]));
    let res = run_block(&mut app, &[tx]);
    assert_eq!(res[0].code, CodeType::InvalidSequence);
    assert_eq!(sequence(&app, a), 0);
}

// ── Test: unknown signer ──

#[test]
fn test_unknown_signer_in_check_and_deliver() {
    let (a, _) = alice();
    let (b, _) = bob();
    let (c, skc) = charlie();
    let mut app = committed_app(&[(a, "77foocoin")]);

    let tx = encode(&app, &signed(send_msg(c, b, "1foocoin"), &[(&skc, 0)]));
    assert_eq!(app.check_tx(&tx).unwrap().code, CodeType::UnknownAddress);
    let res = run_block(&mut app, &[tx]);
    assert_eq!(res[0].code, CodeType::UnknownAddress);

    assert_eq!(balance(&app, a), coins("77foocoin"));
    assert!(app.query_account(b).unwrap().is_none());
    assert!(app.query_account(c).unwrap().is_none());
}

// ── Test: failed tx leaves nothing behind ──

#[test]
fn test_insufficient_funds_is_atomic() {
    let (a, ska) = alice();
    let (b, _) = bob();
    let mut app = committed_app(&[(a, "5foocoin")]);
    let hash_before = app.last_app_hash();

    let tx = encode(&app, &signed(send_msg(a, b, "6foocoin"), &[(&ska, 0)]));
    let res = run_block(&mut app, &[tx]);
    assert_eq!(res[0].code, CodeType::InsufficientFunds);
    assert_eq!(sequence(&app, a), 0);
    assert!(app.query_account(a).unwrap().unwrap().pub_key().is_none());
    assert_eq!(app.last_app_hash(), hash_before);
}

// ── Test: stateless failures ──

#[test]
fn test_stateless_rejections() {
    let (a, ska) = alice();
    let (b, skb) = bob();
    let mut app = committed_app(&[(a, "77foocoin")]);

    // Inputs and outputs disagree.
    let unbalanced = Msg::Send(SendMsg::new(
        vec![Input::new(a, coins("10foocoin"))],
        vec![Output::new(b, coins("9foocoin"))],
    ));
    let tx = encode(&app, &signed(unbalanced, &[(&ska, 0)]));
    assert_eq!(app.check_tx(&tx).unwrap().code, CodeType::InvalidCoins);

    // Signed by the wrong key.
    let tx = encode(&app, &signed(send_msg(a, b, "1foocoin"), &[(&skb, 0)]));
    assert_eq!(app.check_tx(&tx).unwrap().code, CodeType::InvalidSignature);

    // No signatures at all.
    let tx = encode(&app, &Tx::new(send_msg(a, b, "1foocoin"), StdFee::zero()));
    assert_eq!(app.check_tx(&tx).unwrap().code, CodeType::Unauthorized);

    // Not a transaction.
    assert_eq!(app.check_tx(b"\x01garbage").unwrap().code, CodeType::DecodeError);

    // A message tag nobody registered.
    let res = app.check_tx(&[0x7e, 0, 0, 0, 0]).unwrap();
    assert_eq!(res.code, CodeType::DecodeError);
    assert!(res.log.contains("unknown message kind"), "{}", res.log);
}

// ── Test: fees ──

#[test]
fn test_fee_moves_to_pool() {
    let (a, ska) = alice();
    let (b, _) = bob();
    let mut app = committed_app(&[(a, "100foocoin")]);

    let tx = Tx::new(send_msg(a, b, "10foocoin"), StdFee::new(coins("2foocoin"), 0))
        .sign(CHAIN_ID, &[(&ska, 0)]);
    let bytes = encode(&app, &tx);
    let res = run_block(&mut app, &[bytes]);
    assert!(res[0].is_ok(), "{:?}", res[0]);
    assert_eq!(balance(&app, a), coins("88foocoin"));
    assert_eq!(app.query_fee_pool().unwrap(), coins("2foocoin"));

    // Fee the payer cannot cover rejects the whole tx.
    let tx = Tx::new(send_msg(a, b, "80foocoin"), StdFee::new(coins("9foocoin"), 0))
        .sign(CHAIN_ID, &[(&ska, 1)]);
    let bytes = encode(&app, &tx);
    let res = run_block(&mut app, &[bytes]);
    assert_eq!(res[0].code, CodeType::InsufficientFunds);
    assert_eq!(balance(&app, a), coins("88foocoin"));
    assert_eq!(app.query_fee_pool().unwrap(), coins("2foocoin"));
}

// ── Test: multi-signer send ──

#[test]
fn test_multi_input_send() {
    let (a, ska) = alice();
    let (b, skb) = bob();
    let (c, _) = charlie();
    let mut app = committed_app(&[(a, "10foocoin"), (b, "10foocoin,5barcoin")]);

    let msg = Msg::Send(SendMsg::new(
        vec![Input::new(a, coins("4foocoin")), Input::new(b, coins("5barcoin,1foocoin"))],
        vec![Output::new(c, coins("5barcoin,5foocoin"))],
    ));
    let bytes = encode(&app, &signed(msg, &[(&ska, 0), (&skb, 0)]));
    let res = run_block(&mut app, &[bytes]);
    assert!(res[0].is_ok(), "{:?}", res[0]);
    assert_eq!(balance(&app, a), coins("6foocoin"));
    assert_eq!(balance(&app, b), coins("9foocoin"));
    assert_eq!(balance(&app, c), coins("5barcoin,5foocoin"));
}

// ── Test: check_tx does not touch committed state ──

#[test]
fn test_check_tx_isolated_from_deliver() {
    let (a, ska) = alice();
    let (b, _) = bob();
    let mut app = committed_app(&[(a, "77foocoin")]);

    let tx = encode(&app, &signed(send_msg(a, b, "10foocoin"), &[(&ska, 0)]));
    assert!(app.check_tx(&tx).unwrap().is_ok());
    assert_eq!(balance(&app, a), coins("77foocoin"));

    // The block still accepts it: check state is separate from deliver state.
    let res = run_block(&mut app, &[tx]);
    assert!(res[0].is_ok());
}

// ── Test: determinism ──

#[test]
fn test_identical_histories_identical_hashes() {
    let (a, ska) = alice();
    let (b, _) = bob();

    let mut hashes = Vec::new();
    for _ in 0..2 {
        let mut app = committed_app(&[(a, "77foocoin")]);
        let tx = encode(&app, &signed(send_msg(a, b, "10foocoin"), &[(&ska, 0)]));
        run_block(&mut app, &[tx]);
        hashes.push(app.last_app_hash());
    }
    assert_eq!(hashes[0], hashes[1]);
    assert_ne!(hashes[0], ZERO_HASH);
}

#[test]
fn test_genesis_from_config_chain() {
    let (a, _) = alice();
    let config = AppConfig::for_chain("keel-other");
    let mut app = init_app_with_config(config, &[(a, "1foocoin")]);
    assert!(app.begin_block(header(1)).is_err());
    let mut hdr = header(1);
    hdr.chain_id = "keel-other".into();
    app.begin_block(hdr).unwrap();
    assert_eq!(app.commit().unwrap().height, 1);
    assert_eq!(balance(&app, a), Coins::single("foocoin", 1));
}

// ── Test: genesis supply must fit in u64 ──

#[test]
fn test_genesis_supply_overflow_rejected() {
    let (a, _) = alice();
    let (b, _) = bob();
    let max = format!("{}foocoin", u64::MAX);
    let mut app = keel_engine::App::<keel_primitives::AppAccount>::new(AppConfig::default()).unwrap();
    let err = app.init_chain(&genesis_json(&[(a, &max), (b, &max)])).unwrap_err();
    assert!(matches!(err, keel_engine::AppError::Genesis(_)), "{:?}", err);

    // Nothing was imported; a sane genesis is still accepted.
    app.init_chain(&genesis_json(&[(a, &max)])).unwrap();
    app.commit().unwrap();
    assert_eq!(balance(&app, a), Coins::single("foocoin", u64::MAX));
}

// ── Test: explicit zero-amount fee ──

#[test]
fn test_zero_amount_fee_accepted() {
    let (a, ska) = alice();
    let (b, _) = bob();
    let mut app = committed_app(&[(a, "77foocoin")]);

    let fee = StdFee::new(Coins::from_vec(vec![keel_primitives::Coin::new("foocoin", 0)]), 0);
    let tx = Tx::new(send_msg(a, b, "10foocoin"), fee).sign(CHAIN_ID, &[(&ska, 0)]);
    let bytes = encode(&app, &tx);
    let res = run_block(&mut app, &[bytes]);
    assert!(res[0].is_ok(), "{:?}", res[0]);
    assert_eq!(balance(&app, a), coins("67foocoin"));
    assert_eq!(app.query_fee_pool().unwrap(), Coins::empty());
}
