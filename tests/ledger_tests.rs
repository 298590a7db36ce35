// Ledger accept-path tests: nonces, signatures, cooldowns and balances

mod common;

use common::{funded, node, wallet, MINT, START_MS};
use honeyledger::{LedgerError, TxStatus, TxType};

#[test]
fn test_end_to_end_register_mint_send_confirm() {
    println!("🧪 Testing register -> mint -> send -> block...");
    let (node, clock) = node();
    let alice = wallet(1);
    let bob = wallet(2);

    let reg = node.register(&alice.public_key_b64()).expect("register alice");
    assert_eq!(reg.wallet, alice.address());
    assert_eq!(reg.nonce, 0);
    node.register(&bob.public_key_b64()).expect("register bob");

    let mint = node.mint(&alice.mint_request(MINT, 0, START_MS)).expect("mint");
    assert_eq!((mint.balance, mint.nonce), (100, 1));
    assert_eq!(mint.tx.tx_type, TxType::Mint);
    assert_eq!(mint.tx.status, TxStatus::Pending);

    let send = node.send(&alice.send_request(&bob.address(), 40, 1, START_MS + 1)).expect("send");
    assert_eq!((send.from_balance, send.to_balance, send.from_nonce), (60, 40, 2));
    assert_eq!(node.balance(&alice.address()), 60);
    assert_eq!(node.balance(&bob.address()), 40);

    clock.advance(5_000);
    let block = node.produce_block();
    assert_eq!(block.height, 1);
    assert_eq!(block.tx_ids, vec![mint.tx.id.clone(), send.tx.id.clone()]);

    let mint_tx = node.transaction(&mint.tx.id).expect("mint tx logged");
    let send_tx = node.transaction(&send.tx.id).expect("send tx logged");
    for tx in [&mint_tx, &send_tx] {
        assert_eq!(tx.status, TxStatus::Confirmed);
        assert_eq!(tx.block_height, Some(1));
        assert_eq!(tx.block_hash.as_deref(), Some(block.hash.as_str()));
    }

    let history = node.list_transactions(&alice.address());
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, send.tx.id, "newest first");
    assert_eq!(node.list_transactions(&bob.address()).len(), 1);
    println!("✅ End-to-end flow confirmed in block #1");
}

#[test]
fn test_out_of_order_and_replayed_nonces_conflict() {
    let (node, _) = node();
    let alice = wallet(1);
    let bob = wallet(2);
    let next = funded(&node, &alice);
    assert_eq!(next, 1);

    let first = alice.send_request(&bob.address(), 10, 1, START_MS);
    node.send(&first).expect("nonce 1 accepted");

    let ahead = alice.send_request(&bob.address(), 10, 5, START_MS);
    assert_eq!(node.send(&ahead), Err(LedgerError::Conflict { expected: 2, got: 5 }));

    // Same signed bytes submitted twice.
    assert_eq!(node.send(&first), Err(LedgerError::Conflict { expected: 2, got: 1 }));

    assert_eq!(node.balance(&alice.address()), 90);
    assert_eq!(node.balance(&bob.address()), 10);
    assert_eq!(node.account(&alice.address()).nonce, 2);
}

#[test]
fn test_sends_conserve_supply_and_mints_add_exactly_the_mint_amount() {
    let (node, clock) = node();
    let wallets: Vec<_> = (1..=4).map(wallet).collect();
    for w in &wallets {
        funded(&node, w);
    }
    assert_eq!(node.total_supply(), 400);

    let mut nonces = vec![1u64; wallets.len()];
    for round in 0..5u64 {
        for (i, w) in wallets.iter().enumerate() {
            let to = wallets[(i + 1) % wallets.len()].address();
            node.send(&w.send_request(&to, 3 + round, nonces[i], START_MS + round))
                .expect("ring send");
            nonces[i] += 1;
        }
        assert_eq!(node.total_supply(), 400);
    }

    clock.advance(60_000);
    node.mint(&wallets[0].mint_request(MINT, nonces[0], START_MS + 60_000)).expect("second mint");
    assert_eq!(node.total_supply(), 500);
}

#[test]
fn test_register_is_idempotent() {
    let (node, _) = node();
    let alice = wallet(7);
    let first = node.register(&alice.public_key_b64()).expect("register");
    node.mint(&alice.mint_request(MINT, 0, START_MS)).expect("mint");

    let again = node.register(&alice.public_key_b64()).expect("re-register");
    assert_eq!(again.wallet, first.wallet);
    assert_eq!(again.nonce, 1);
    assert_eq!(node.balance(&alice.address()), 100);
}

#[test]
fn test_register_rejects_malformed_keys() {
    let (node, _) = node();
    for bad in ["", "not base64!!", "AAAA"] {
        assert!(matches!(node.register(bad), Err(LedgerError::Input(_))), "key {bad:?}");
    }
}

#[test]
fn test_mint_cooldown_window() {
    println!("🧪 Testing mint cooldown...");
    let (node, clock) = node();
    let alice = wallet(3);
    let next = funded(&node, &alice);

    clock.advance(30_000);
    let early = node.mint(&alice.mint_request(MINT, next, START_MS + 30_000));
    assert_eq!(early, Err(LedgerError::RateLimit { cooldown_seconds: 30 }));
    assert_eq!(node.balance(&alice.address()), 100);
    assert_eq!(node.account(&alice.address()).nonce, next, "rejected mint consumes no nonce");

    clock.advance(30_000);
    let later = node.mint(&alice.mint_request(MINT, next, START_MS + 60_000)).expect("cooldown elapsed");
    assert_eq!(later.balance, 200);
}

#[test]
fn test_insufficient_funds_leaves_state_untouched() {
    let (node, _) = node();
    let alice = wallet(1);
    let bob = wallet(2);
    funded(&node, &alice);

    let res = node.send(&alice.send_request(&bob.address(), 101, 1, START_MS));
    assert_eq!(res, Err(LedgerError::InsufficientFunds { balance: 100, requested: 101 }));
    assert_eq!(node.account(&alice.address()).nonce, 1);
    assert_eq!(node.balance(&bob.address()), 0);
    assert_eq!(node.mempool_len(), 1, "only the mint is pending");

    // Spending the whole balance is fine.
    node.send(&alice.send_request(&bob.address(), 100, 1, START_MS)).expect("exact balance");
    assert_eq!(node.balance(&alice.address()), 0);
}

#[test]
fn test_signature_failures_are_auth_errors() {
    let (node, _) = node();
    let alice = wallet(1);
    let mallory = wallet(66);
    let bob = wallet(2);

    // Unregistered wallet: nonce 0 matches, signature check finds no key.
    let unregistered = node.mint(&alice.mint_request(MINT, 0, START_MS));
    assert!(matches!(unregistered, Err(LedgerError::Auth(_))));

    funded(&node, &alice);

    // Signed by the wrong key.
    let mut forged = mallory.send_request(&bob.address(), 10, 1, START_MS);
    forged.from = alice.address();
    assert!(matches!(node.send(&forged), Err(LedgerError::Auth(_))));

    // Amount altered after signing.
    let mut tampered = alice.send_request(&bob.address(), 10, 1, START_MS);
    tampered.amount = 90;
    assert!(matches!(node.send(&tampered), Err(LedgerError::Auth(_))));

    // Timestamp is part of the signed message too.
    let mut shifted = alice.send_request(&bob.address(), 10, 1, START_MS);
    shifted.timestamp += 1;
    assert!(matches!(node.send(&shifted), Err(LedgerError::Auth(_))));

    let mut unsigned = alice.send_request(&bob.address(), 10, 1, START_MS);
    unsigned.signature.clear();
    assert!(matches!(node.send(&unsigned), Err(LedgerError::Auth(_))));

    assert_eq!(node.account(&alice.address()).nonce, 1);
    assert_eq!(node.balance(&alice.address()), 100);
}

#[test]
fn test_send_to_unregistered_wallet_credits_keyless_account() {
    let (node, _) = node();
    let alice = wallet(1);
    let carol = wallet(3);
    funded(&node, &alice);

    node.send(&alice.send_request(&carol.address(), 25, 1, START_MS)).expect("send");
    let view = node.account(&carol.address());
    assert_eq!((view.balance, view.nonce, view.registered), (25, 0, false));

    // Funds received before registration can be spent once the key is known.
    node.register(&carol.public_key_b64()).expect("register carol");
    assert!(node.account(&carol.address()).registered);
    node.send(&carol.send_request(&alice.address(), 25, 0, START_MS)).expect("carol spends");
    assert_eq!(node.balance(&alice.address()), 100);
}

#[test]
fn test_unknown_account_reads_as_empty() {
    let (node, _) = node();
    let ghost = wallet(99).address();
    let view = node.account(&ghost);
    assert_eq!((view.balance, view.nonce, view.registered), (0, 0, false));
    assert!(node.list_transactions(&ghost).is_empty());
    assert_eq!(node.account(&ghost), view, "reads create nothing");
}
