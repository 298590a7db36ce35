#![allow(dead_code)]

use std::sync::Arc;

use honeyledger::{Config, ManualClock, Node, Wallet};

pub const START_MS: u64 = 1_700_000_000_000;
pub const MINT: u64 = 100;

pub fn node_with(cfg: &Config) -> (Arc<Node>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MS));
    let node = Node::with_clock(cfg, clock.clone()).expect("node should build from config");
    (Arc::new(node), clock)
}

pub fn node() -> (Arc<Node>, Arc<ManualClock>) {
    node_with(&Config::default())
}

pub fn wallet(seed: u8) -> Wallet {
    Wallet::from_seed([seed; 32])
}

/// Registers `w` and mints once with nonce 0. Returns the next nonce.
pub fn funded(node: &Node, w: &Wallet) -> u64 {
    node.register(&w.public_key_b64()).expect("register");
    let receipt = node.mint(&w.mint_request(MINT, 0, START_MS)).expect("first mint");
    receipt.nonce
}
