//! Periodic block production.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::block::Block;
use crate::lock::PoisonRecover;
use crate::node::Node;

pub struct BlockProducer {
    node: Arc<Node>,
    interval: Duration,
    shutdown_rx: broadcast::Receiver<()>,
}

impl BlockProducer {
    pub fn new(node: Arc<Node>, shutdown_rx: broadcast::Receiver<()>) -> Self {
        let interval = Duration::from_millis(node.block_cfg.interval_ms);
        Self { node, interval, shutdown_rx }
    }

    /// Start the async task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        // First tick one interval after start, not immediately.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("⛏️  Block producer started (every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    tracing::info!("🛑 Block producer shutting down at height {}", self.node.chain_height());
                    break;
                }
                _ = ticker.tick() => {
                    self.node.produce_block();
                }
            }
        }
    }
}

impl Node {
    /// One producer tick: seal up to `max_txs_per_block` pending transactions
    /// (possibly none) into the next block and mark them confirmed.
    pub fn produce_block(&self) -> Block {
        let entries = self.mempool.drain(self.block_cfg.max_txs_per_block);

        let block = {
            let mut chain = self.chain.write_or_recover();
            let block = Block::build(chain.height() + 1, chain.tip_hash(), self.clock.now_ms(), &entries);
            let confirmed = self.ledger.confirm(&block.tx_ids, block.height, &block.hash);
            if confirmed != entries.len() {
                tracing::warn!(
                    "⚠️  Block #{} confirmed {} of {} drained transactions",
                    block.height,
                    confirmed,
                    entries.len()
                );
            }
            chain.push(block.clone());
            block
        };

        self.metrics.chain_height.set(block.height as i64);
        self.metrics.mempool_size.set(self.mempool.len() as i64);
        if block.tx_count == 0 {
            tracing::debug!("📦 Block #{} sealed empty ({})", block.height, &block.hash[..12]);
        } else {
            tracing::info!("📦 Block #{} sealed with {} tx ({})", block.height, block.tx_count, &block.hash[..12]);
        }
        block
    }

    pub fn spawn_producer(self: &Arc<Self>, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        BlockProducer::new(self.clone(), shutdown_rx).spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::wallet::Wallet;

    #[test]
    fn produce_block_drains_in_fifo_order_and_links() {
        let clock = Arc::new(ManualClock::new(5_000));
        let mut cfg = Config::default();
        cfg.block.max_txs_per_block = 2;
        let node = Node::with_clock(&cfg, clock.clone()).unwrap();

        let ids: Vec<String> = (0..3u8)
            .map(|i| {
                let w = Wallet::from_seed([i + 1; 32]);
                node.register(&w.public_key_b64()).unwrap();
                node.mint(&w.mint_request(100, 0, 1)).unwrap().tx.id
            })
            .collect();

        clock.advance(5_000);
        let b1 = node.produce_block();
        assert_eq!(b1.height, 1);
        assert_eq!(b1.tx_ids, ids[..2].to_vec());
        assert_eq!(b1.timestamp, 10_000);

        let b2 = node.produce_block();
        assert_eq!(b2.prev_hash, b1.hash);
        assert_eq!(b2.tx_ids, ids[2..].to_vec());
        assert!(node.mempool.is_empty());
    }
}
