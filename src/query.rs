//! Read-only views over the node's state.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::lock::PoisonRecover;
use crate::node::Node;
use crate::transaction::Transaction;

pub const DEFAULT_BLOCK_LIMIT: usize = 20;
pub const MAX_BLOCK_LIMIT: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub chain_height: u64,
    pub last_block_time: Option<u64>,
    pub block_interval: u64,
    pub ms_until_next_block: u64,
    pub mempool_size: usize,
    pub latest_block: Option<Block>,
}

/// Clamps a requested page size into `[1, MAX_BLOCK_LIMIT]`.
pub fn clamp_block_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_BLOCK_LIMIT).clamp(1, MAX_BLOCK_LIMIT)
}

impl Node {
    pub fn chain_height(&self) -> u64 {
        self.chain.read_or_recover().height()
    }

    pub fn status(&self) -> Status {
        let chain = self.chain.read_or_recover();
        let interval = self.block_cfg.interval_ms;
        let since = chain.last_block_time().unwrap_or(self.started_at);
        let elapsed = self.clock.now_ms().saturating_sub(since);
        Status {
            chain_height: chain.height(),
            last_block_time: chain.last_block_time(),
            block_interval: interval,
            ms_until_next_block: interval.saturating_sub(elapsed),
            mempool_size: self.mempool.len(),
            latest_block: chain.latest().cloned(),
        }
    }

    /// Most recent retained blocks, newest first.
    pub fn list_blocks(&self, limit: Option<usize>) -> Vec<Block> {
        self.chain.read_or_recover().recent(clamp_block_limit(limit))
    }

    pub fn block(&self, height: u64) -> Option<Block> {
        self.chain.read_or_recover().get(height).cloned()
    }

    /// Transactions sent or received by `wallet`, newest first.
    pub fn list_transactions(&self, wallet: &str) -> Vec<Transaction> {
        self.ledger.transactions_for(wallet)
    }

    pub fn transaction(&self, id: &str) -> Option<Transaction> {
        self.ledger.transaction(id)
    }

    /// Recomputes a retained block's root and hash from the logged
    /// transactions. `None` when the block is not retained.
    pub fn verify_block(&self, height: u64) -> Option<bool> {
        let block = self.block(height)?;
        Some(match self.ledger.tx_hashes(&block.tx_ids) {
            Some(hashes) => block.verify(&hashes),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_limit_is_clamped() {
        assert_eq!(clamp_block_limit(None), 20);
        assert_eq!(clamp_block_limit(Some(0)), 1);
        assert_eq!(clamp_block_limit(Some(5)), 5);
        assert_eq!(clamp_block_limit(Some(10_000)), 200);
    }
}
