//! Immutable blocks and the bounded list of recently produced ones.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::crypto;
use crate::mempool::PendingTx;

/// `prev_hash` of the block at height 1.
pub const GENESIS_PREV_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub height: u64,
    pub hash: String,
    pub prev_hash: String,
    pub timestamp: u64,
    pub tx_count: u64,
    pub tx_root: String,
    pub tx_ids: Vec<String>,
}

impl Block {
    /// Seals `entries` (already in mempool order) on top of `prev_hash`.
    pub fn build(height: u64, prev_hash: &str, timestamp: u64, entries: &[PendingTx]) -> Block {
        let hashes: Vec<&str> = entries.iter().map(|e| e.hash.as_str()).collect();
        let tx_root = Self::compute_tx_root(&hashes);
        let header = Self::header(height, timestamp, entries.len() as u64, prev_hash);
        Block {
            height,
            hash: Self::compute_hash(&header, &tx_root),
            prev_hash: prev_hash.to_string(),
            timestamp,
            tx_count: entries.len() as u64,
            tx_root,
            tx_ids: entries.iter().map(|e| e.id.clone()).collect(),
        }
    }

    /// `sha256(join(tx_hashes, "|"))`; an empty block hashes the empty string.
    pub fn compute_tx_root<S: AsRef<str>>(tx_hashes: &[S]) -> String {
        let joined = tx_hashes.iter().map(|h| h.as_ref()).collect::<Vec<&str>>().join("|");
        crypto::sha256_hex(joined.as_bytes())
    }

    pub fn header(height: u64, timestamp: u64, tx_count: u64, prev_hash: &str) -> String {
        format!("{height}|{timestamp}|{tx_count}|{prev_hash}")
    }

    pub fn compute_hash(header: &str, tx_root: &str) -> String {
        crypto::sha256_hex(format!("{header}{tx_root}").as_bytes())
    }

    /// Recomputes root and hash from the header fields and the hashes of
    /// `tx_ids` (in order) and compares them with the stored values.
    pub fn verify<S: AsRef<str>>(&self, tx_hashes: &[S]) -> bool {
        if tx_hashes.len() != self.tx_ids.len() || self.tx_count != self.tx_ids.len() as u64 {
            return false;
        }
        let root = Self::compute_tx_root(tx_hashes);
        let header = Self::header(self.height, self.timestamp, self.tx_count, &self.prev_hash);
        root == self.tx_root && Self::compute_hash(&header, &root) == self.hash
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainSnapshot {
    pub height: u64,
    pub tip_hash: String,
    pub last_block_time: Option<u64>,
    pub blocks: Vec<Block>,
}

/// Chain tip plus the most recent blocks, newest first. Height and tip hash
/// outlive eviction, so the chain keeps extending after old blocks drop out.
#[derive(Debug)]
pub struct Chain {
    blocks: VecDeque<Block>,
    height: u64,
    tip_hash: String,
    last_block_time: Option<u64>,
    max_retained: usize,
}

impl Chain {
    pub fn new(max_retained: usize) -> Self {
        Self {
            blocks: VecDeque::new(),
            height: 0,
            tip_hash: GENESIS_PREV_HASH.to_string(),
            last_block_time: None,
            max_retained: max_retained.max(1),
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn tip_hash(&self) -> &str {
        &self.tip_hash
    }

    pub fn last_block_time(&self) -> Option<u64> {
        self.last_block_time
    }

    pub fn latest(&self) -> Option<&Block> {
        self.blocks.front()
    }

    /// Appends a block sealed on the current tip and evicts beyond the cap.
    pub fn push(&mut self, block: Block) {
        debug_assert_eq!(block.height, self.height + 1);
        debug_assert_eq!(block.prev_hash, self.tip_hash);
        self.height = block.height;
        self.tip_hash = block.hash.clone();
        self.last_block_time = Some(block.timestamp);
        self.blocks.push_front(block);
        self.blocks.truncate(self.max_retained);
    }

    pub fn recent(&self, limit: usize) -> Vec<Block> {
        self.blocks.iter().take(limit).cloned().collect()
    }

    pub fn get(&self, height: u64) -> Option<&Block> {
        let newest = self.blocks.front()?.height;
        let offset = newest.checked_sub(height)?;
        self.blocks.get(offset as usize).filter(|b| b.height == height)
    }

    pub fn retained(&self) -> usize {
        self.blocks.len()
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            height: self.height,
            tip_hash: self.tip_hash.clone(),
            last_block_time: self.last_block_time,
            blocks: self.blocks.iter().cloned().collect(),
        }
    }

    pub fn restore(snapshot: ChainSnapshot, max_retained: usize) -> Self {
        let mut chain = Self::new(max_retained);
        chain.height = snapshot.height;
        chain.tip_hash = snapshot.tip_hash;
        chain.last_block_time = snapshot.last_block_time;
        chain.blocks = snapshot.blocks.into_iter().collect();
        chain.blocks.truncate(chain.max_retained);
        chain
    }
}
