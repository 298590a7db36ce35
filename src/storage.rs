use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::account::Account;
use crate::block::{Chain, ChainSnapshot};
use crate::lock::PoisonRecover;
use crate::mempool::PendingTx;
use crate::node::Node;
use crate::transaction::{Transaction, TxStatus};

// Snapshots are bincode, zstd-compressed. The node is in-memory; the file
// is only read at startup and written at shutdown.

pub const SNAPSHOT_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub version: u32,
    pub accounts: Vec<Account>,
    /// Oldest first. Pending entries are the mempool.
    pub transactions: Vec<Transaction>,
    pub chain: ChainSnapshot,
}

pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let raw = bincode::serialize(snapshot).with_context(|| "Failed to serialize snapshot")?;
    let packed = zstd::encode_all(&raw[..], ZSTD_LEVEL).with_context(|| "Failed to compress snapshot")?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create snapshot directory '{}'", dir.display()))?;
    }
    // Write-then-rename so a crash mid-write never leaves a torn snapshot.
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, packed).with_context(|| format!("Failed to write snapshot to '{}'", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move snapshot into '{}'", path.display()))?;
    Ok(())
}

/// Returns `Ok(None)` when no snapshot exists yet.
pub fn load(path: &Path) -> Result<Option<Snapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let packed = fs::read(path).with_context(|| format!("Failed to read snapshot '{}'", path.display()))?;
    let raw = zstd::decode_all(&packed[..]).with_context(|| format!("Snapshot '{}' is not zstd data", path.display()))?;
    let snapshot: Snapshot =
        bincode::deserialize(&raw).with_context(|| format!("Snapshot '{}' is corrupt", path.display()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        anyhow::bail!(
            "Snapshot '{}' has version {}, expected {}",
            path.display(),
            snapshot.version,
            SNAPSHOT_VERSION
        );
    }
    Ok(Some(snapshot))
}

impl Node {
    pub fn snapshot(&self) -> Snapshot {
        let chain = self.chain.read_or_recover().snapshot();
        let (accounts, transactions) = self.ledger.export();
        Snapshot { version: SNAPSHOT_VERSION, accounts, transactions, chain }
    }

    /// Replaces all state with `snapshot`. Pending transactions go back into
    /// the mempool in acceptance order.
    pub fn restore(&self, snapshot: Snapshot) {
        let pending: Vec<PendingTx> = snapshot
            .transactions
            .iter()
            .filter(|tx| tx.status == TxStatus::Pending)
            .map(|tx| PendingTx { id: tx.id.clone(), hash: tx.hash.clone() })
            .collect();

        *self.chain.write_or_recover() = Chain::restore(snapshot.chain, self.block_cfg.max_retained_blocks);
        self.ledger.import(snapshot.accounts, snapshot.transactions);
        self.mempool.clear();
        for entry in pending {
            self.mempool.push(entry);
        }

        self.metrics.chain_height.set(self.chain_height() as i64);
        self.metrics.mempool_size.set(self.mempool.len() as i64);
        self.metrics.accounts.set(self.ledger.account_count() as i64);
        tracing::info!(
            "💾 Restored snapshot: height {}, {} accounts, {} pending",
            self.chain_height(),
            self.ledger.account_count(),
            self.mempool.len()
        );
    }
}
