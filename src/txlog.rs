//! Append-only record of every accepted transaction.

use std::collections::HashMap;

use crate::transaction::Transaction;

#[derive(Debug, Default)]
pub struct TransactionLog {
    // Oldest first; queries walk it backwards to answer newest-first.
    entries: Vec<Transaction>,
    index: HashMap<String, usize>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, tx: Transaction) {
        self.index.insert(tx.id.clone(), self.entries.len());
        self.entries.push(tx);
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Marks the given transactions confirmed in block `height`. Returns how
    /// many were found; unknown ids are skipped.
    pub fn confirm(&mut self, ids: &[String], height: u64, block_hash: &str) -> usize {
        let mut confirmed = 0;
        for id in ids {
            if let Some(&i) = self.index.get(id) {
                self.entries[i].confirm(height, block_hash);
                confirmed += 1;
            }
        }
        confirmed
    }

    /// Transactions sent or received by `wallet`, newest first.
    pub fn list_by_wallet(&self, wallet: &str) -> Vec<Transaction> {
        self.entries
            .iter()
            .rev()
            .filter(|tx| tx.touches(wallet))
            .cloned()
            .collect()
    }

    pub fn hashes_for(&self, ids: &[String]) -> Option<Vec<String>> {
        ids.iter().map(|id| self.get(id).map(|tx| tx.hash.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &Transaction> {
        self.entries.iter()
    }

    pub fn from_entries(entries: Vec<Transaction>) -> Self {
        let mut log = Self::new();
        for tx in entries {
            log.append(tx);
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TxStatus, TxType};

    fn send(from: &str, to: &str, nonce: u64) -> Transaction {
        Transaction::new(TxType::Send, Some(from.into()), to.into(), 1, nonce, nonce)
    }

    #[test]
    fn list_by_wallet_is_newest_first_and_filtered() {
        let mut log = TransactionLog::new();
        log.append(Transaction::new(TxType::Mint, None, "A".into(), 100, 0, 0));
        log.append(send("A", "B", 1));
        log.append(send("C", "D", 0));
        log.append(send("B", "A", 0));

        let a = log.list_by_wallet("A");
        assert_eq!(a.len(), 3);
        assert_eq!(a[0].from.as_deref(), Some("B"));
        assert_eq!(a[2].tx_type, TxType::Mint);
        assert!(log.list_by_wallet("Z").is_empty());
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn confirm_marks_known_ids_only() {
        let mut log = TransactionLog::new();
        let tx = send("A", "B", 0);
        let id = tx.id.clone();
        log.append(tx);
        let n = log.confirm(&[id.clone(), "missing".into()], 7, "bh");
        assert_eq!(n, 1);
        let stored = log.get(&id).unwrap();
        assert_eq!(stored.status, TxStatus::Confirmed);
        assert_eq!(stored.block_height, Some(7));
        assert!(log.hashes_for(&["missing".into()]).is_none());
    }
}
