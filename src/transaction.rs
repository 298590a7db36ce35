use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::crypto;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Mint,
    Send,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Mint => "mint",
            TxType::Send => "send",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

/// An accepted mint or send.
///
/// Content fields (`id` through `timestamp`) are fixed at acceptance; only
/// `status`, `fail_reason`, `block_height` and `block_hash` change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub from: Option<String>,
    pub to: String,
    pub amount: u64,
    pub nonce: u64,
    pub fees: u64,
    pub status: TxStatus,
    pub fail_reason: Option<String>,
    pub block_height: Option<u64>,
    pub block_hash: Option<String>,
    /// The client-signed timestamp, in milliseconds.
    pub timestamp: u64,
}

impl Transaction {
    pub fn new(
        tx_type: TxType,
        from: Option<String>,
        to: String,
        amount: u64,
        nonce: u64,
        timestamp: u64,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        let hash = Self::content_hash(&id, tx_type, from.as_deref(), &to, amount, nonce, timestamp);
        Transaction {
            id,
            hash,
            tx_type,
            from,
            to,
            amount,
            nonce,
            fees: 0,
            status: TxStatus::Pending,
            fail_reason: None,
            block_height: None,
            block_hash: None,
            timestamp,
        }
    }

    /// SHA-256 hex over `id|type|from|to|amount|nonce|timestamp`.
    pub fn content_hash(
        id: &str,
        tx_type: TxType,
        from: Option<&str>,
        to: &str,
        amount: u64,
        nonce: u64,
        timestamp: u64,
    ) -> String {
        let material = format!(
            "{id}|{tx_type}|{}|{to}|{amount}|{nonce}|{timestamp}",
            from.unwrap_or("")
        );
        crypto::sha256_hex(material.as_bytes())
    }

    pub fn recompute_hash(&self) -> String {
        Self::content_hash(
            &self.id,
            self.tx_type,
            self.from.as_deref(),
            &self.to,
            self.amount,
            self.nonce,
            self.timestamp,
        )
    }

    pub fn confirm(&mut self, height: u64, block_hash: &str) {
        self.status = TxStatus::Confirmed;
        self.block_height = Some(height);
        self.block_hash = Some(block_hash.to_string());
    }

    pub fn touches(&self, wallet: &str) -> bool {
        self.to == wallet || self.from.as_deref() == Some(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_is_pending_with_content_hash() {
        let tx = Transaction::new(TxType::Send, Some("HNY_a".into()), "HNY_b".into(), 40, 1, 1_000);
        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.fees, 0);
        assert!(tx.block_height.is_none());
        assert_eq!(tx.hash, tx.recompute_hash());
        assert_eq!(tx.hash.len(), 64);
    }

    #[test]
    fn mint_hash_renders_missing_sender_as_empty() {
        let h = Transaction::content_hash("id-1", TxType::Mint, None, "HNY_b", 100, 0, 5);
        let expected = crypto::sha256_hex(b"id-1|mint||HNY_b|100|0|5");
        assert_eq!(h, expected);
    }

    #[test]
    fn confirm_only_touches_bookkeeping() {
        let mut tx = Transaction::new(TxType::Mint, None, "HNY_b".into(), 100, 0, 5);
        let before = tx.hash.clone();
        tx.confirm(3, "abc");
        assert_eq!(tx.status, TxStatus::Confirmed);
        assert_eq!(tx.block_height, Some(3));
        assert_eq!(tx.block_hash.as_deref(), Some("abc"));
        assert_eq!(tx.recompute_hash(), before);
    }

    #[test]
    fn json_uses_camel_case_and_type_key() {
        let tx = Transaction::new(TxType::Mint, None, "HNY_b".into(), 100, 0, 5);
        let v = serde_json::to_value(&tx).unwrap();
        assert_eq!(v["type"], "mint");
        assert_eq!(v["status"], "pending");
        assert!(v["blockHeight"].is_null());
        assert!(v.get("failReason").is_some());
    }
}
