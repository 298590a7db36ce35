//! Canonical request encoding and detached-signature verification.
//!
//! The canonical message is the wire contract between wallets and the node:
//! `type|from|to|amount|nonce|timestamp`, with `from` empty for mints. Any
//! change to field order or rendering invalidates every signature in the wild.

use crate::account::AccountRegistry;
use crate::crypto;
use crate::error::{LedgerError, LedgerResult};
use crate::transaction::TxType;

pub fn canonical_message(
    tx_type: TxType,
    from: Option<&str>,
    to: &str,
    amount: u64,
    nonce: u64,
    timestamp: u64,
) -> String {
    format!("{tx_type}|{}|{to}|{amount}|{nonce}|{timestamp}", from.unwrap_or(""))
}

/// Verifies `signature_b64` over `message` with the key registered for
/// `wallet`. Fails closed: unknown wallet, empty or undecodable signature,
/// undecodable key and a failed check are all rejections.
pub fn verify(
    registry: &AccountRegistry,
    wallet: &str,
    message: &str,
    signature_b64: &str,
) -> LedgerResult<()> {
    let public_key = registry
        .public_key(wallet)
        .ok_or_else(|| LedgerError::auth(format!("wallet {wallet} is not registered")))?;
    if signature_b64.trim().is_empty() {
        return Err(LedgerError::auth("signature is required"));
    }
    let signature = crypto::decode_signature(signature_b64).ok_or_else(|| {
        LedgerError::auth(format!("signature must be {} bytes", crypto::SIGNATURE_BYTES))
    })?;
    let key = crypto::decode_public_key(public_key)
        .ok_or_else(|| LedgerError::auth("stored public key is unusable"))?;
    key.verify_strict(message.as_bytes(), &signature)
        .map_err(|_| LedgerError::auth("signature does not verify"))
}
