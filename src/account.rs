//! Account registry: wallet identities derived from ed25519 public keys.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crypto;
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub wallet: String,
    /// Base64 public key; `None` for a wallet that has only received funds.
    pub public_key: Option<String>,
    pub balance: u64,
    pub nonce: u64,
    pub last_mint_time: Option<u64>,
}

impl Account {
    fn empty(wallet: &str) -> Self {
        Account {
            wallet: wallet.to_string(),
            public_key: None,
            balance: 0,
            nonce: 0,
            last_mint_time: None,
        }
    }
}

/// Read-only snapshot returned by account queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub wallet: String,
    pub balance: u64,
    pub nonce: u64,
    pub registered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub wallet: String,
    pub nonce: u64,
}

#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: HashMap<String, Account>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `public_key_b64`, returning its wallet. Repeated calls with
    /// the same key return the same wallet and leave balance and nonce intact.
    pub fn register(&mut self, public_key_b64: &str) -> LedgerResult<Registration> {
        let key = crypto::decode_public_key(public_key_b64).ok_or_else(|| {
            LedgerError::input(format!(
                "publicKey must be base64 encoding {} bytes of a valid ed25519 key",
                crypto::PUBLIC_KEY_BYTES
            ))
        })?;
        let wallet = crypto::wallet_from_pk(key.as_bytes());
        let account = self
            .accounts
            .entry(wallet.clone())
            .or_insert_with(|| Account::empty(&wallet));
        if account.public_key.is_none() {
            // Re-encode so the stored key has one canonical form.
            account.public_key = Some(crypto::encode_b64(key.as_bytes()));
            tracing::debug!("🆕 Registered wallet {}", wallet);
        }
        Ok(Registration { wallet, nonce: account.nonce })
    }

    pub fn get(&self, wallet: &str) -> Option<&Account> {
        self.accounts.get(wallet)
    }

    pub(crate) fn get_mut(&mut self, wallet: &str) -> Option<&mut Account> {
        self.accounts.get_mut(wallet)
    }

    /// Returns the account for `wallet`, creating a key-less one on first credit.
    pub(crate) fn entry(&mut self, wallet: &str) -> &mut Account {
        self.accounts
            .entry(wallet.to_string())
            .or_insert_with(|| Account::empty(wallet))
    }

    pub fn public_key(&self, wallet: &str) -> Option<&str> {
        self.accounts.get(wallet).and_then(|a| a.public_key.as_deref())
    }

    pub fn balance(&self, wallet: &str) -> u64 {
        self.accounts.get(wallet).map_or(0, |a| a.balance)
    }

    /// Nonce the next request from `wallet` must carry.
    pub fn expected_nonce(&self, wallet: &str) -> u64 {
        self.accounts.get(wallet).map_or(0, |a| a.nonce)
    }

    pub fn view(&self, wallet: &str) -> AccountView {
        match self.accounts.get(wallet) {
            Some(a) => AccountView {
                wallet: wallet.to_string(),
                balance: a.balance,
                nonce: a.nonce,
                registered: a.public_key.is_some(),
            },
            None => AccountView {
                wallet: wallet.to_string(),
                balance: 0,
                nonce: 0,
                registered: false,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn total_supply(&self) -> u128 {
        self.accounts.values().map(|a| a.balance as u128).sum()
    }

    /// Accounts sorted by wallet, for deterministic snapshots.
    pub fn to_vec(&self) -> Vec<Account> {
        let mut all: Vec<Account> = self.accounts.values().cloned().collect();
        all.sort_by(|a, b| a.wallet.cmp(&b.wallet));
        all
    }

    pub fn from_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: accounts.into_iter().map(|a| (a.wallet.clone(), a)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    #[test]
    fn register_is_idempotent_and_preserves_state() {
        let w = Wallet::from_seed([3u8; 32]);
        let mut reg = AccountRegistry::new();
        let first = reg.register(&w.public_key_b64()).unwrap();
        assert_eq!(first.wallet, w.address());
        assert_eq!(first.nonce, 0);

        let acct = reg.get_mut(&first.wallet).unwrap();
        acct.balance = 70;
        acct.nonce = 4;

        let again = reg.register(&w.public_key_b64()).unwrap();
        assert_eq!(again.wallet, first.wallet);
        assert_eq!(again.nonce, 4);
        assert_eq!(reg.balance(&first.wallet), 70);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn register_rejects_malformed_keys() {
        let mut reg = AccountRegistry::new();
        let bad_keys = vec![
            String::new(),
            "%%%".to_string(),
            crypto::encode_b64(&[1u8; 31]),
            crypto::encode_b64(&[1u8; 64]),
        ];
        for bad in &bad_keys {
            assert!(matches!(reg.register(bad), Err(LedgerError::Input(_))), "accepted {bad:?}");
        }
        assert!(reg.is_empty());
    }

    #[test]
    fn unknown_wallet_view_is_zeroed_and_unregistered() {
        let reg = AccountRegistry::new();
        let view = reg.view("HNY_nobody");
        assert_eq!((view.balance, view.nonce, view.registered), (0, 0, false));
        assert!(reg.is_empty());
    }

    #[test]
    fn registering_a_funded_keyless_wallet_keeps_its_balance() {
        let w = Wallet::from_seed([4u8; 32]);
        let mut reg = AccountRegistry::new();
        reg.entry(&w.address()).balance = 25;
        assert!(!reg.view(&w.address()).registered);

        reg.register(&w.public_key_b64()).unwrap();
        let view = reg.view(&w.address());
        assert!(view.registered);
        assert_eq!(view.balance, 25);
    }
}
