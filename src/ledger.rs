//! Validation/apply state machine for mint and send requests.
//!
//! A request is RECEIVED, checked in a fixed fail-fast order (shape, nonce,
//! signature, type-specific rule) and then either APPLIED in one atomic step
//! or REJECTED with no mutation at all.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use crate::account::{Account, AccountRegistry, AccountView, Registration};
use crate::clock::Clock;
use crate::crypto;
use crate::error::{LedgerError, LedgerResult};
use crate::lock::{PoisonRecover, WalletLocks};
use crate::mempool::{Mempool, PendingTx};
use crate::signature;
use crate::transaction::{Transaction, TxType};
use crate::txlog::TransactionLog;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub wallet: String,
    pub nonce: u64,
    pub timestamp: u64,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub nonce: u64,
    pub timestamp: u64,
    pub signature: String,
}

impl MintRequest {
    fn validate(&self) -> LedgerResult<()> {
        require_wallet("wallet", &self.wallet)
    }
}

impl SendRequest {
    fn validate(&self) -> LedgerResult<()> {
        require_wallet("from", &self.from)?;
        require_wallet("to", &self.to)?;
        if self.amount == 0 {
            return Err(LedgerError::input("amount must be a positive integer"));
        }
        Ok(())
    }
}

fn require_wallet(field: &str, value: &str) -> LedgerResult<()> {
    if crypto::is_wallet_address(value) {
        Ok(())
    } else {
        Err(LedgerError::input(format!(
            "{field} must be {}<{} lowercase hex chars>",
            crypto::WALLET_PREFIX,
            crypto::WALLET_HEX_LEN
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub tx: Transaction,
    pub balance: u64,
    pub nonce: u64,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub tx: Transaction,
    pub from_balance: u64,
    pub to_balance: u64,
    pub from_nonce: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct LedgerParams {
    pub mint_amount: u64,
    pub mint_cooldown_ms: u64,
}

impl From<&crate::config::Ledger> for LedgerParams {
    fn from(cfg: &crate::config::Ledger) -> Self {
        Self { mint_amount: cfg.mint_amount, mint_cooldown_ms: cfg.mint_cooldown_ms }
    }
}

#[derive(Debug, Default)]
pub struct LedgerState {
    pub accounts: AccountRegistry,
    pub log: TransactionLog,
}

/// Authoritative balances and nonces.
///
/// Accept path locking: the wallet stripe is held for the whole
/// validate-then-apply sequence, validation runs under the shared state lock
/// and the apply under the exclusive one. Only the holder of a wallet's stripe
/// can bump its nonce or debit it, so what was validated still holds at apply
/// time; concurrent credits from other wallets can only raise the balance.
pub struct Ledger {
    state: RwLock<LedgerState>,
    locks: WalletLocks,
    params: LedgerParams,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(params: LedgerParams, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            locks: WalletLocks::default(),
            params,
            clock,
        }
    }

    pub fn params(&self) -> LedgerParams {
        self.params
    }

    pub fn register(&self, public_key_b64: &str) -> LedgerResult<Registration> {
        self.state.write_or_recover().accounts.register(public_key_b64)
    }

    pub fn account(&self, wallet: &str) -> AccountView {
        self.state.read_or_recover().accounts.view(wallet)
    }

    pub fn mint(&self, req: &MintRequest, mempool: &Mempool) -> LedgerResult<MintReceipt> {
        req.validate()?;
        let _wallet_guard = self.locks.lock(&req.wallet);
        let now = self.clock.now_ms();
        let amount = self.params.mint_amount;

        {
            let state = self.state.read_or_recover();
            let accounts = &state.accounts;
            check_nonce(accounts, &req.wallet, req.nonce)?;
            let msg = signature::canonical_message(TxType::Mint, None, &req.wallet, amount, req.nonce, req.timestamp);
            signature::verify(accounts, &req.wallet, &msg, &req.signature)?;
            if let Some(last) = accounts.get(&req.wallet).and_then(|a| a.last_mint_time) {
                let elapsed = now.saturating_sub(last);
                if elapsed < self.params.mint_cooldown_ms {
                    let remaining_ms = self.params.mint_cooldown_ms - elapsed;
                    return Err(LedgerError::RateLimit { cooldown_seconds: remaining_ms.div_ceil(1000).max(1) });
                }
            }
            accounts
                .balance(&req.wallet)
                .checked_add(amount)
                .ok_or_else(|| LedgerError::input("mint would overflow wallet balance"))?;
        }

        let mut state = self.state.write_or_recover();
        let account = state
            .accounts
            .get(&req.wallet)
            .ok_or_else(|| LedgerError::Internal(format!("validated wallet {} vanished", req.wallet)))?;
        let (balance, nonce) = match (account.balance.checked_add(amount), account.nonce.checked_add(1)) {
            (Some(b), Some(n)) => (b, n),
            _ => return Err(LedgerError::Internal("mint arithmetic overflow".into())),
        };
        let tx = Transaction::new(TxType::Mint, None, req.wallet.clone(), amount, req.nonce, req.timestamp);

        // Everything is computed; commit in one step.
        if let Some(acct) = state.accounts.get_mut(&req.wallet) {
            acct.balance = balance;
            acct.nonce = nonce;
            acct.last_mint_time = Some(now);
        }
        state.log.append(tx.clone());
        mempool.push(PendingTx { id: tx.id.clone(), hash: tx.hash.clone() });
        drop(state);

        tracing::debug!("🪙 Minted {} to {} (nonce -> {})", amount, req.wallet, nonce);
        Ok(MintReceipt {
            tx,
            balance,
            nonce,
            cooldown_seconds: self.params.mint_cooldown_ms.div_ceil(1000),
        })
    }

    pub fn send(&self, req: &SendRequest, mempool: &Mempool) -> LedgerResult<SendReceipt> {
        req.validate()?;
        let _wallet_guard = self.locks.lock(&req.from);
        let self_send = req.from == req.to;

        {
            let state = self.state.read_or_recover();
            let accounts = &state.accounts;
            check_nonce(accounts, &req.from, req.nonce)?;
            let msg = signature::canonical_message(
                TxType::Send,
                Some(&req.from),
                &req.to,
                req.amount,
                req.nonce,
                req.timestamp,
            );
            signature::verify(accounts, &req.from, &msg, &req.signature)?;
            let balance = accounts.balance(&req.from);
            if balance < req.amount {
                return Err(LedgerError::InsufficientFunds { balance, requested: req.amount });
            }
            if !self_send {
                accounts
                    .balance(&req.to)
                    .checked_add(req.amount)
                    .ok_or_else(|| LedgerError::input("amount would overflow recipient balance"))?;
            }
        }

        let mut state = self.state.write_or_recover();
        let (from_balance, from_nonce, to_balance) = plan_send(&state.accounts, req)?;
        let tx = Transaction::new(
            TxType::Send,
            Some(req.from.clone()),
            req.to.clone(),
            req.amount,
            req.nonce,
            req.timestamp,
        );

        if let Some(sender) = state.accounts.get_mut(&req.from) {
            sender.balance = from_balance;
            sender.nonce = from_nonce;
        }
        if !self_send {
            state.accounts.entry(&req.to).balance = to_balance;
        }
        state.log.append(tx.clone());
        mempool.push(PendingTx { id: tx.id.clone(), hash: tx.hash.clone() });
        drop(state);

        tracing::debug!("💸 {} -> {}: {} (nonce -> {})", req.from, req.to, req.amount, from_nonce);
        Ok(SendReceipt { tx, from_balance, to_balance, from_nonce })
    }

    /// Block bookkeeping only: balances were settled at accept time.
    pub fn confirm(&self, ids: &[String], height: u64, block_hash: &str) -> usize {
        self.state.write_or_recover().log.confirm(ids, height, block_hash)
    }

    pub fn transaction(&self, id: &str) -> Option<Transaction> {
        self.state.read_or_recover().log.get(id).cloned()
    }

    pub fn transactions_for(&self, wallet: &str) -> Vec<Transaction> {
        self.state.read_or_recover().log.list_by_wallet(wallet)
    }

    pub fn tx_hashes(&self, ids: &[String]) -> Option<Vec<String>> {
        self.state.read_or_recover().log.hashes_for(ids)
    }

    pub fn account_count(&self) -> usize {
        self.state.read_or_recover().accounts.len()
    }

    pub fn total_supply(&self) -> u128 {
        self.state.read_or_recover().accounts.total_supply()
    }

    pub(crate) fn export(&self) -> (Vec<Account>, Vec<Transaction>) {
        let state = self.state.read_or_recover();
        (state.accounts.to_vec(), state.log.iter_oldest_first().cloned().collect())
    }

    pub(crate) fn import(&self, accounts: Vec<Account>, transactions: Vec<Transaction>) {
        let mut state = self.state.write_or_recover();
        state.accounts = AccountRegistry::from_accounts(accounts);
        state.log = TransactionLog::from_entries(transactions);
    }
}

fn check_nonce(accounts: &AccountRegistry, wallet: &str, got: u64) -> LedgerResult<()> {
    let expected = accounts.expected_nonce(wallet);
    if got != expected {
        return Err(LedgerError::Conflict { expected, got });
    }
    Ok(())
}

/// Post-send `(from_balance, from_nonce, to_balance)`, computed without mutating.
fn plan_send(accounts: &AccountRegistry, req: &SendRequest) -> LedgerResult<(u64, u64, u64)> {
    let sender = accounts
        .get(&req.from)
        .ok_or_else(|| LedgerError::Internal(format!("validated wallet {} vanished", req.from)))?;
    if sender.balance < req.amount {
        return Err(LedgerError::InsufficientFunds { balance: sender.balance, requested: req.amount });
    }
    let from_nonce = sender
        .nonce
        .checked_add(1)
        .ok_or_else(|| LedgerError::Internal("nonce overflow".into()))?;
    if req.from == req.to {
        return Ok((sender.balance, from_nonce, sender.balance));
    }
    let from_balance = sender.balance - req.amount;
    let to_balance = accounts
        .balance(&req.to)
        .checked_add(req.amount)
        .ok_or_else(|| LedgerError::input("amount would overflow recipient balance"))?;
    Ok((from_balance, from_nonce, to_balance))
}
