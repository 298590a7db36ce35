//! The node service: one explicit state object owning the ledger, mempool
//! and chain. Every mutation goes through the methods here.

use anyhow::Result;
use std::sync::{Arc, RwLock};

use crate::account::{AccountView, Registration};
use crate::block::Chain;
use crate::clock::{Clock, SystemClock};
use crate::config;
use crate::error::LedgerResult;
use crate::ledger::{Ledger, MintReceipt, MintRequest, SendReceipt, SendRequest};
use crate::mempool::Mempool;
use crate::metrics::Metrics;
use crate::transaction::TxType;

pub struct Node {
    pub(crate) ledger: Ledger,
    pub(crate) mempool: Mempool,
    pub(crate) chain: RwLock<Chain>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) block_cfg: config::Block,
    pub(crate) metrics: Metrics,
    /// Reference point for the first tick's countdown.
    pub(crate) started_at: u64,
}

impl Node {
    pub fn new(cfg: &config::Config) -> Result<Self> {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: &config::Config, clock: Arc<dyn Clock>) -> Result<Self> {
        cfg.validate()?;
        let started_at = clock.now_ms();
        Ok(Self {
            ledger: Ledger::new((&cfg.ledger).into(), clock.clone()),
            mempool: Mempool::new(),
            chain: RwLock::new(Chain::new(cfg.block.max_retained_blocks)),
            clock,
            block_cfg: cfg.block.clone(),
            metrics: Metrics::new()?,
            started_at,
        })
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn register(&self, public_key_b64: &str) -> LedgerResult<Registration> {
        let result = self.ledger.register(public_key_b64);
        match &result {
            Ok(reg) => {
                self.metrics.accounts.set(self.ledger.account_count() as i64);
                tracing::debug!("🔑 register -> {}", reg.wallet);
            }
            Err(e) => {
                self.metrics.rejected(e);
                tracing::debug!("⛔ register rejected: {}", e);
            }
        }
        result
    }

    pub fn account(&self, wallet: &str) -> AccountView {
        self.ledger.account(wallet)
    }

    pub fn balance(&self, wallet: &str) -> u64 {
        self.ledger.account(wallet).balance
    }

    pub fn mint(&self, req: &MintRequest) -> LedgerResult<MintReceipt> {
        let result = self.ledger.mint(req, &self.mempool);
        self.observe(TxType::Mint, &req.wallet, result.as_ref().err());
        result
    }

    pub fn send(&self, req: &SendRequest) -> LedgerResult<SendReceipt> {
        let result = self.ledger.send(req, &self.mempool);
        self.observe(TxType::Send, &req.from, result.as_ref().err());
        result
    }

    fn observe(&self, tx_type: TxType, wallet: &str, err: Option<&crate::error::LedgerError>) {
        match err {
            None => {
                self.metrics.accepted(tx_type);
                self.metrics.mempool_size.set(self.mempool.len() as i64);
                self.metrics.accounts.set(self.ledger.account_count() as i64);
            }
            Some(e) => {
                self.metrics.rejected(e);
                tracing::debug!("⛔ {} from {} rejected: {}", tx_type, wallet, e);
            }
        }
    }

    pub fn mempool_len(&self) -> usize {
        self.mempool.len()
    }

    pub fn total_supply(&self) -> u128 {
        self.ledger.total_supply()
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
