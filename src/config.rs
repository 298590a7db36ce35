use serde::Deserialize;
use std::{fs, path::Path};
use anyhow::{bail, Context, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ledger: Ledger,
    #[serde(default)]
    pub block: Block,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub storage: Storage,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Ledger {
    #[serde(default = "default_mint_amount")]
    pub mint_amount: u64,
    #[serde(default = "default_mint_cooldown_ms")]
    pub mint_cooldown_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Block {
    #[serde(default = "default_block_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_txs_per_block")]
    pub max_txs_per_block: usize,
    #[serde(default = "default_max_retained_blocks")]
    pub max_retained_blocks: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Api {
    #[serde(default = "default_api_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metrics {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Storage {
    /// Snapshot file loaded at start-up and rewritten on graceful shutdown.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

fn default_mint_amount() -> u64 { 100 }
fn default_mint_cooldown_ms() -> u64 { 60_000 }
fn default_block_interval_ms() -> u64 { 5_000 }
fn default_max_txs_per_block() -> usize { 500 }
fn default_max_retained_blocks() -> usize { 200 }
fn default_api_bind() -> String { "127.0.0.1:8080".into() }
fn default_metrics_bind() -> String { "127.0.0.1:9100".into() }
fn default_true() -> bool { true }

impl Default for Ledger {
    fn default() -> Self {
        Self { mint_amount: default_mint_amount(), mint_cooldown_ms: default_mint_cooldown_ms() }
    }
}

impl Default for Block {
    fn default() -> Self {
        Self {
            interval_ms: default_block_interval_ms(),
            max_txs_per_block: default_max_txs_per_block(),
            max_retained_blocks: default_max_retained_blocks(),
        }
    }
}

impl Default for Api {
    fn default() -> Self { Self { bind: default_api_bind() } }
}

impl Default for Metrics {
    fn default() -> Self { Self { enabled: true, bind: default_metrics_bind() } }
}

impl Config {
    /// Rejects values that would stall the producer or make minting meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.ledger.mint_amount == 0 {
            bail!("ledger.mint_amount must be greater than 0");
        }
        if self.block.interval_ms == 0 {
            bail!("block.interval_ms must be greater than 0");
        }
        if self.block.max_txs_per_block == 0 {
            bail!("block.max_txs_per_block must be greater than 0");
        }
        if self.block.max_retained_blocks == 0 {
            bail!("block.max_retained_blocks must be greater than 0");
        }
        Ok(())
    }
}

/// Read the TOML file at `p` and deserialize into `Config`.
/// *Adds context* so user errors print a friendlier message.
///
/// # Errors
/// * Returns an anyhow::Error if the file cannot be read, parsed, or fails validation.
pub fn load<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .with_context(|| format!("🗂️  couldn’t read config file {}", p.as_ref().display()))?;
    load_from_str(&text)
}

pub fn load_from_str(text: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(text)
        .with_context(|| "📝  invalid TOML in config file".to_string())?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_protocol_defaults() {
        let cfg = load_from_str("").unwrap();
        assert_eq!(cfg.ledger.mint_amount, 100);
        assert_eq!(cfg.ledger.mint_cooldown_ms, 60_000);
        assert_eq!(cfg.block.interval_ms, 5_000);
        assert_eq!(cfg.block.max_txs_per_block, 500);
        assert_eq!(cfg.block.max_retained_blocks, 200);
        assert!(cfg.storage.snapshot_path.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = load_from_str("[block]\ninterval_ms = 250\n").unwrap();
        assert_eq!(cfg.block.interval_ms, 250);
        assert_eq!(cfg.block.max_txs_per_block, 500);
        assert_eq!(cfg.api.bind, "127.0.0.1:8080");
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(load_from_str("[block]\ninterval_ms = 0\n").is_err());
    }

    #[test]
    fn bundled_config_parses() {
        let cfg = load_from_str(include_str!("../config.toml")).unwrap();
        assert!(cfg.metrics.enabled);
    }
}
