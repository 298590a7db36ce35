use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use honeyledger::clock::{Clock, SystemClock};
use honeyledger::{api, config, crypto, metrics, storage, Node, Wallet};

#[derive(Parser)]
#[command(author, version, about = "honeyledger node: signed in-memory ledger with periodic blocks")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the node (default)
    Serve,
    /// Generate a fresh ed25519 keypair and print it with its wallet address
    Keygen,
    /// Print the wallet address for a base64 public key
    Address {
        #[arg(long)]
        public_key: String,
    },
    /// Print a signed mint request body
    SignMint {
        #[arg(long)]
        secret: String,
        #[arg(long)]
        nonce: u64,
        /// Must match the node's configured mint amount
        #[arg(long, default_value_t = 100)]
        amount: u64,
        /// Milliseconds; defaults to now
        #[arg(long)]
        timestamp: Option<u64>,
    },
    /// Print a signed send request body
    SignSend {
        #[arg(long)]
        secret: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        nonce: u64,
        #[arg(long)]
        timestamp: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.cmd.unwrap_or(Cmd::Serve) {
        Cmd::Serve => serve(&cli.config).await,
        Cmd::Keygen => {
            let wallet = Wallet::generate();
            print_json(&serde_json::json!({
                "wallet": wallet.address(),
                "publicKey": wallet.public_key_b64(),
                "secret": wallet.secret_b64(),
            }))
        }
        Cmd::Address { public_key } => {
            let key = crypto::decode_public_key(&public_key)
                .context("public key must be base64 of a valid 32-byte ed25519 key")?;
            println!("{}", crypto::wallet_from_pk(key.as_bytes()));
            Ok(())
        }
        Cmd::SignMint { secret, nonce, amount, timestamp } => {
            let wallet = Wallet::from_secret_b64(&secret)?;
            let ts = timestamp.unwrap_or_else(|| SystemClock.now_ms());
            print_json(&wallet.mint_request(amount, nonce, ts))
        }
        Cmd::SignSend { secret, to, amount, nonce, timestamp } => {
            let wallet = Wallet::from_secret_b64(&secret)?;
            let ts = timestamp.unwrap_or_else(|| SystemClock.now_ms());
            print_json(&wallet.send_request(&to, amount, nonce, ts))
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<config::Config> {
    match config::load(path) {
        Ok(c) => Ok(c),
        Err(e) => {
            tracing::warn!("⚠️  Could not read config from '{}': {:#}; using built-in defaults", path, e);
            const EMBEDDED_CONFIG: &str = include_str!("../config.toml");
            config::load_from_str(EMBEDDED_CONFIG)
        }
    }
}

async fn serve(config_path: &str) -> anyhow::Result<()> {
    tracing::info!("--- honeyledger node ---");
    let cfg = load_config(config_path)?;
    let node = Arc::new(Node::new(&cfg)?);

    let snapshot_path = cfg.storage.snapshot_path.as_ref().map(PathBuf::from);
    if let Some(path) = &snapshot_path {
        match storage::load(path)? {
            Some(snapshot) => node.restore(snapshot),
            None => tracing::info!("🗄️  No snapshot at '{}', starting empty", path.display()),
        }
    }

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let producer = node.spawn_producer(shutdown_tx.subscribe());

    if cfg.metrics.enabled {
        metrics::serve(cfg.metrics.clone(), node.metrics().clone())?;
        tracing::info!("📊 Metrics available on http://{}", cfg.metrics.bind);
    }
    let api_server = api::serve(&cfg.api.bind, node.clone(), tokio::runtime::Handle::current())?;

    tracing::info!("🚀 honeyledger node is running!");
    tracing::info!(
        "   🪙 Mint {} every {}s, blocks every {}ms (max {} tx, keep {})",
        cfg.ledger.mint_amount,
        cfg.ledger.mint_cooldown_ms / 1000,
        cfg.block.interval_ms,
        cfg.block.max_txs_per_block,
        cfg.block.max_retained_blocks
    );
    tracing::info!("   Press Ctrl+C to stop");

    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("Error waiting for shutdown signal: {}", err);
    }
    tracing::info!("🛑 Shutdown signal received, cleaning up...");
    let _ = shutdown_tx.send(());
    api_server.shutdown();
    if let Err(e) = producer.await {
        tracing::warn!("Block producer ended abnormally: {}", e);
    }

    if let Some(path) = &snapshot_path {
        storage::save(path, &node.snapshot())
            .with_context(|| format!("Failed to save snapshot to '{}'", path.display()))?;
        tracing::info!("💾 Snapshot written to '{}'", path.display());
    }
    tracing::info!("👋 honeyledger node stopped");
    Ok(())
}
