use anyhow::Result;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::thread;

use crate::error::LedgerError;
use crate::transaction::TxType;

/// Node-wide counters and gauges. Each `Node` owns its own registry so
/// several nodes can live in one process (tests do this).
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub chain_height: IntGauge,
    pub mempool_size: IntGauge,
    pub accounts: IntGauge,
    pub tx_accepted: IntCounterVec,
    pub tx_rejected: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        // Prefix metrics with `honey_` for better namespacing.
        let chain_height = IntGauge::new("honey_chain_height", "Height of the latest produced block")?;
        let mempool_size = IntGauge::new("honey_mempool_size", "Accepted transactions awaiting a block")?;
        let accounts = IntGauge::new("honey_accounts", "Known accounts, registered or funded")?;
        let tx_accepted = IntCounterVec::new(
            Opts::new("honey_tx_accepted_total", "Accepted transactions by type"),
            &["type"],
        )?;
        let tx_rejected = IntCounterVec::new(
            Opts::new("honey_tx_rejected_total", "Rejected requests by error class"),
            &["reason"],
        )?;
        registry.register(Box::new(chain_height.clone()))?;
        registry.register(Box::new(mempool_size.clone()))?;
        registry.register(Box::new(accounts.clone()))?;
        registry.register(Box::new(tx_accepted.clone()))?;
        registry.register(Box::new(tx_rejected.clone()))?;
        Ok(Self { registry, chain_height, mempool_size, accounts, tx_accepted, tx_rejected })
    }

    pub fn accepted(&self, tx_type: TxType) {
        self.tx_accepted.with_label_values(&[tx_type.as_str()]).inc();
    }

    pub fn rejected(&self, err: &LedgerError) {
        self.tx_rejected.with_label_values(&[err.kind()]).inc();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Serves the registry as Prometheus text on `bind` from a background thread.
pub fn serve(cfg: crate::config::Metrics, metrics: Metrics) -> Result<()> {
    let server = tiny_http::Server::http(&cfg.bind)
        .map_err(|e| anyhow::anyhow!("🔥 Could not start metrics server on {}: {}", cfg.bind, e))?;
    let content_type = "Content-Type: text/plain; version=0.0.4; charset=utf-8"
        .parse::<tiny_http::Header>()
        .map_err(|_| anyhow::anyhow!("invalid metrics content-type header"))?;

    thread::Builder::new().name("metrics".into()).spawn(move || {
        for request in server.incoming_requests() {
            let buffer = match metrics.encode() {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!("🔥 Could not encode metrics: {}", e);
                    continue;
                }
            };
            let response = tiny_http::Response::from_data(buffer).with_header(content_type.clone());
            let _ = request.respond(response);
        }
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let m = Metrics::new().unwrap();
        m.accepted(TxType::Mint);
        m.rejected(&LedgerError::Conflict { expected: 1, got: 2 });
        m.chain_height.set(4);
        let text = String::from_utf8(m.encode().unwrap()).unwrap();
        assert!(text.contains("honey_tx_accepted_total{type=\"mint\"} 1"));
        assert!(text.contains("honey_tx_rejected_total{reason=\"conflict_error\"} 1"));
        assert!(text.contains("honey_chain_height 4"));
    }
}
