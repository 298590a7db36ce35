//! JSON over HTTP. `route` is a pure function of the node and the request so
//! it can be driven directly in tests; `serve` wires it to a tiny_http socket.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::crypto;
use crate::error::LedgerError;
use crate::ledger::{MintRequest, SendRequest};
use crate::node::Node;

const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
    /// Seconds, sent as `Retry-After` on rate-limited requests.
    pub retry_after: Option<u64>,
}

impl ApiResponse {
    fn ok<T: serde::Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status: 200, body, retry_after: None },
            Err(e) => Self::from_error(&LedgerError::Internal(format!("encode response: {e}"))),
        }
    }

    fn not_found(what: &str) -> Self {
        Self {
            status: 404,
            body: json!({ "error": "not_found", "message": format!("{what} not found") }),
            retry_after: None,
        }
    }

    pub fn from_error(err: &LedgerError) -> Self {
        let mut body = json!({ "error": err.kind(), "message": err.to_string() });
        let mut retry_after = None;
        let status = match err {
            LedgerError::Input(_) => 400,
            LedgerError::Auth(_) => 401,
            LedgerError::InsufficientFunds { balance, requested } => {
                body["balance"] = json!(balance);
                body["requested"] = json!(requested);
                402
            }
            LedgerError::Conflict { expected, got } => {
                body["expectedNonce"] = json!(expected);
                body["gotNonce"] = json!(got);
                409
            }
            LedgerError::RateLimit { cooldown_seconds } => {
                body["cooldownSeconds"] = json!(cooldown_seconds);
                retry_after = Some(*cooldown_seconds);
                429
            }
            LedgerError::Internal(_) => 500,
        };
        Self { status, body, retry_after }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    public_key: String,
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, LedgerError> {
    serde_json::from_slice(body).map_err(|e| LedgerError::input(format!("malformed request body: {e}")))
}

fn wallet_param(raw: &str) -> Result<&str, LedgerError> {
    if crypto::is_wallet_address(raw) {
        Ok(raw)
    } else {
        Err(LedgerError::input(format!("'{raw}' is not a wallet address")))
    }
}

fn limit_param(query: Option<&str>) -> Result<Option<usize>, LedgerError> {
    let Some(query) = query else { return Ok(None) };
    for pair in query.split('&') {
        if let Some(value) = pair.strip_prefix("limit=") {
            return value
                .parse::<usize>()
                .map(Some)
                .map_err(|_| LedgerError::input("limit must be a non-negative integer"));
        }
    }
    Ok(None)
}

/// Dispatches one request. Never panics on client input.
pub fn route(node: &Node, method: &str, url: &str, body: &[u8]) -> ApiResponse {
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (url, None),
    };
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    let result: Result<ApiResponse, LedgerError> = match (method, segments.as_slice()) {
        ("POST", ["register"]) => parse_body::<RegisterRequest>(body)
            .and_then(|req| node.register(&req.public_key))
            .map(|reg| ApiResponse::ok(&reg)),
        ("POST", ["mint"]) => parse_body::<MintRequest>(body)
            .and_then(|req| node.mint(&req))
            .map(|receipt| ApiResponse::ok(&receipt)),
        ("POST", ["send"]) => parse_body::<SendRequest>(body)
            .and_then(|req| node.send(&req))
            .map(|receipt| ApiResponse::ok(&receipt)),
        ("GET", ["account", wallet]) => wallet_param(wallet).map(|w| ApiResponse::ok(&node.account(w))),
        ("GET", ["balance", wallet]) => wallet_param(wallet)
            .map(|w| ApiResponse::ok(&json!({ "wallet": w, "balance": node.balance(w) }))),
        ("GET", ["transactions", wallet]) => {
            wallet_param(wallet).map(|w| ApiResponse::ok(&node.list_transactions(w)))
        }
        ("GET", ["tx", id]) => Ok(match node.transaction(id) {
            Some(tx) => ApiResponse::ok(&tx),
            None => ApiResponse::not_found("transaction"),
        }),
        ("GET", ["status"]) => Ok(ApiResponse::ok(&node.status())),
        ("GET", ["blocks"]) => limit_param(query).map(|limit| ApiResponse::ok(&node.list_blocks(limit))),
        ("GET", ["block", height]) => match height.parse::<u64>() {
            Ok(h) => Ok(match node.block(h) {
                Some(block) => ApiResponse::ok(&block),
                None => ApiResponse::not_found("block"),
            }),
            Err(_) => Err(LedgerError::input("block height must be an integer")),
        },
        _ => Ok(ApiResponse::not_found("route")),
    };

    result.unwrap_or_else(|e| ApiResponse::from_error(&e))
}

pub struct ApiServer {
    server: Arc<tiny_http::Server>,
    thread: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Stops accepting connections and waits for the accept loop to exit.
    pub fn shutdown(mut self) {
        self.server.unblock();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Binds `bind` and hands each request to the tokio blocking pool.
pub fn serve(bind: &str, node: Arc<Node>, runtime: tokio::runtime::Handle) -> Result<ApiServer> {
    let server = Arc::new(
        tiny_http::Server::http(bind).map_err(|e| anyhow::anyhow!("🔥 Could not start API server on {}: {}", bind, e))?,
    );
    tracing::info!("🌐 API listening on http://{}", bind);

    let accept = server.clone();
    let thread = thread::Builder::new().name("api".into()).spawn(move || {
        for request in accept.incoming_requests() {
            let node = node.clone();
            runtime.spawn_blocking(move || handle(&node, request));
        }
    })?;

    Ok(ApiServer { server, thread: Some(thread) })
}

fn handle(node: &Node, mut request: tiny_http::Request) {
    let mut body = Vec::new();
    let read = request.as_reader().take(MAX_BODY_BYTES + 1).read_to_end(&mut body);
    let response = match read {
        Ok(n) if n as u64 > MAX_BODY_BYTES => ApiResponse {
            status: 413,
            body: json!({ "error": "input_error", "message": "request body too large" }),
            retry_after: None,
        },
        Ok(_) => route(node, request.method().as_str(), request.url(), &body),
        Err(e) => ApiResponse::from_error(&LedgerError::input(format!("could not read body: {e}"))),
    };

    let mut reply = tiny_http::Response::from_string(response.body.to_string()).with_status_code(response.status);
    if let Ok(header) = "Content-Type: application/json".parse::<tiny_http::Header>() {
        reply = reply.with_header(header);
    }
    if let Some(secs) = response.retry_after {
        if let Ok(header) = format!("Retry-After: {secs}").parse::<tiny_http::Header>() {
            reply = reply.with_header(header);
        }
    }
    if let Err(e) = request.respond(reply) {
        tracing::debug!("⚠️  Could not write response: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn node() -> Node {
        Node::new(&Config::default()).unwrap()
    }

    #[test]
    fn unknown_route_is_404() {
        let r = route(&node(), "GET", "/nope", b"");
        assert_eq!(r.status, 404);
        assert_eq!(r.body["error"], "not_found");
    }

    #[test]
    fn limit_query_is_parsed() {
        assert_eq!(limit_param(Some("limit=7")), Ok(Some(7)));
        assert_eq!(limit_param(Some("x=1&limit=3")), Ok(Some(3)));
        assert_eq!(limit_param(None), Ok(None));
        assert!(limit_param(Some("limit=-1")).is_err());
    }

    #[test]
    fn malformed_json_is_400() {
        let r = route(&node(), "POST", "/mint", b"{not json");
        assert_eq!(r.status, 400);
        assert_eq!(r.body["error"], "input_error");
    }
}
