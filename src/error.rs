//! Rejection taxonomy for the accept path.
//!
//! Every variant is terminal for the request that produced it. Validation runs
//! to completion before any balance or nonce is touched, so a rejected request
//! leaves the ledger exactly as it found it.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Malformed, missing, or out-of-range request fields.
    #[error("invalid input: {0}")]
    Input(String),
    /// Unknown wallet or a signature that does not verify.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The client must resynchronise to `expected` and sign a fresh request.
    #[error("nonce mismatch: expected {expected}, got {got}")]
    Conflict { expected: u64, got: u64 },
    #[error("mint cooldown active, retry in {cooldown_seconds}s")]
    RateLimit { cooldown_seconds: u64 },
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Stable machine-readable class, used in error bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Input(_) => "input_error",
            LedgerError::Auth(_) => "auth_error",
            LedgerError::Conflict { .. } => "conflict_error",
            LedgerError::RateLimit { .. } => "rate_limit_error",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds_error",
            LedgerError::Internal(_) => "internal_error",
        }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        LedgerError::Input(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        LedgerError::Auth(msg.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
