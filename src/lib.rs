// Library interface for the honeyledger node
// The binary, the integration tests and client tooling all build on this.

pub mod account;
pub mod api;
pub mod block;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod mempool;
pub mod metrics;
pub mod node;
pub mod producer;
pub mod query;
pub mod signature;
pub mod storage;
pub mod transaction;
pub mod txlog;
pub mod wallet;

pub use account::{Account, AccountView, Registration};
pub use block::{Block, Chain, GENESIS_PREV_HASH};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{LedgerError, LedgerResult};
pub use ledger::{MintReceipt, MintRequest, SendReceipt, SendRequest};
pub use node::Node;
pub use query::Status;
pub use transaction::{Transaction, TxStatus, TxType};
pub use wallet::Wallet;
