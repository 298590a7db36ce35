//! Lock helpers shared by the ledger, mempool and chain.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Recovers the guard from a poisoned lock instead of propagating the panic.
/// Every mutation under these locks is computed before it is written, so a
/// panicking holder never leaves a half-applied transaction behind.
pub trait PoisonRecover<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T>;
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> PoisonRecover<T> for RwLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            tracing::error!("🚨 RwLock was poisoned (read), continuing with recovered state");
            poisoned.into_inner()
        })
    }

    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            tracing::error!("🚨 RwLock was poisoned (write), continuing with recovered state");
            poisoned.into_inner()
        })
    }
}

pub trait LockOrRecover<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> LockOrRecover<T> for Mutex<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|poisoned| {
            tracing::error!("🚨 Mutex was poisoned, continuing with recovered state");
            poisoned.into_inner()
        })
    }
}

const DEFAULT_STRIPES: usize = 64;

/// Striped per-wallet locks: two requests for the same wallet always map to
/// the same stripe, so they never validate against the same pre-mutation state.
/// Unrelated wallets may share a stripe, which only costs some parallelism.
pub struct WalletLocks {
    stripes: Box<[Mutex<()>]>,
}

impl WalletLocks {
    pub fn new(stripes: usize) -> Self {
        let stripes = (0..stripes.max(1)).map(|_| Mutex::new(())).collect();
        Self { stripes }
    }

    pub fn stripe_of(&self, wallet: &str) -> usize {
        let mut h = DefaultHasher::new();
        wallet.hash(&mut h);
        (h.finish() % self.stripes.len() as u64) as usize
    }

    pub fn lock(&self, wallet: &str) -> MutexGuard<'_, ()> {
        self.stripes[self.stripe_of(wallet)].lock_or_recover()
    }
}

impl Default for WalletLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}
