//! FIFO of accepted transactions waiting for block inclusion.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::lock::LockOrRecover;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingTx {
    pub id: String,
    pub hash: String,
}

/// Thread-safe queue shared by the accept path (producers) and the block
/// producer (single consumer). Push and drain are each one short critical
/// section, so an entry is either drained by exactly one tick or still queued.
#[derive(Debug, Default)]
pub struct Mempool {
    queue: Mutex<VecDeque<PendingTx>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: PendingTx) {
        self.queue.lock_or_recover().push_back(entry);
    }

    /// Removes and returns up to `max` of the oldest entries.
    pub fn drain(&self, max: usize) -> Vec<PendingTx> {
        let mut queue = self.queue.lock_or_recover();
        let take = max.min(queue.len());
        queue.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock_or_recover().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.queue.lock_or_recover().clear();
    }
}
