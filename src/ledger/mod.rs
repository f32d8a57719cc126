//! The shared task ledger and the first-report tracker.
//!
//! The ledger is the single source of truth for what has been produced: an
//! append-only sequence of task identifiers plus the production counter.
//! Producers append to it under the producer lock domain; consumers only
//! ever look at its tail.
//!
//! # Examples
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use ledgerq::ledger::SharedLedger;
//!
//! let ledger = SharedLedger::new();
//! assert_eq!(ledger.peek_last(), None);
//!
//! assert_eq!(ledger.append_and_advance().await, "0");
//! assert_eq!(ledger.append_and_advance().await, "1");
//! assert_eq!(ledger.peek_last().as_deref(), Some("1"));
//! assert_eq!(ledger.size(), 2);
//! # });
//! ```

use crate::task::TaskId;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, MutexGuard, RwLock};

pub mod tracker;
pub use tracker::SeenTracker;

/// Append-only record of produced task identifiers.
#[derive(Debug, Default)]
pub struct SharedLedger {
    /// Producer lock domain: serializes {read counter, append, advance}
    producer_domain: Mutex<()>,
    /// Produced identifiers in production order
    entries: RwLock<Vec<TaskId>>,
    /// Number of entries appended so far.
    /// Only advanced after the matching entry is in `entries`.
    count: AtomicUsize,
}

impl SharedLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next task and return its identifier.
    ///
    /// Reads the counter `C`, appends `C` to the sequence and advances the
    /// counter to `C + 1`, all inside the producer lock domain.
    pub async fn append_and_advance(&self) -> TaskId {
        let domain = self.producer_domain.lock().await;
        self.slot(domain).commit().await
    }

    /// Like [`append_and_advance`](Self::append_and_advance), but only while
    /// fewer than `limit` tasks exist.
    ///
    /// The limit is checked inside the producer lock domain, so any number
    /// of racing producers stops at exactly `limit` entries.
    pub async fn append_within(&self, limit: usize) -> Option<TaskId> {
        Some(self.reserve_within(limit).await?.commit().await)
    }

    /// Enter the producer lock domain and reserve the next identifier.
    ///
    /// Returns `None` once `limit` tasks exist. The domain stays held until
    /// the slot is committed or dropped, and nothing is visible to readers
    /// before [`AppendSlot::commit`]. Dropping the slot appends nothing.
    pub async fn reserve_within(&self, limit: usize) -> Option<AppendSlot<'_>> {
        let domain = self.producer_domain.lock().await;
        if self.count.load(Ordering::Acquire) >= limit {
            return None;
        }
        Some(self.slot(domain))
    }

    fn slot<'a>(&'a self, domain: MutexGuard<'a, ()>) -> AppendSlot<'a> {
        let position = self.count.load(Ordering::Acquire);
        AppendSlot {
            ledger: self,
            task_id: position.to_string(),
            position,
            _domain: domain,
        }
    }

    /// Snapshot of the most recently appended identifier.
    ///
    /// This is not a dequeue: every caller sees the same tail until the
    /// next append. It does not take the producer lock domain, so it may
    /// race with an append in flight and return the previous tail.
    pub fn peek_last(&self) -> Option<TaskId> {
        match self.count.load(Ordering::Acquire) {
            0 => None,
            count => Some((count - 1).to_string()),
        }
    }

    /// Current value of the production counter.
    pub fn size(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Whether the production counter has reached `limit`.
    pub fn reached(&self, limit: usize) -> bool {
        self.size() >= limit
    }

    /// Copy of every identifier appended so far, in production order.
    pub async fn entries(&self) -> Vec<TaskId> {
        self.entries.read().await.clone()
    }
}

/// The next identifier, reserved inside the producer lock domain.
#[derive(Debug)]
pub struct AppendSlot<'a> {
    ledger: &'a SharedLedger,
    task_id: TaskId,
    position: usize,
    _domain: MutexGuard<'a, ()>,
}

impl AppendSlot<'_> {
    /// Identifier this slot will append.
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Append the identifier, advance the counter and leave the domain.
    pub async fn commit(self) -> TaskId {
        self.ledger.entries.write().await.push(self.task_id.clone());
        self.ledger.count.store(self.position + 1, Ordering::Release);

        tracing::trace!("Ledger advanced to {}", self.position + 1);
        self.task_id
    }
}
