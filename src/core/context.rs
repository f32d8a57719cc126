//! State shared by every worker of a run.
//!
//! A [`RunContext`] owns the ledger, the tracker, the consumer lock domain and
//! the shutdown signal. Each run gets its own context, so several runs can
//! live side by side in one process.

use crate::ledger::{SeenTracker, SharedLedger};
use crate::report::ActivitySink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, Notify};

/// How a pause between loop iterations ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The full interval elapsed
    Elapsed,
    /// Shutdown was requested before or during the pause
    Interrupted,
}

/// Cooperative stop flag, polled once per worker loop iteration.
///
/// Requesting shutdown also wakes workers that are sleeping between
/// iterations so they can re-check the flag right away.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    requested: AtomicBool,
    wake: Notify,
}

impl ShutdownSignal {
    /// Create a signal that has not been requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the stop flag and wake every sleeping worker.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Whether shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless shutdown is requested first.
    pub async fn sleep(&self, duration: Duration) -> SleepOutcome {
        let notified = self.wake.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a request in between is not lost.
        notified.as_mut().enable();

        if self.is_requested() {
            return SleepOutcome::Interrupted;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => SleepOutcome::Elapsed,
            _ = &mut notified => SleepOutcome::Interrupted,
        }
    }
}

/// Everything the producers and consumers of one run share.
pub struct RunContext {
    /// Produced identifiers and the production counter
    pub ledger: SharedLedger,
    /// First-report tracker
    pub tracker: SeenTracker,
    /// Total number of tasks the run produces
    pub production_limit: usize,
    /// Cooperative stop flag
    pub shutdown: ShutdownSignal,
    /// Destination of produced/consumed lines
    pub sink: Arc<dyn ActivitySink>,
    /// Consumer lock domain: serializes {peek tail, check/mark, emit}
    consumer_domain: Mutex<()>,
}

impl RunContext {
    /// Create a fresh context for a run producing `production_limit` tasks.
    pub fn new(production_limit: usize, sink: Arc<dyn ActivitySink>) -> Self {
        Self {
            ledger: SharedLedger::new(),
            tracker: SeenTracker::new(),
            production_limit,
            shutdown: ShutdownSignal::new(),
            sink,
            consumer_domain: Mutex::new(()),
        }
    }

    /// Enter the consumer lock domain.
    ///
    /// Never taken together with the ledger's producer domain.
    pub async fn consumer_domain(&self) -> MutexGuard<'_, ()> {
        self.consumer_domain.lock().await
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("ledger", &self.ledger)
            .field("production_limit", &self.production_limit)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_sleep_elapses_without_request() {
        let signal = ShutdownSignal::new();
        let outcome = signal.sleep(Duration::from_millis(5)).await;
        assert_eq!(outcome, SleepOutcome::Elapsed);
        assert!(!signal.is_requested());
    }

    #[tokio::test]
    async fn test_sleep_returns_immediately_after_request() {
        let signal = ShutdownSignal::new();
        signal.request();

        let started = Instant::now();
        let outcome = signal.sleep(Duration::from_secs(30)).await;
        assert_eq!(outcome, SleepOutcome::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_interrupts_sleeper() {
        let signal = Arc::new(ShutdownSignal::new());
        let sleeper = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.sleep(Duration::from_secs(30)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let started = Instant::now();
        signal.request();

        let outcome = sleeper.await.unwrap();
        assert_eq!(outcome, SleepOutcome::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
