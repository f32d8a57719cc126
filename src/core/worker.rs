//! Producer and consumer workers.
//!
//! Producers append to the ledger until the run's production limit is hit or
//! shutdown is requested. Consumers watch the ledger's tail and report each
//! identifier they see for the first time. Both check the stop flag at the
//! top of every iteration and never hold a lock while sleeping.
//!
//! Consumers look at the tail only, never at a queue head. When producers
//! outpace the consumer interval, a tail can be overwritten before anyone
//! looks at it and that identifier is never reported. Reports are at most
//! once per identifier, not exactly once.

use crate::core::context::{RunContext, SleepOutcome};
use crate::error::{LedgerError, LedgerResult};
use crate::task::{TaskEvent, TaskId};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::Instrument;

/// Why a worker loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The stop flag was observed
    ShutdownRequested,
    /// The production limit was reached (producers only)
    LimitReached,
}

/// Outcome of one producer iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProduceStep {
    /// A new task was appended
    Appended(TaskId),
    /// The ledger already holds the production limit
    LimitReached,
}

/// Appends tasks to the shared ledger.
pub struct ProducerWorker {
    name: String,
    context: Arc<RunContext>,
    interval: Duration,
}

impl ProducerWorker {
    /// Create a producer that pauses `interval` after each append.
    pub fn new(name: impl Into<String>, context: Arc<RunContext>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            context,
            interval,
        }
    }

    /// Worker name used in report lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one iteration without the trailing pause.
    ///
    /// The report line is recorded inside the producer lock domain, before
    /// the new identifier becomes visible to consumers. "Produced" lines
    /// therefore come out in production order and ahead of any matching
    /// "Consumed" line.
    pub async fn step(&self) -> ProduceStep {
        let limit = self.context.production_limit;
        let Some(slot) = self.context.ledger.reserve_within(limit).await else {
            return ProduceStep::LimitReached;
        };

        self.context
            .sink
            .record(TaskEvent::produced(&self.name, slot.task_id().clone()))
            .await;
        let task_id = slot.commit().await;

        tracing::debug!(worker = %self.name, task_id = %task_id, "Produced");
        ProduceStep::Appended(task_id)
    }

    /// Loop until the limit is reached or shutdown is requested.
    pub async fn run(self) -> WorkerExit {
        tracing::info!("Producer {} started", self.name);

        let exit = loop {
            if self.context.shutdown.is_requested() {
                break WorkerExit::ShutdownRequested;
            }

            if self.step().await == ProduceStep::LimitReached {
                break WorkerExit::LimitReached;
            }

            if self.context.shutdown.sleep(self.interval).await == SleepOutcome::Interrupted {
                tracing::debug!("Producer {} woken early, rechecking stop flag", self.name);
            }
        };

        tracing::info!("Producer {} finished: {:?}", self.name, exit);
        exit
    }
}

/// Reports the ledger's tail the first time it is seen.
pub struct ConsumerWorker {
    name: String,
    context: Arc<RunContext>,
    interval: Duration,
}

impl ConsumerWorker {
    /// Create a consumer that pauses `interval` after each inspection.
    pub fn new(name: impl Into<String>, context: Arc<RunContext>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            context,
            interval,
        }
    }

    /// Worker name used in report lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one iteration without the trailing pause.
    ///
    /// Returns the identifier this call reported, if any. Peek, check/mark
    /// and emit all happen inside the consumer lock domain.
    pub async fn step(&self) -> Option<TaskId> {
        let _domain = self.context.consumer_domain().await;

        let task_id = self.context.ledger.peek_last()?;
        if !self.context.tracker.mark_if_new(&task_id).await {
            return None;
        }

        self.context
            .sink
            .record(TaskEvent::consumed(&self.name, task_id.clone()))
            .await;
        tracing::debug!(worker = %self.name, task_id = %task_id, "Consumed");
        Some(task_id)
    }

    /// Loop until shutdown is requested.
    pub async fn run(self) -> WorkerExit {
        tracing::info!("Consumer {} started", self.name);

        loop {
            if self.context.shutdown.is_requested() {
                break;
            }

            self.step().await;

            if self.context.shutdown.sleep(self.interval).await == SleepOutcome::Interrupted {
                tracing::debug!("Consumer {} woken early, rechecking stop flag", self.name);
            }
        }

        tracing::info!("Consumer {} finished", self.name);
        WorkerExit::ShutdownRequested
    }
}

/// Statistics about a run's workers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Producers spawned so far
    pub producers_spawned: usize,
    /// Consumers spawned so far
    pub consumers_spawned: usize,
    /// Workers whose loop has not ended yet
    pub active_workers: usize,
    /// Tasks appended to the ledger
    pub produced: usize,
    /// Identifiers reported by consumers
    pub reported: usize,
}

/// Spawns workers and keeps their handles
#[derive(Clone)]
pub struct WorkerManager {
    /// Number of currently active workers
    active_workers: Arc<AtomicUsize>,
    producers_spawned: Arc<AtomicUsize>,
    consumers_spawned: Arc<AtomicUsize>,
    /// Handles to all worker tasks, with the worker name
    worker_handles: Arc<Mutex<Vec<(String, JoinHandle<WorkerExit>)>>>,
}

impl WorkerManager {
    /// Create a manager with no workers.
    pub fn new() -> Self {
        Self {
            active_workers: Arc::new(AtomicUsize::new(0)),
            producers_spawned: Arc::new(AtomicUsize::new(0)),
            consumers_spawned: Arc::new(AtomicUsize::new(0)),
            worker_handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawn a producer named `producer-<n>`.
    pub async fn spawn_producer(
        &self,
        context: Arc<RunContext>,
        interval: Duration,
        span: tracing::Span,
    ) -> String {
        let index = self.producers_spawned.fetch_add(1, Ordering::Relaxed);
        let worker = ProducerWorker::new(format!("producer-{}", index), context, interval);
        let name = worker.name().to_string();
        self.track(name.clone(), worker.run(), span).await;
        name
    }

    /// Spawn a consumer named `consumer-<n>`.
    pub async fn spawn_consumer(
        &self,
        context: Arc<RunContext>,
        interval: Duration,
        span: tracing::Span,
    ) -> String {
        let index = self.consumers_spawned.fetch_add(1, Ordering::Relaxed);
        let worker = ConsumerWorker::new(format!("consumer-{}", index), context, interval);
        let name = worker.name().to_string();
        self.track(name.clone(), worker.run(), span).await;
        name
    }

    async fn track<F>(&self, name: String, worker: F, span: tracing::Span)
    where
        F: Future<Output = WorkerExit> + Send + 'static,
    {
        let active_workers = Arc::clone(&self.active_workers);
        active_workers.fetch_add(1, Ordering::Relaxed);

        let handle = tokio::spawn(
            async move {
                let exit = worker.await;
                active_workers.fetch_sub(1, Ordering::Relaxed);
                exit
            }
            .instrument(span),
        );

        self.worker_handles.lock().await.push((name.clone(), handle));
        tracing::debug!("Spawned worker {}", name);
    }

    /// Number of workers still looping.
    pub fn active_worker_count(&self) -> usize {
        self.active_workers.load(Ordering::Relaxed)
    }

    /// Worker counts; ledger-derived fields are filled by the caller.
    pub fn counts(&self) -> WorkerStats {
        WorkerStats {
            producers_spawned: self.producers_spawned.load(Ordering::Relaxed),
            consumers_spawned: self.consumers_spawned.load(Ordering::Relaxed),
            active_workers: self.active_worker_count(),
            ..Default::default()
        }
    }

    /// Wait for every spawned worker to end.
    ///
    /// The stop flag must already be raised. Fails with
    /// [`LedgerError::Timeout`] if the workers are not done within
    /// `timeout_duration`, and with [`LedgerError::WorkerFailed`] if a worker
    /// panicked.
    pub async fn join_all(&self, timeout_duration: Duration) -> LedgerResult<Vec<WorkerExit>> {
        let handles = {
            let mut guard = self.worker_handles.lock().await;
            std::mem::take(&mut *guard)
        };

        if handles.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            "Waiting for {} workers with timeout {:?}",
            handles.len(),
            timeout_duration
        );

        let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let joined = timeout(timeout_duration, futures::future::join_all(handles))
            .await
            .map_err(|_| LedgerError::Timeout {
                timeout_secs: timeout_duration.as_secs(),
            })?;

        let mut exits = Vec::with_capacity(joined.len());
        for (name, result) in names.into_iter().zip(joined) {
            match result {
                Ok(exit) => exits.push(exit),
                Err(e) => {
                    tracing::warn!("Worker {} did not finish cleanly: {}", name, e);
                    return Err(LedgerError::WorkerFailed {
                        worker: name,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(exits)
    }
}

impl Default for WorkerManager {
    fn default() -> Self {
        Self::new()
    }
}
