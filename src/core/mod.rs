//! The run orchestrator.
//!
//! The [`Orchestrator`] owns one run: it builds the shared [`RunContext`],
//! spawns producers and consumers, and signals them to stop.

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{SeenTracker, SharedLedger};
use crate::report::{ActivitySink, StdoutSink};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod context;
pub mod worker;

pub use context::{RunContext, ShutdownSignal, SleepOutcome};
pub use worker::{
    ConsumerWorker, ProduceStep, ProducerWorker, WorkerExit, WorkerManager, WorkerStats,
};

/// Lifecycle of a run. A run is started at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Stopped,
}

/// Drives one bounded producer/consumer run.
///
/// # Examples
///
/// ```rust,no_run
/// use ledgerq::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> LedgerResult<()> {
///     let orchestrator = Orchestrator::new(LedgerConfig::default())?;
///     orchestrator.start().await?;
///     orchestrator.wait_for_production_limit().await;
///     let stats = orchestrator.shutdown().await?;
///     println!("produced {} tasks", stats.produced);
///     Ok(())
/// }
/// ```
pub struct Orchestrator {
    config: LedgerConfig,
    context: Arc<RunContext>,
    workers: WorkerManager,
    state: Arc<RwLock<RunState>>,
    span: tracing::Span,
}

impl Orchestrator {
    /// Create an orchestrator that prints report lines to standard output.
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        Self::with_sink(config, Arc::new(StdoutSink))
    }

    /// Create an orchestrator with a custom report destination.
    pub fn with_sink(config: LedgerConfig, sink: Arc<dyn ActivitySink>) -> LedgerResult<Self> {
        config.validate().map_err(LedgerError::invalid)?;

        let run_id = uuid::Uuid::new_v4();
        let context = Arc::new(RunContext::new(config.run.production_limit, sink));

        Ok(Self {
            config,
            context,
            workers: WorkerManager::new(),
            state: Arc::new(RwLock::new(RunState::Idle)),
            span: tracing::info_span!("run", run_id = %run_id),
        })
    }

    /// Spawn the configured number of producers and consumers.
    pub async fn start(&self) -> LedgerResult<()> {
        {
            let mut state = self.state.write().await;
            if *state != RunState::Idle {
                return Err(LedgerError::AlreadyRunning);
            }
            *state = RunState::Running;
        }

        self.span.in_scope(|| {
            tracing::info!(
                "Starting run: {} producers, {} consumers, limit {}",
                self.config.producers.count,
                self.config.consumers.count,
                self.config.run.production_limit
            )
        });

        self.spawn_producers(self.config.producers.count).await;
        self.spawn_consumers(self.config.consumers.count).await;
        Ok(())
    }

    /// Start `n` more producers immediately.
    pub async fn spawn_producers(&self, n: usize) -> Vec<String> {
        self.mark_running().await;
        let mut names = Vec::with_capacity(n);
        for _ in 0..n {
            let name = self
                .workers
                .spawn_producer(
                    Arc::clone(&self.context),
                    self.config.producers.interval(),
                    self.span.clone(),
                )
                .await;
            names.push(name);
        }
        names
    }

    /// Start `m` more consumers immediately.
    pub async fn spawn_consumers(&self, m: usize) -> Vec<String> {
        self.mark_running().await;
        let mut names = Vec::with_capacity(m);
        for _ in 0..m {
            let name = self
                .workers
                .spawn_consumer(
                    Arc::clone(&self.context),
                    self.config.consumers.interval(),
                    self.span.clone(),
                )
                .await;
            names.push(name);
        }
        names
    }

    async fn mark_running(&self) {
        let mut state = self.state.write().await;
        if *state == RunState::Idle {
            *state = RunState::Running;
        }
    }

    /// Raise every worker's stop flag without waiting.
    ///
    /// Workers notice at the top of their next iteration, after finishing
    /// any critical section they are in.
    pub fn request_shutdown(&self) {
        if !self.context.shutdown.is_requested() {
            self.span.in_scope(|| tracing::info!("Shutdown requested"));
        }
        self.context.shutdown.request();
    }

    /// Request shutdown and wait for every worker to stop.
    pub async fn shutdown(&self) -> LedgerResult<WorkerStats> {
        {
            let mut state = self.state.write().await;
            if *state != RunState::Running {
                return Err(LedgerError::NotRunning);
            }
            *state = RunState::Stopped;
        }

        self.request_shutdown();
        self.workers.join_all(self.config.shutdown_timeout()).await?;

        let stats = self.stats().await;
        self.span.in_scope(|| {
            tracing::info!(
                "Run stopped: produced {}, reported {}",
                stats.produced,
                stats.reported
            )
        });
        Ok(stats)
    }

    /// Resolve once the ledger holds the production limit, or once shutdown
    /// has been requested.
    pub async fn wait_for_production_limit(&self) {
        let limit = self.config.run.production_limit;
        let poll = self.config.producers.interval();

        while !self.context.ledger.reached(limit) {
            if self.context.shutdown.sleep(poll).await == SleepOutcome::Interrupted {
                return;
            }
        }
    }

    /// Current worker and ledger statistics.
    pub async fn stats(&self) -> WorkerStats {
        WorkerStats {
            produced: self.context.ledger.size(),
            reported: self.context.tracker.reported_count().await,
            ..self.workers.counts()
        }
    }

    /// Whether workers have been started and not yet shut down.
    pub async fn is_running(&self) -> bool {
        *self.state.read().await == RunState::Running
    }

    /// The run's ledger.
    pub fn ledger(&self) -> &SharedLedger {
        &self.context.ledger
    }

    /// The run's first-report tracker.
    pub fn tracker(&self) -> &SeenTracker {
        &self.context.tracker
    }

    /// Get the configuration used by this run.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        // Detached workers would otherwise loop until the runtime goes away.
        self.context.shutdown.request();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemorySink;
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    fn orchestrator(config: LedgerConfig) -> (Orchestrator, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let orchestrator = Orchestrator::with_sink(config, sink.clone()).unwrap();
        (orchestrator, sink)
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let mut config = LedgerConfig::testing();
        config.producers.count = 0;
        let result = Orchestrator::with_sink(config, Arc::new(MemorySink::new()));
        assert!(matches!(result, Err(LedgerError::ConfigError { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_to_limit() {
        let (orchestrator, sink) = orchestrator(LedgerConfig::testing());
        assert!(!orchestrator.is_running().await);

        orchestrator.start().await.unwrap();
        assert!(orchestrator.is_running().await);

        tokio::time::timeout(
            Duration::from_secs(5),
            orchestrator.wait_for_production_limit(),
        )
        .await
        .unwrap();

        let stats = orchestrator.shutdown().await.unwrap();
        assert_eq!(stats.produced, 20);
        assert_eq!(stats.producers_spawned, 2);
        assert_eq!(stats.consumers_spawned, 2);
        assert_eq!(stats.active_workers, 0);
        assert!(!orchestrator.is_running().await);

        let entries = orchestrator.ledger().entries().await;
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(entries, expected);

        let mut produced = sink.produced_ids().await;
        produced.sort_by_key(|id| id.parse::<usize>().unwrap());
        assert_eq!(produced, expected);

        let consumed = sink.consumed_ids().await;
        let unique: HashSet<_> = consumed.iter().cloned().collect();
        assert_eq!(unique.len(), consumed.len());
        assert_eq!(stats.reported, consumed.len());
        assert!(unique.iter().all(|id| expected.contains(id)));
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let (orchestrator, _sink) = orchestrator(LedgerConfig::testing());
        orchestrator.start().await.unwrap();
        assert!(matches!(
            orchestrator.start().await,
            Err(LedgerError::AlreadyRunning)
        ));
        orchestrator.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_without_start_fails() {
        let (orchestrator, _sink) = orchestrator(LedgerConfig::testing());
        assert!(matches!(
            orchestrator.shutdown().await,
            Err(LedgerError::NotRunning)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_interrupts_long_sleeps() {
        let mut config = LedgerConfig::testing();
        config.producers.interval_ms = 60_000;
        config.consumers.interval_ms = 60_000;
        config.run.production_limit = 1_000;
        let (orchestrator, _sink) = orchestrator(config);

        let producers = orchestrator.spawn_producers(3).await;
        let consumers = orchestrator.spawn_consumers(2).await;
        assert_eq!(producers, vec!["producer-0", "producer-1", "producer-2"]);
        assert_eq!(consumers, vec!["consumer-0", "consumer-1"]);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(orchestrator.ledger().size(), 3);

        let started = Instant::now();
        let stats = orchestrator.shutdown().await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(stats.active_workers, 0);
        assert_eq!(stats.produced, 3);
    }

    #[tokio::test]
    async fn test_request_shutdown_releases_limit_wait() {
        let mut config = LedgerConfig::testing();
        config.run.production_limit = 1_000_000;
        let (orchestrator, _sink) = orchestrator(config);

        orchestrator.request_shutdown();
        tokio::time::timeout(
            Duration::from_secs(1),
            orchestrator.wait_for_production_limit(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_independent_runs_do_not_share_state() {
        let (first, _) = orchestrator(LedgerConfig::testing());
        let (second, _) = orchestrator(LedgerConfig::testing());

        first.ledger().append_and_advance().await;
        first.tracker().mark_if_new("0").await;

        assert_eq!(first.ledger().size(), 1);
        assert_eq!(second.ledger().size(), 0);
        assert!(!second.tracker().is_reported("0").await);
    }
}
