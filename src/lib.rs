//! # ledgerq
//!
//! A bounded producer/consumer simulation built around a small
//! synchronization kernel.
//!
//! ## Overview
//!
//! - **Producers** append monotonically numbered tasks to a shared ledger
//!   until a fixed production limit is reached.
//! - **Consumers** poll the ledger's most recent entry and report each
//!   identifier at most once.
//! - **Two lock domains**: producers serialize on the ledger's append, consumers
//!   serialize on {peek, check/mark, report}. The domains are never nested.
//! - **Cooperative shutdown**: workers poll a stop flag once per iteration
//!   and are woken early from their pause when it is raised.
//!
//! ## Quick Start
//!
//! ```rust
//! use ledgerq::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> LedgerResult<()> {
//!     let sink = Arc::new(MemorySink::new());
//!     let orchestrator = Orchestrator::with_sink(LedgerConfig::testing(), sink.clone())?;
//!
//!     orchestrator.start().await?;
//!     orchestrator.wait_for_production_limit().await;
//!     let stats = orchestrator.shutdown().await?;
//!
//!     assert_eq!(stats.produced, 20);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod ledger;
pub mod report;
pub mod task;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::core::{
        ConsumerWorker, Orchestrator, ProduceStep, ProducerWorker, RunContext, WorkerStats,
    };
    pub use crate::error::{LedgerError, LedgerResult};
    pub use crate::ledger::{SeenTracker, SharedLedger};
    pub use crate::report::{ActivitySink, MemorySink, StdoutSink};
    pub use crate::task::{TaskAction, TaskEvent, TaskId};
}

pub use crate::config::*;
pub use crate::core::Orchestrator;
pub use crate::error::{LedgerError, LedgerResult};
pub use crate::ledger::{SeenTracker, SharedLedger};
pub use crate::report::{ActivitySink, MemorySink, StdoutSink};
pub use crate::task::{TaskEvent, TaskId};
