//! Where worker activity goes.
//!
//! Producers and consumers hand every [`TaskEvent`] to an [`ActivitySink`].
//! The binary prints them to standard output; tests collect them in memory.

use crate::task::{TaskAction, TaskEvent, TaskId};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Receives the report lines of a run.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    /// Record a single event.
    async fn record(&self, event: TaskEvent);
}

/// Writes one line per event to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait]
impl ActivitySink for StdoutSink {
    async fn record(&self, event: TaskEvent) {
        println!("{}", event);
    }
}

/// Keeps every event in memory, in the order recorded.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TaskEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far.
    pub async fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().await.clone()
    }

    /// Identifiers of produced tasks, in recording order.
    pub async fn produced_ids(&self) -> Vec<TaskId> {
        self.ids(TaskAction::Produced).await
    }

    /// Identifiers of consumed tasks, in recording order.
    pub async fn consumed_ids(&self) -> Vec<TaskId> {
        self.ids(TaskAction::Consumed).await
    }

    async fn ids(&self, action: TaskAction) -> Vec<TaskId> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.action == action)
            .map(|e| e.task_id.clone())
            .collect()
    }
}

#[async_trait]
impl ActivitySink for MemorySink {
    async fn record(&self, event: TaskEvent) {
        self.events.lock().await.push(event);
    }
}
