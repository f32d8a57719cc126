//! Task identifiers and the activity events workers emit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal string form of a task's production-order number.
pub type TaskId = String;

/// What a worker did with a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskAction {
    /// A producer appended the task to the ledger
    Produced,
    /// A consumer reported the task for the first time
    Consumed,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskAction::Produced => f.write_str("Produced"),
            TaskAction::Consumed => f.write_str("Consumed"),
        }
    }
}

/// One line of run output.
///
/// Renders as `"<worker> Produced: <id>"` or `"<worker> Consumed: <id>"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskEvent {
    /// Name of the worker that emitted the event
    pub worker: String,
    /// Produced or consumed
    pub action: TaskAction,
    /// The task concerned
    pub task_id: TaskId,
}

impl TaskEvent {
    /// Event for a freshly appended task.
    pub fn produced(worker: impl Into<String>, task_id: TaskId) -> Self {
        Self {
            worker: worker.into(),
            action: TaskAction::Produced,
            task_id,
        }
    }

    /// Event for a first report of a task.
    pub fn consumed(worker: impl Into<String>, task_id: TaskId) -> Self {
        Self {
            worker: worker.into(),
            action: TaskAction::Consumed,
            task_id,
        }
    }
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.worker, self.action, self.task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_lines() {
        let produced = TaskEvent::produced("producer-0", "3".to_string());
        assert_eq!(produced.to_string(), "producer-0 Produced: 3");

        let consumed = TaskEvent::consumed("consumer-1", "3".to_string());
        assert_eq!(consumed.to_string(), "consumer-1 Consumed: 3");
    }
}
