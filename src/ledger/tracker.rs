//! Deduplication of consumer reports.

use crate::task::TaskId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::RwLock;

/// Maps task identifiers to their "already reported" flag.
///
/// An identifier is present only once reported, and is never removed.
#[derive(Debug, Default)]
pub struct SeenTracker {
    reported: RwLock<HashMap<TaskId, bool>>,
}

impl SeenTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `task_id` as reported, returning `true` only for the first caller.
    ///
    /// The check and the mark happen under one write guard, so any number of
    /// racing callers with the same identifier get exactly one `true`.
    pub async fn mark_if_new(&self, task_id: &str) -> bool {
        let mut reported = self.reported.write().await;
        match reported.entry(task_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(true);
                true
            }
        }
    }

    /// Whether `task_id` has been reported.
    pub async fn is_reported(&self, task_id: &str) -> bool {
        self.reported
            .read()
            .await
            .get(task_id)
            .copied()
            .unwrap_or(false)
    }

    /// Number of identifiers reported so far.
    pub async fn reported_count(&self) -> usize {
        self.reported.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mark_is_idempotent() {
        let tracker = SeenTracker::new();

        assert!(!tracker.is_reported("0").await);
        assert!(tracker.mark_if_new("0").await);
        assert!(!tracker.mark_if_new("0").await);
        assert!(!tracker.mark_if_new("0").await);
        assert!(tracker.is_reported("0").await);
        assert_eq!(tracker.reported_count().await, 1);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let tracker = SeenTracker::new();
        assert!(tracker.mark_if_new("1").await);
        assert!(tracker.mark_if_new("2").await);
        assert!(!tracker.is_reported("3").await);
        assert_eq!(tracker.reported_count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_consumers_race_on_same_key() {
        let tracker = Arc::new(SeenTracker::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let race = |tracker: Arc<SeenTracker>, barrier: Arc<tokio::sync::Barrier>| {
            tokio::spawn(async move {
                barrier.wait().await;
                tracker.mark_if_new("7").await
            })
        };

        let first = race(Arc::clone(&tracker), Arc::clone(&barrier));
        let second = race(Arc::clone(&tracker), Arc::clone(&barrier));
        let (first, second) = (first.await.unwrap(), second.await.unwrap());

        assert!(first ^ second, "exactly one racer must win");
        assert!(tracker.is_reported("7").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_racers_single_winner_per_key() {
        let tracker = Arc::new(SeenTracker::new());
        let mut handles = Vec::new();

        for _ in 0..16 {
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                let mut wins = 0;
                for key in 0..25 {
                    if tracker.mark_if_new(&key.to_string()).await {
                        wins += 1;
                    }
                }
                wins
            }));
        }

        let total: usize = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .sum();

        assert_eq!(total, 25);
        assert_eq!(tracker.reported_count().await, 25);
    }
}
