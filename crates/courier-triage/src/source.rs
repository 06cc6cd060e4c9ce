//! The issue-tracker seam.
//!
//! The real tracker REST client lives outside this repository; the engine
//! only depends on the [`TaskSource`] capability. [`InMemoryTaskSource`]
//! backs tests and local wiring.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::TrackedTask;

/// Errors raised by triage-engine collaborators.
#[derive(Debug, Clone, Error)]
pub enum TriageError {
    /// The tracker could not be reached or rejected the request.
    #[error("task source error: {0}")]
    Source(String),

    /// A referenced task does not exist.
    #[error("task '{0}' not found")]
    TaskNotFound(String),

    /// The closure ledger failed.
    #[error("closure ledger error: {0}")]
    Ledger(String),
}

/// Fetches tasks from the issue tracker.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Returns the user's active (not yet closed) tasks.
    async fn fetch_active_tasks(&self, user_id: &str) -> Result<Vec<TrackedTask>, TriageError>;

    /// Looks up one task by key.
    async fn get_task(&self, key: &str) -> Result<Option<TrackedTask>, TriageError>;
}

/// In-memory task source for tests and local runs.
#[derive(Default)]
pub struct InMemoryTaskSource {
    tasks: RwLock<Vec<TrackedTask>>,
}

impl InMemoryTaskSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source seeded with `tasks`.
    pub fn with_tasks(tasks: Vec<TrackedTask>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
        }
    }

    /// Adds a task.
    pub async fn push(&self, task: TrackedTask) {
        self.tasks.write().await.push(task);
    }
}

#[async_trait]
impl TaskSource for InMemoryTaskSource {
    async fn fetch_active_tasks(&self, _user_id: &str) -> Result<Vec<TrackedTask>, TriageError> {
        Ok(self.tasks.read().await.clone())
    }

    async fn get_task(&self, key: &str) -> Result<Option<TrackedTask>, TriageError> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .find(|t| t.key == key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_source_round_trips() {
        let source = InMemoryTaskSource::new();
        source.push(TrackedTask::new("PROJ-1", "First")).await;

        let tasks = source.fetch_active_tasks("U1").await.unwrap();
        assert_eq!(tasks.len(), 1);

        assert!(source.get_task("PROJ-1").await.unwrap().is_some());
        assert!(source.get_task("PROJ-404").await.unwrap().is_none());
    }
}
