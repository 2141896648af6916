//! Task storage
//!
//! Every task sits behind its own mutex so status changes are serialized
//! per task while unrelated tasks proceed in parallel.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::types::{Message, Task, TaskState};
use crate::{Error, Result};

/// Storage seam for tasks
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Store a freshly created task
    async fn insert(&self, task: Task) -> Result<()>;

    /// Snapshot of a task
    async fn get(&self, task_id: &str) -> Result<Task>;

    /// Atomically move a task to `next`, optionally attaching a status message.
    ///
    /// Fails with [`Error::InvalidTransition`] when the current state does not
    /// allow it, which includes every transition out of a terminal state.
    async fn transition(
        &self,
        task_id: &str,
        next: TaskState,
        message: Option<Message>,
    ) -> Result<Task>;
}

/// In-memory task store
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Arc<Mutex<Task>>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Snapshot of every stored task
    pub async fn tasks(&self) -> Vec<Task> {
        let entries: Vec<Arc<Mutex<Task>>> = self.tasks.read().await.values().cloned().collect();
        let mut tasks = Vec::with_capacity(entries.len());
        for entry in entries {
            tasks.push(entry.lock().await.clone());
        }
        tasks
    }

    async fn entry(&self, task_id: &str) -> Result<Arc<Mutex<Task>>> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(Error::Other(format!("Task already exists: {}", task.id)));
        }
        tasks.insert(task.id.clone(), Arc::new(Mutex::new(task)));
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Task> {
        let entry = self.entry(task_id).await?;
        let task = entry.lock().await;
        Ok(task.clone())
    }

    async fn transition(
        &self,
        task_id: &str,
        next: TaskState,
        message: Option<Message>,
    ) -> Result<Task> {
        let entry = self.entry(task_id).await?;
        let mut task = entry.lock().await;

        let current = task.state();
        if !current.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                task_id: task_id.to_string(),
                from: current,
                to: next,
            });
        }

        let now = Utc::now();
        task.status.state = next;
        if message.is_some() {
            task.status.message = message;
        }
        task.status.timestamp = Some(now);
        task.updated_at = now;

        Ok(task.clone())
    }
}
