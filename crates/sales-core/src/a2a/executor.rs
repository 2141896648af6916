//! Executor contract
//!
//! An executor receives the request context and an updater it uses to drive
//! the task through its states. The engine owns the task; the executor only
//! reports events.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::store::TaskStore;
use super::types::{Message, Task, TaskState};
use crate::error::ExecutorError;
use crate::Result;

/// Everything an executor learns about the request it serves
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
    pub message: Message,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        message: Message,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            message,
            cancel,
        }
    }

    /// Concatenated text of the inbound message
    pub fn user_input(&self) -> String {
        self.message.text_content()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the task has been canceled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Event sink bound to one task
#[derive(Clone)]
pub struct TaskUpdater {
    store: Arc<dyn TaskStore>,
    task_id: String,
    context_id: String,
}

impl TaskUpdater {
    pub fn new(store: Arc<dyn TaskStore>, task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            store,
            task_id: task_id.into(),
            context_id: context_id.into(),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Agent message carrying this task's ids
    pub fn agent_message(&self, text: impl Into<String>) -> Message {
        Message::agent_text(text).attached_to(&self.task_id, &self.context_id)
    }

    pub async fn start_work(&self) -> Result<Task> {
        self.update_status(TaskState::Working, None).await
    }

    pub async fn update_status(&self, state: TaskState, message: Option<Message>) -> Result<Task> {
        self.store.transition(&self.task_id, state, message).await
    }

    pub async fn complete(&self, text: impl Into<String>) -> Result<Task> {
        let message = self.agent_message(text);
        self.update_status(TaskState::Completed, Some(message)).await
    }

    pub async fn fail(&self, text: impl Into<String>) -> Result<Task> {
        let message = self.agent_message(text);
        self.update_status(TaskState::Failed, Some(message)).await
    }

    pub async fn reject(&self, text: impl Into<String>) -> Result<Task> {
        let message = self.agent_message(text);
        self.update_status(TaskState::Rejected, Some(message)).await
    }

    pub async fn current(&self) -> Result<Task> {
        self.store.get(&self.task_id).await
    }
}

/// Agent logic plugged into a [`TaskEngine`](super::TaskEngine)
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Run the task. Expected to leave it in a terminal state.
    async fn execute(
        &self,
        context: &RequestContext,
        updater: &TaskUpdater,
    ) -> std::result::Result<(), ExecutorError>;

    /// Status text for a task whose execution escaped with an error
    fn failure_message(&self, error: &ExecutorError) -> String {
        format!("Unfortunately, an error occurred while processing your request: {error}")
    }
}
