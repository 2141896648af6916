//! Task protocol engine
//!
//! Accepts messages, creates tasks, runs the executor in the background and
//! answers status queries and cancellations. `submit` never waits for the
//! executor.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::executor::{RequestContext, TaskExecutor, TaskUpdater};
use super::store::{InMemoryTaskStore, TaskStore};
use super::types::{Message, Task, TaskState};
use crate::error::ExecutorError;
use crate::{Error, Result};

const UNSETTLED_MESSAGE: &str = "The agent finished without producing a result.";

/// Hosts one executor behind the task protocol
pub struct TaskEngine<E: TaskExecutor> {
    executor: Arc<E>,
    store: Arc<dyn TaskStore>,
    running: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl<E: TaskExecutor> Clone for TaskEngine<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            store: Arc::clone(&self.store),
            running: Arc::clone(&self.running),
        }
    }
}

impl<E: TaskExecutor> TaskEngine<E> {
    /// Engine backed by an in-memory store
    pub fn new(executor: E) -> Self {
        Self::with_store(Arc::new(executor), Arc::new(InMemoryTaskStore::new()))
    }

    pub fn with_store(executor: Arc<E>, store: Arc<dyn TaskStore>) -> Self {
        Self {
            executor,
            store,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Create a task for `message` and start the executor on it.
    ///
    /// Returns the task as stored, normally still `submitted`.
    pub async fn submit(&self, message: Message) -> Result<Task> {
        let task_id = Uuid::new_v4().to_string();
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let inbound = message.attached_to(&task_id, &context_id);

        let task = Task::new(&task_id, &context_id, inbound.clone());
        self.store.insert(task.clone()).await?;

        let token = CancellationToken::new();
        self.running
            .lock()
            .await
            .insert(task_id.clone(), token.clone());

        info!(
            executor = self.executor.name(),
            task_id = %task_id,
            context_id = %context_id,
            "Task submitted"
        );

        let context = RequestContext::new(&task_id, &context_id, inbound, token);
        let updater = TaskUpdater::new(Arc::clone(&self.store), &task_id, &context_id);
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run(context, updater).await;
        });

        Ok(task)
    }

    async fn run(&self, context: RequestContext, updater: TaskUpdater) {
        let task_id = context.task_id.clone();
        let executor = Arc::clone(&self.executor);
        let exec_context = context.clone();
        let exec_updater = updater.clone();

        // Separate task so a panic surfaces as a JoinError instead of
        // tearing down the engine.
        let handle =
            tokio::spawn(async move { executor.execute(&exec_context, &exec_updater).await });

        match handle.await {
            Ok(Ok(())) => match updater.current().await {
                Ok(task) if !task.state().is_terminal() => {
                    warn!(task_id = %task_id, state = %task.state(), "Executor returned without settling task");
                    self.settle_failed(&updater, UNSETTLED_MESSAGE.to_string()).await;
                }
                Ok(_) => {}
                Err(e) => error!(task_id = %task_id, "Failed to load task after execution: {}", e),
            },
            Ok(Err(e)) => {
                warn!(task_id = %task_id, error = %e, "Executor returned an error");
                let text = self.executor.failure_message(&e);
                self.settle_failed(&updater, text).await;
            }
            Err(join_error) => {
                error!(task_id = %task_id, "Executor panicked: {}", join_error);
                let fault = ExecutorError::InternalFault("executor panicked".to_string());
                let text = self.executor.failure_message(&fault);
                self.settle_failed(&updater, text).await;
            }
        }

        self.running.lock().await.remove(&task_id);
        debug!(task_id = %task_id, "Task execution finished");
    }

    async fn settle_failed(&self, updater: &TaskUpdater, text: String) {
        match updater.fail(text).await {
            Ok(_) => warn!(task_id = %updater.task_id(), "Task failed"),
            Err(Error::InvalidTransition { from, to, .. }) => {
                warn!(
                    task_id = %updater.task_id(),
                    from = %from,
                    to = %to,
                    "Ignored invalid transition on settled task"
                );
            }
            Err(e) => error!(task_id = %updater.task_id(), "Failed to record task failure: {}", e),
        }
    }

    /// Current snapshot of a task
    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.store.get(task_id).await
    }

    /// Cancel a task.
    ///
    /// Idempotent: a task that is already terminal is returned unchanged.
    pub async fn cancel(&self, task_id: &str) -> Result<Task> {
        match self
            .store
            .transition(task_id, TaskState::Canceled, None)
            .await
        {
            Ok(task) => {
                if let Some(token) = self.running.lock().await.remove(task_id) {
                    token.cancel();
                }
                info!(task_id = %task_id, "Task canceled");
                Ok(task)
            }
            Err(Error::InvalidTransition { from, .. }) => {
                debug!(task_id = %task_id, state = %from, "Cancel on terminal task ignored");
                self.store.get(task_id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Number of tasks whose executor is still running
    pub async fn running_count(&self) -> usize {
        self.running.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<StdMutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Echo;

    #[async_trait]
    impl TaskExecutor for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(
            &self,
            context: &RequestContext,
            updater: &TaskUpdater,
        ) -> std::result::Result<(), ExecutorError> {
            updater.start_work().await?;
            updater.complete(context.user_input()).await?;
            Ok(())
        }
    }

    /// Works until canceled, then tries to complete anyway
    struct Stubborn;

    #[async_trait]
    impl TaskExecutor for Stubborn {
        fn name(&self) -> &str {
            "stubborn"
        }

        async fn execute(
            &self,
            context: &RequestContext,
            updater: &TaskUpdater,
        ) -> std::result::Result<(), ExecutorError> {
            updater.start_work().await?;
            context.cancelled().await;
            updater.complete("too late").await?;
            Ok(())
        }
    }

    struct Forgetful;

    #[async_trait]
    impl TaskExecutor for Forgetful {
        fn name(&self) -> &str {
            "forgetful"
        }

        async fn execute(
            &self,
            _context: &RequestContext,
            updater: &TaskUpdater,
        ) -> std::result::Result<(), ExecutorError> {
            updater.start_work().await?;
            Ok(())
        }
    }

    struct Panicky;

    #[async_trait]
    impl TaskExecutor for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn execute(
            &self,
            _context: &RequestContext,
            _updater: &TaskUpdater,
        ) -> std::result::Result<(), ExecutorError> {
            panic!("boom");
        }
    }

    struct Faulty;

    #[async_trait]
    impl TaskExecutor for Faulty {
        fn name(&self) -> &str {
            "faulty"
        }

        async fn execute(
            &self,
            _context: &RequestContext,
            updater: &TaskUpdater,
        ) -> std::result::Result<(), ExecutorError> {
            updater.start_work().await?;
            Err(ExecutorError::InternalFault("disk on fire".to_string()))
        }
    }

    async fn wait_terminal<E: TaskExecutor>(engine: &TaskEngine<E>, task_id: &str) -> Task {
        for _ in 0..200 {
            let task = engine.get_task(task_id).await.unwrap();
            if task.state().is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {task_id} never settled");
    }

    fn status_text(task: &Task) -> String {
        task.status
            .message
            .as_ref()
            .and_then(|m| m.first_text())
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_submit_then_complete() {
        let engine = TaskEngine::new(Echo);
        let task = engine.submit(Message::user_text("ping")).await.unwrap();

        let done = wait_terminal(&engine, &task.id).await;
        assert_eq!(done.state(), TaskState::Completed);
        assert_eq!(status_text(&done), "ping");

        let reply = done.status.message.unwrap();
        assert_eq!(reply.task_id.as_deref(), Some(task.id.as_str()));
        assert_eq!(engine.running_count().await, 0);
    }

    #[tokio::test]
    async fn test_context_id_is_kept_or_assigned() {
        let engine = TaskEngine::new(Echo);

        let given = engine
            .submit(Message::user_text("a").with_context_id("ctx-7"))
            .await
            .unwrap();
        assert_eq!(given.context_id, "ctx-7");

        let assigned = engine.submit(Message::user_text("b")).await.unwrap();
        assert!(!assigned.context_id.is_empty());
        assert_ne!(assigned.id, given.id);
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let engine = TaskEngine::new(Echo);
        assert!(matches!(
            engine.get_task("nope").await,
            Err(Error::TaskNotFound(_))
        ));
        assert!(matches!(
            engine.cancel("nope").await,
            Err(Error::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_wins_over_late_completion() {
        let engine = TaskEngine::new(Stubborn);
        let task = engine.submit(Message::user_text("wait")).await.unwrap();

        let canceled = engine.cancel(&task.id).await.unwrap();
        assert_eq!(canceled.state(), TaskState::Canceled);

        // Let the executor observe the token and attempt its update
        tokio::time::sleep(Duration::from_millis(50)).await;
        let after = engine.get_task(&task.id).await.unwrap();
        assert_eq!(after.state(), TaskState::Canceled);
        assert!(after.status.message.is_none());
    }

    #[tokio::test]
    async fn test_late_update_is_logged_at_info() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let engine = TaskEngine::new(Stubborn);
        let task = engine.submit(Message::user_text("wait")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.cancel(&task.id).await.unwrap();

        for _ in 0..200 {
            if logs.contents().contains("Ignored invalid transition") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let output = logs.contents();
        assert!(output.contains("Task canceled"), "{output}");
        assert!(output.contains("canceled -> completed"), "{output}");
        assert!(output.contains("Ignored invalid transition on settled task"), "{output}");
        assert_eq!(
            engine.get_task(&task.id).await.unwrap().state(),
            TaskState::Canceled
        );
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let engine = TaskEngine::new(Echo);
        let task = engine.submit(Message::user_text("x")).await.unwrap();
        let done = wait_terminal(&engine, &task.id).await;

        let first = engine.cancel(&task.id).await.unwrap();
        let second = engine.cancel(&task.id).await.unwrap();
        assert_eq!(first.state(), done.state());
        assert_eq!(second.state(), TaskState::Completed);
        assert_eq!(status_text(&second), "x");
    }

    #[tokio::test]
    async fn test_unsettled_execution_fails_task() {
        let engine = TaskEngine::new(Forgetful);
        let task = engine.submit(Message::user_text("x")).await.unwrap();
        let done = wait_terminal(&engine, &task.id).await;
        assert_eq!(done.state(), TaskState::Failed);
        assert_eq!(status_text(&done), UNSETTLED_MESSAGE);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let engine = TaskEngine::new(Panicky);
        let task = engine.submit(Message::user_text("x")).await.unwrap();
        let done = wait_terminal(&engine, &task.id).await;
        assert_eq!(done.state(), TaskState::Failed);

        // Engine keeps serving
        let next = engine.submit(Message::user_text("y")).await.unwrap();
        assert_eq!(next.state(), TaskState::Submitted);
    }

    #[tokio::test]
    async fn test_internal_fault_message() {
        let engine = TaskEngine::new(Faulty);
        let task = engine.submit(Message::user_text("x")).await.unwrap();
        let done = wait_terminal(&engine, &task.id).await;
        assert_eq!(done.state(), TaskState::Failed);
        assert_eq!(
            status_text(&done),
            "Unfortunately, an error occurred while processing your request: disk on fire"
        );
    }
}
