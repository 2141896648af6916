//! Expert executor
//!
//! Answers product questions from the static catalog, optionally calling the
//! calculator tool. A failing completion still completes the task, with a
//! degraded answer built from the catalog.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::orchestrator::{expert_fallback, expert_schema, expert_system_prompt, preview};
use crate::a2a::{RequestContext, TaskExecutor, TaskUpdater};
use crate::error::ExecutorError;
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::tool::ToolManager;

pub struct ExpertExecutor {
    provider: Arc<dyn CompletionProvider>,
    tools: Arc<ToolManager>,
}

impl ExpertExecutor {
    pub fn new(provider: Arc<dyn CompletionProvider>, tools: Arc<ToolManager>) -> Self {
        Self { provider, tools }
    }

    async fn answer(&self, query: &str) -> Result<String, ExecutorError> {
        let request = CompletionRequest::new(query)
            .system(expert_system_prompt())
            .schema(expert_schema());

        let reply = self
            .provider
            .complete(request, &self.tools)
            .await
            .map_err(|e| ExecutorError::Execution(e.to_string()))?;

        if reply.is_empty() {
            return Err(ExecutorError::Execution("empty completion".to_string()));
        }
        Ok(reply.text)
    }
}

#[async_trait]
impl TaskExecutor for ExpertExecutor {
    fn name(&self) -> &str {
        "expert"
    }

    async fn execute(
        &self,
        context: &RequestContext,
        updater: &TaskUpdater,
    ) -> Result<(), ExecutorError> {
        updater.start_work().await?;

        let query = context.user_input();
        if query.trim().is_empty() {
            updater.reject("The request contained no text to answer.").await?;
            return Ok(());
        }
        info!(task_id = %context.task_id, "Expert received query: {}", preview(&query, 100));

        let reply = match self.answer(&query).await {
            Ok(text) => text,
            Err(e) => {
                warn!(task_id = %context.task_id, "Using fallback answer: {}", e);
                expert_fallback(&query)
            }
        };

        if context.is_cancelled() {
            info!(task_id = %context.task_id, "Task canceled before completion");
            return Ok(());
        }

        info!(task_id = %context.task_id, "Expert answer: {}", preview(&reply, 200));
        updater.complete(reply).await?;
        Ok(())
    }

    fn failure_message(&self, error: &ExecutorError) -> String {
        format!("Error processing request for expert: {error}")
    }
}
