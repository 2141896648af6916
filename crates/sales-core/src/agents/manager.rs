//! Manager executor
//!
//! Consults the expert, then writes the customer-facing reply.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::orchestrator::{
    expert_query, manager_fallback, manager_prompt, manager_schema, preview, MANAGER_SYSTEM_PROMPT,
};
use crate::a2a::{ConsultationClient, ConsultationOutcome, RequestContext, TaskExecutor, TaskUpdater};
use crate::error::ExecutorError;
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::tool::ToolManager;

pub struct ManagerExecutor {
    provider: Arc<dyn CompletionProvider>,
    tools: ToolManager,
    expert: ConsultationClient,
}

impl ManagerExecutor {
    pub fn new(provider: Arc<dyn CompletionProvider>, expert: ConsultationClient) -> Self {
        Self {
            provider,
            tools: ToolManager::new(),
            expert,
        }
    }

    async fn consult_expert(&self, input: &str) -> ConsultationOutcome {
        let outcome = self.expert.consult(&expert_query(input)).await;
        match &outcome {
            ConsultationOutcome::Reply(text) => {
                info!("Expert replied: {}", preview(text, 100));
            }
            ConsultationOutcome::Unavailable(reason) => {
                let degraded = ExecutorError::UpstreamUnavailable(reason.to_string());
                warn!("Continuing without expert: {}", degraded);
            }
        }
        outcome
    }

    async fn reply(&self, input: &str, consultation: &ConsultationOutcome) -> Result<String, ExecutorError> {
        let request = CompletionRequest::new(manager_prompt(input, consultation))
            .system(MANAGER_SYSTEM_PROMPT)
            .schema(manager_schema());

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
impl TaskExecutor for ManagerExecutor {
    fn name(&self) -> &str {
        "manager"
    }

    async fn execute(
        &self,
        context: &RequestContext,
        updater: &TaskUpdater,
    ) -> Result<(), ExecutorError> {
        updater.start_work().await?;

        let input = context.user_input();
        if input.trim().is_empty() {
            updater.reject("The request contained no message to reply to.").await?;
            return Ok(());
        }
        info!(task_id = %context.task_id, "Manager received: {}", preview(&input, 100));

        // Not propagated to the expert task if the outer task is canceled meanwhile
        let consultation = self.consult_expert(&input).await;
        if context.is_cancelled() {
            info!(task_id = %context.task_id, "Task canceled during consultation");
            return Ok(());
        }

        let reply = match self.reply(&input, &consultation).await {
            Ok(text) => text,
            Err(e) => {
                warn!(task_id = %context.task_id, "Using fallback reply: {}", e);
                manager_fallback(&input, &consultation)
            }
        };

        if context.is_cancelled() {
            return Ok(());
        }

        info!(task_id = %context.task_id, "Manager reply: {}", preview(&reply, 200));
        updater.complete(reply).await?;
        Ok(())
    }
}
