//! Expert tasks that route arithmetic through the calculator tool

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use sales_core::{
    CompletionProvider, CompletionRequest, ExpertExecutor, Message, StructuredReply, Task,
    TaskEngine, TaskState, ToolManager,
};
use sales_tools::register_default_tools;

/// Provider that evaluates the prompt with the calculator and reports the tool output
struct CalculatingProvider;

#[async_trait]
impl CompletionProvider for CalculatingProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
        tools: &ToolManager,
    ) -> sales_core::Result<StructuredReply> {
        let result = tools
            .execute("calculate", json!({ "expression": request.prompt }))
            .await?;
        Ok(StructuredReply {
            text: result.output,
            structured: true,
        })
    }
}

fn engine() -> TaskEngine<ExpertExecutor> {
    let mut tools = ToolManager::new();
    register_default_tools(&mut tools);
    TaskEngine::new(ExpertExecutor::new(
        Arc::new(CalculatingProvider),
        Arc::new(tools),
    ))
}

async fn run(engine: &TaskEngine<ExpertExecutor>, text: &str) -> Task {
    let task = engine.submit(Message::user_text(text)).await.unwrap();
    for _ in 0..500 {
        let current = engine.get_task(&task.id).await.unwrap();
        if current.state().is_terminal() {
            return current;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never settled", task.id);
}

fn reply(task: &Task) -> &str {
    task.status
        .message
        .as_ref()
        .and_then(|m| m.first_text())
        .unwrap_or_default()
}

#[test]
fn test_default_tools_registered() {
    let mut tools = ToolManager::new();
    register_default_tools(&mut tools);
    assert!(tools.contains("calculate"));
    assert_eq!(tools.definitions()[0].name, "calculate");
}

#[tokio::test]
async fn test_expert_task_reports_sum() {
    let engine = engine();
    let task = run(&engine, "2+2").await;

    assert_eq!(task.state(), TaskState::Completed);
    assert!(reply(&task).contains('4'));
}

#[tokio::test]
async fn test_rejected_expression_still_completes() {
    let engine = engine();
    let task = run(&engine, "2+2; rm -rf").await;

    assert_eq!(task.state(), TaskState::Completed);
    assert!(reply(&task).contains("invalid characters"));
}
