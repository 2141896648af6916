//! Tool registry

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{Tool, ToolResult};
use crate::llm::ToolDefinition;
use crate::{Error, Result};

/// Registered tools indexed by name
#[derive(Default, Clone)]
pub struct ToolManager {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions for every registered tool, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.input_schema()))
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, input: JsonValue) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::ToolExecution(format!("Unknown tool: {}", name)))?;
        tool.execute(input).await
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase text"
        }

        fn input_schema(&self) -> JsonValue {
            json!({"type": "object", "properties": {"text": {"type": "string"}}, "required": ["text"]})
        }

        async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
            let text = input["text"].as_str().unwrap_or_default();
            Ok(ToolResult::success(text.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn test_register_and_execute() {
        let mut manager = ToolManager::new();
        assert!(manager.is_empty());
        manager.register(Arc::new(Upper));

        assert!(manager.contains("upper"));
        assert_eq!(manager.definitions()[0].name, "upper");

        let result = manager.execute("upper", json!({"text": "abc"})).await.unwrap();
        assert_eq!(result, ToolResult::success("ABC"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let manager = ToolManager::new();
        let err = manager.execute("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::ToolExecution(_)));
    }
}
