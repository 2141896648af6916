//! Tool system for model tool use
//!
//! Tools are deterministic helpers the model may call during a completion,
//! such as the expert's calculator.

mod manager;

pub use manager::ToolManager;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::Result;

/// Tool execution result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    /// Output string from tool execution
    pub output: String,
    /// Whether the execution resulted in an error
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: true,
        }
    }
}

/// A tool the model can call
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name used in tool definitions
    fn name(&self) -> &str;

    /// Description shown to the model when selecting tools
    fn description(&self) -> &str;

    /// JSON schema of the input parameters
    fn input_schema(&self) -> JsonValue;

    async fn execute(&self, input: JsonValue) -> Result<ToolResult>;
}
