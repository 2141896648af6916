//! sales-tools: Built-in tools for the sales agents
//!
//! Tools here are deterministic helpers the expert model may call while
//! answering a consultation.

use sales_core::ToolManager;

pub mod calculator;

pub use calculator::{calculate, CalculatorTool};

use std::sync::Arc;

/// Register all default built-in tools with the tool manager
pub fn register_default_tools(manager: &mut ToolManager) {
    manager.register(Arc::new(CalculatorTool));
}
