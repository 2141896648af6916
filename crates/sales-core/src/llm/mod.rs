//! LLM API client and types
//!
//! Supports both Claude API and OpenAI-compatible APIs (Mistral, GLM, etc.)

mod client;
mod provider;
mod types;

pub use client::LlmClient;
pub use provider::{CompletionProvider, CompletionRequest, ResponseSchema, StructuredReply};
pub use types::*;
