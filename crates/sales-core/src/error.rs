//! Error types for sales-core

use thiserror::Error;

use crate::a2a::TaskState;

/// Main error type for sales-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM API error: {0}")]
    Llm(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid transition for task {task_id}: {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },

    #[error("Chat session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure taxonomy for task executors.
///
/// `Execution` and `UpstreamUnavailable` are normally recovered inside the
/// executor into fallback text. Anything that escapes `execute` settles the
/// task to `failed`.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("completion capability failed: {0}")]
    Execution(String),

    #[error("upstream agent unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    InternalFault(String),
}

impl From<Error> for ExecutorError {
    fn from(e: Error) -> Self {
        Self::InternalFault(e.to_string())
    }
}

/// Result type alias for sales-core
pub type Result<T> = std::result::Result<T, Error>;
