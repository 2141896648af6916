//! Route definitions
//!
//! Defines all HTTP API endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use sales_core::a2a::{TaskExecutor, AGENT_CARD_PATH};

use crate::handlers::{
    agent_card, cancel_task, chat_history, get_task, health, post_chat, submit_task,
};
use crate::server::{AgentState, ChatState};

/// Agent task protocol endpoints
pub fn agent_routes<E: TaskExecutor>() -> Router<AgentState<E>> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Discovery
        .route(AGENT_CARD_PATH, get(agent_card::<E>))
        // Task lifecycle
        .route("/tasks", post(submit_task::<E>))
        .route("/tasks/{task_id}", get(get_task::<E>))
        .route("/tasks/{task_id}/cancel", post(cancel_task::<E>))
}

/// Chat backend endpoints
pub fn chat_routes() -> Router<ChatState> {
    Router::new()
        .route("/api/chat", post(post_chat))
        .route("/api/chat/{session_id}", get(chat_history))
}
