//! HTTP API handlers
//!
//! Agent task protocol handlers are generic over the executor an agent runs;
//! chat handlers front the [`sales_core::ChatService`].

use axum::{
    extract::{Path, State},
    Json,
};
use http::HeaderMap;
use serde::Deserialize;
use tracing::{debug, info};

use sales_core::a2a::{
    AgentCard, CancelResponse, SendMessageRequest, SubmitResponse, TaskExecutor, TaskSnapshot,
};
use sales_core::chat::ChatSession;

use crate::error::Result;
use crate::server::{AgentState, ChatState};

/// Header carrying the caller's identity on chat endpoints
pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity used when the header is absent
pub const ANONYMOUS_USER: &str = "anonymous";

// ============================================================================
// Request types
// ============================================================================

/// Chat request payload
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Customer message
    pub content: String,
    /// Session to continue; a new one is opened when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

// ============================================================================
// Agent handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Discovery document
pub async fn agent_card<E: TaskExecutor>(State(state): State<AgentState<E>>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// Create a task from an inbound message
pub async fn submit_task<E: TaskExecutor>(
    State(state): State<AgentState<E>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SubmitResponse>> {
    debug!("Submit request: {:?}", req.message);

    let task = state.engine.submit(req.message).await?;
    Ok(Json(SubmitResponse {
        task_id: task.id,
        state: task.status.state,
    }))
}

/// Current snapshot of a task
pub async fn get_task<E: TaskExecutor>(
    State(state): State<AgentState<E>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskSnapshot>> {
    let task = state.engine.get_task(&task_id).await?;
    Ok(Json(TaskSnapshot::from(&task)))
}

/// Cancel a task; canceling a settled task reports its final state
pub async fn cancel_task<E: TaskExecutor>(
    State(state): State<AgentState<E>>,
    Path(task_id): Path<String>,
) -> Result<Json<CancelResponse>> {
    info!(task_id = %task_id, "Cancel requested");

    let task = state.engine.cancel(&task_id).await?;
    Ok(Json(CancelResponse {
        ack: true,
        task_id: task.id,
        state: task.status.state,
    }))
}

// ============================================================================
// Chat handlers
// ============================================================================

/// Send a customer message and return the session history
pub async fn post_chat(
    State(state): State<ChatState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatSession>> {
    let user_id = user_id(&headers);
    debug!(user_id = %user_id, "Chat request");

    let session = state
        .service
        .process_user_message(&user_id, &req.content, req.session_id)
        .await?;
    Ok(Json(session))
}

/// History of one of the caller's sessions
pub async fn chat_history(
    State(state): State<ChatState>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<ChatSession>> {
    let user_id = user_id(&headers);
    let session = state.service.history(&user_id, &session_id).await?;
    Ok(Json(session))
}

fn user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}
