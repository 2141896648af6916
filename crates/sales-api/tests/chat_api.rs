//! Chat backend endpoints

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::Router;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use sales_api::chat_app;
use sales_core::a2a::{
    ConsultationClient, LoopbackTransport, PollPolicy, RequestContext, TaskEngine, TaskExecutor,
    TaskUpdater,
};
use sales_core::agents::manager_card;
use sales_core::{ApiConfig, ChatService, ChatStore, ExecutorError};

/// Manager stand-in that reports how many transcript lines it received
struct LineCounter;

#[async_trait]
impl TaskExecutor for LineCounter {
    fn name(&self) -> &str {
        "line-counter"
    }

    async fn execute(
        &self,
        context: &RequestContext,
        updater: &TaskUpdater,
    ) -> Result<(), ExecutorError> {
        updater.start_work().await?;
        let lines = context.user_input().lines().count();
        updater.complete(format!("I read {lines} line(s).")).await?;
        Ok(())
    }
}

/// Manager stand-in whose tasks always fail
struct Broken;

#[async_trait]
impl TaskExecutor for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    async fn execute(&self, _: &RequestContext, _: &TaskUpdater) -> Result<(), ExecutorError> {
        Err(ExecutorError::InternalFault("bookkeeping failed".to_string()))
    }
}

fn app_with<E: TaskExecutor>(executor: E, key: Option<&str>) -> Router {
    let transport = LoopbackTransport::new(
        TaskEngine::new(executor),
        manager_card("http://localhost:10000/"),
    );
    let client = ConsultationClient::new(
        Arc::new(transport),
        PollPolicy::new(120, Duration::from_millis(10)),
    );
    let service = ChatService::new(ChatStore::in_memory().unwrap(), client, true);
    let api = ApiConfig {
        key: key.map(str::to_string),
        ..ApiConfig::default()
    };
    chat_app(Arc::new(service), &api)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_conversation_grows_and_sends_transcript() {
    let app = app_with(LineCounter, None);
    let alice = [("x-user-id", "alice")];

    let (status, first) = call(&app, "POST", "/api/chat", &alice, Some(json!({"content": "Hi"}))).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = first["session_id"].as_str().unwrap().to_string();
    assert_eq!(first["messages"].as_array().unwrap().len(), 2);
    assert_eq!(first["messages"][0]["sender"], "user");
    assert_eq!(first["messages"][1]["sender"], "agent");
    assert_eq!(first["messages"][1]["content"], "I read 1 line(s).");

    let (_, second) = call(
        &app,
        "POST",
        "/api/chat",
        &alice,
        Some(json!({"content": "Tell me about Vision AI", "session_id": session_id})),
    )
    .await;
    assert_eq!(second["session_id"], session_id.as_str());
    assert_eq!(second["messages"].as_array().unwrap().len(), 4);
    assert_eq!(second["messages"][3]["content"], "I read 3 line(s).");
}

#[tokio::test]
async fn test_history_is_private_to_owner() {
    let app = app_with(LineCounter, None);
    let (_, created) = call(
        &app,
        "POST",
        "/api/chat",
        &[("x-user-id", "alice")],
        Some(json!({"content": "Hi"})),
    )
    .await;
    let session_id = created["session_id"].as_str().unwrap();

    let uri = format!("/api/chat/{session_id}");
    let (status, history) = call(&app, "GET", &uri, &[("x-user-id", "alice")], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["messages"].as_array().unwrap().len(), 2);

    let (status, body) = call(&app, "GET", &uri, &[("x-user-id", "mallory")], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "session_not_found");

    let (status, _) = call(&app, "GET", "/api/chat/unknown", &[], None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let app = app_with(LineCounter, None);
    let (status, body) = call(&app, "POST", "/api/chat", &[], Some(json!({"content": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");
}

#[tokio::test]
async fn test_failed_manager_task_is_shown_to_user() {
    let app = app_with(Broken, None);
    let (status, body) = call(&app, "POST", "/api/chat", &[], Some(json!({"content": "Hi"}))).await;
    assert_eq!(status, StatusCode::OK);

    let reply = body["messages"][1]["content"].as_str().unwrap();
    assert!(reply.starts_with("Unfortunately, an error occurred while processing your request"));
}

#[tokio::test]
async fn test_api_key_guards_chat_but_not_health() {
    let app = app_with(LineCounter, Some("secret"));

    let (status, body) = call(&app, "POST", "/api/chat", &[], Some(json!({"content": "Hi"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = call(
        &app,
        "POST",
        "/api/chat",
        &[("authorization", "Bearer wrong")],
        Some(json!({"content": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        "POST",
        "/api/chat",
        &[("authorization", "Bearer secret")],
        Some(json!({"content": "Hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
