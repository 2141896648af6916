//! HTTP API Server
//!
//! Builds the axum applications for each role and serves them until the
//! shutdown signal resolves.

use axum::{middleware::from_fn_with_state, routing::get, Router};
use http::HeaderValue;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use sales_core::a2a::{AgentCard, TaskEngine, TaskExecutor};
use sales_core::{ApiConfig, ChatService};

use crate::handlers::health;
use crate::middleware::auth::{auth_middleware, ApiKey};
use crate::routes::{agent_routes, chat_routes};

/// Shared state of an agent server
pub struct AgentState<E: TaskExecutor> {
    pub engine: TaskEngine<E>,
    pub card: Arc<AgentCard>,
}

impl<E: TaskExecutor> Clone for AgentState<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            card: self.card.clone(),
        }
    }
}

/// Shared state of the chat backend
#[derive(Clone)]
pub struct ChatState {
    pub service: Arc<ChatService>,
}

/// Router serving one agent's task protocol
pub fn agent_app<E: TaskExecutor>(engine: TaskEngine<E>, card: AgentCard) -> Router {
    let state = AgentState {
        engine,
        card: Arc::new(card),
    };

    Router::new()
        .merge(agent_routes::<E>())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Router serving the chat backend
///
/// Chat endpoints require the bearer key when one is configured; `/health`
/// stays open.
pub fn chat_app(service: Arc<ChatService>, api: &ApiConfig) -> Router {
    let api_key: ApiKey = api.key.as_deref().map(Arc::from);

    Router::new()
        .merge(chat_routes())
        .route_layer(from_fn_with_state(api_key, auth_middleware))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(api.allowed_origins.as_deref()))
        .with_state(ChatState { service })
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind `addr` and serve `app` until `shutdown` resolves
pub async fn serve(
    addr: SocketAddr,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Start an agent server
pub async fn start_agent_server<E: TaskExecutor>(
    addr: SocketAddr,
    engine: TaskEngine<E>,
    card: AgentCard,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Serving agent '{}' v{}", card.name, card.version);
    serve(addr, agent_app(engine, card), shutdown).await
}

/// Start the chat backend server
pub async fn start_chat_server(
    addr: SocketAddr,
    service: Arc<ChatService>,
    api: &ApiConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    if api.key.is_none() {
        warn!("No API key configured; chat endpoints are open");
    }
    serve(addr, chat_app(service, api), shutdown).await
}
