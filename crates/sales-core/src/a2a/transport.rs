//! Agent transports
//!
//! [`AgentTransport`] is the seam the consultation client talks through.
//! [`HttpAgentTransport`] speaks the JSON-over-HTTP binding to a remote
//! agent; [`LoopbackTransport`] calls an in-process engine directly.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info};

use super::engine::TaskEngine;
use super::executor::TaskExecutor;
use super::types::{
    AgentCard, CancelResponse, ErrorResponse, Message, SendMessageRequest, SubmitResponse,
    TaskSnapshot,
};
use crate::config::ClientConfig;
use crate::{Error, Result};

/// Path of the agent card below an agent's base URL
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

/// Operations a caller needs from a remote agent
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn agent_card(&self) -> Result<AgentCard>;

    async fn send_message(&self, message: Message) -> Result<SubmitResponse>;

    async fn get_task(&self, task_id: &str) -> Result<TaskSnapshot>;

    async fn cancel_task(&self, task_id: &str) -> Result<CancelResponse>;
}

/// HTTP transport to one remote agent.
///
/// The card is fetched on first use and cached. Requests share the given
/// `reqwest::Client` pool and never exceed `max_connections` in flight.
pub struct HttpAgentTransport {
    client: Client,
    base_url: String,
    card: OnceCell<AgentCard>,
    permits: Arc<Semaphore>,
}

impl HttpAgentTransport {
    /// Build the shared client used for agent-to-agent calls
    pub fn build_client(config: &ClientConfig) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()
            .map_err(Error::from)
    }

    pub fn new(base_url: impl Into<String>, config: &ClientConfig) -> Result<Self> {
        let client = Self::build_client(config)?;
        Ok(Self::with_client(client, base_url, config.max_connections))
    }

    /// Transport over an existing client pool
    pub fn with_client(client: Client, base_url: impl Into<String>, max_connections: usize) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            card: OnceCell::new(),
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn card(&self) -> Result<&AgentCard> {
        self.card
            .get_or_try_init(|| async {
                let url = format!("{}{}", self.base_url, AGENT_CARD_PATH);
                let card: AgentCard = self.request(self.client.get(&url)).await?;
                info!(agent = %card.name, url = %card.url, "Discovered agent card");
                Ok(card)
            })
            .await
    }

    /// Task endpoint root, taken from the card when it names one
    async fn endpoint(&self) -> Result<String> {
        let card = self.card().await?;
        let url = card.url.trim_end_matches('/');
        if url.is_empty() {
            Ok(self.base_url.clone())
        } else {
            Ok(url.to_string())
        }
    }

    async fn request<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Transport("connection limiter closed".to_string()))?;

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        if status == StatusCode::NOT_FOUND {
            if let Ok(err) = serde_json::from_str::<ErrorResponse>(&body) {
                if err.code == "task_not_found" {
                    return Err(Error::TaskNotFound(err.message));
                }
            }
        }

        if !status.is_success() {
            return Err(Error::Protocol(format!("HTTP {}: {}", status, body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Protocol(format!("Unexpected response body: {} ({})", e, body)))
    }
}

fn classify(e: reqwest::Error) -> Error {
    if e.is_decode() {
        Error::Protocol(e.to_string())
    } else {
        Error::Transport(e.to_string())
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn agent_card(&self) -> Result<AgentCard> {
        self.card().await.cloned()
    }

    async fn send_message(&self, message: Message) -> Result<SubmitResponse> {
        let url = format!("{}/tasks", self.endpoint().await?);
        debug!(url = %url, message_id = %message.message_id, "Sending message");
        self.request(self.client.post(&url).json(&SendMessageRequest { message }))
            .await
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskSnapshot> {
        let url = format!("{}/tasks/{}", self.endpoint().await?, task_id);
        self.request(self.client.get(&url)).await
    }

    async fn cancel_task(&self, task_id: &str) -> Result<CancelResponse> {
        let url = format!("{}/tasks/{}/cancel", self.endpoint().await?, task_id);
        self.request(self.client.post(&url)).await
    }
}

/// Transport that hands messages straight to a local engine
pub struct LoopbackTransport<E: TaskExecutor> {
    engine: TaskEngine<E>,
    card: AgentCard,
}

impl<E: TaskExecutor> LoopbackTransport<E> {
    pub fn new(engine: TaskEngine<E>, card: AgentCard) -> Self {
        Self { engine, card }
    }

    pub fn engine(&self) -> &TaskEngine<E> {
        &self.engine
    }
}

#[async_trait]
impl<E: TaskExecutor> AgentTransport for LoopbackTransport<E> {
    async fn agent_card(&self) -> Result<AgentCard> {
        Ok(self.card.clone())
    }

    async fn send_message(&self, message: Message) -> Result<SubmitResponse> {
        let task = self.engine.submit(message).await?;
        Ok(SubmitResponse {
            task_id: task.id,
            state: task.status.state,
        })
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskSnapshot> {
        let task = self.engine.get_task(task_id).await?;
        Ok(TaskSnapshot::from(&task))
    }

    async fn cancel_task(&self, task_id: &str) -> Result<CancelResponse> {
        let task = self.engine.cancel(task_id).await?;
        Ok(CancelResponse {
            ack: true,
            task_id: task.id,
            state: task.status.state,
        })
    }
}
