//! Remote consultation
//!
//! Submits a message to a remote agent and polls the resulting task until it
//! settles. Every way this can go wrong is reported as an [`Unavailability`]
//! value so callers pick their fallback on a variant, never on text.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::transport::AgentTransport;
use super::types::{Message, TaskSnapshot, TaskState};
use crate::Error as CoreError;

/// How long to wait for a remote task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Manager consulting the expert: 40 polls, 0.5s apart
    pub fn expert() -> Self {
        Self::new(40, Duration::from_millis(500))
    }

    /// Chat backend consulting the manager: 120 polls, 0.5s apart
    pub fn manager() -> Self {
        Self::new(120, Duration::from_millis(500))
    }

    /// Upper bound on time spent polling
    pub fn worst_case(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// A task accepted by a remote agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
    pub state: TaskState,
}

/// Why a consultation produced no reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailability {
    #[error("Agent is temporarily unavailable: {0}")]
    Transport(String),

    #[error("Error creating task for agent: {0}")]
    Protocol(String),

    #[error("Error getting status for task {task_id}: {reason}")]
    QueryFailed { task_id: String, reason: String },

    #[error("Agent completed task {task_id} but returned no message")]
    EmptyCompletion { task_id: String },

    #[error("Could not get a response from the agent. Status: {state}, Message: {}", .message.as_deref().unwrap_or("none"))]
    Unsuccessful {
        task_id: String,
        state: TaskState,
        message: Option<String>,
    },

    #[error("No final answer from the agent after {attempts} status checks. Last status: {last_state}")]
    TimedOut {
        task_id: String,
        attempts: u32,
        last_state: TaskState,
    },
}

impl Unavailability {
    /// The remote agent could not be reached or did not speak the protocol
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Protocol(_))
    }

    fn from_submit_error(error: CoreError) -> Self {
        match error {
            CoreError::Transport(reason) => Self::Transport(reason),
            CoreError::Http(e) => Self::Transport(e.to_string()),
            other => Self::Protocol(other.to_string()),
        }
    }
}

/// Result of one consultation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsultationOutcome {
    /// Text of the remote agent's completed status message, verbatim
    Reply(String),
    Unavailable(Unavailability),
}

impl ConsultationOutcome {
    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Reply(_))
    }

    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Reply(text) => Some(text),
            Self::Unavailable(_) => None,
        }
    }

    pub fn unavailability(&self) -> Option<&Unavailability> {
        match self {
            Self::Reply(_) => None,
            Self::Unavailable(reason) => Some(reason),
        }
    }
}

/// Client for consulting one remote agent
#[derive(Clone)]
pub struct ConsultationClient {
    transport: Arc<dyn AgentTransport>,
    policy: PollPolicy,
}

impl ConsultationClient {
    pub fn new(transport: Arc<dyn AgentTransport>, policy: PollPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    pub fn transport(&self) -> &Arc<dyn AgentTransport> {
        &self.transport
    }

    /// Send a message, creating a remote task
    pub async fn submit(&self, message: Message) -> Result<TaskHandle, Unavailability> {
        let response = self
            .transport
            .send_message(message)
            .await
            .map_err(Unavailability::from_submit_error)?;

        debug!(task_id = %response.task_id, state = %response.state, "Remote task created");
        Ok(TaskHandle {
            task_id: response.task_id,
            state: response.state,
        })
    }

    /// Poll `handle` until it is terminal, a query fails, or `policy` runs out.
    ///
    /// Each attempt sleeps for the interval before querying. When attempts run
    /// out the remote task is canceled on a best-effort basis.
    pub async fn await_terminal(&self, handle: &TaskHandle, policy: PollPolicy) -> ConsultationOutcome {
        let mut last_state = handle.state;

        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.interval).await;

            let snapshot = match self.transport.get_task(&handle.task_id).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(task_id = %handle.task_id, attempt, "Task status query failed: {}", e);
                    return ConsultationOutcome::Unavailable(Unavailability::QueryFailed {
                        task_id: handle.task_id.clone(),
                        reason: e.to_string(),
                    });
                }
            };

            last_state = snapshot.state;
            debug!(task_id = %handle.task_id, attempt, state = %last_state, "Polled remote task");

            if snapshot.state.is_terminal() {
                return Self::evaluate(snapshot);
            }
        }

        warn!(
            task_id = %handle.task_id,
            attempts = policy.max_attempts,
            state = %last_state,
            "Remote task did not settle in time"
        );
        if let Err(e) = self.transport.cancel_task(&handle.task_id).await {
            debug!(task_id = %handle.task_id, "Best-effort cancel failed: {}", e);
        }

        ConsultationOutcome::Unavailable(Unavailability::TimedOut {
            task_id: handle.task_id.clone(),
            attempts: policy.max_attempts,
            last_state,
        })
    }

    /// Submit `text` as a user message and wait for the outcome
    pub async fn consult(&self, text: &str) -> ConsultationOutcome {
        self.consult_message(Message::user_text(text)).await
    }

    pub async fn consult_message(&self, message: Message) -> ConsultationOutcome {
        let handle = match self.submit(message).await {
            Ok(handle) => handle,
            Err(reason) => {
                warn!("Consultation submit failed: {}", reason);
                return ConsultationOutcome::Unavailable(reason);
            }
        };

        let outcome = self.await_terminal(&handle, self.policy).await;
        if outcome.is_reply() {
            info!(task_id = %handle.task_id, "Consultation answered");
        }
        outcome
    }

    fn evaluate(snapshot: TaskSnapshot) -> ConsultationOutcome {
        let text = snapshot
            .status
            .message
            .as_ref()
            .and_then(|m| m.first_text())
            .map(str::to_string);

        match (snapshot.state, text) {
            (TaskState::Completed, Some(text)) => ConsultationOutcome::Reply(text),
            (TaskState::Completed, None) => {
                ConsultationOutcome::Unavailable(Unavailability::EmptyCompletion {
                    task_id: snapshot.task_id,
                })
            }
            (state, message) => ConsultationOutcome::Unavailable(Unavailability::Unsuccessful {
                task_id: snapshot.task_id,
                state,
                message,
            }),
        }
    }
}
