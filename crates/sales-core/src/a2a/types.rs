//! A2A protocol types
//!
//! Task lifecycle, messages, agent cards and the JSON bodies exchanged
//! between agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
    Canceled,
    Rejected,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
        }
    }

    /// No transition leaves a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Canceled | Self::Rejected
        )
    }

    /// Forward-only: submitted -> working -> terminal. `working -> working`
    /// is allowed so an executor can attach progress messages.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        match self {
            Self::Submitted => next != Self::Submitted,
            Self::Working => next != Self::Submitted,
            _ => false,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// Message part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Data { data: serde_json::Value },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Data { .. } => None,
        }
    }
}

/// A message exchanged between a caller and an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Message {
    /// Create a user message with a single text part
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an agent message with a single text part
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::text(text)],
            message_id: uuid::Uuid::new_v4().to_string(),
            context_id: None,
            task_id: None,
        }
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    /// Copy of this message bound to a task
    pub fn attached_to(&self, task_id: &str, context_id: &str) -> Self {
        Self {
            task_id: Some(task_id.to_string()),
            context_id: Some(context_id.to_string()),
            ..self.clone()
        }
    }

    /// First text part, if any
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(Part::as_text)
    }

    /// All text parts joined with newlines
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Current status of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A task owned by the agent that created it
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    /// Inbound message that created the task
    pub history: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: impl Into<String>, context_id: impl Into<String>, message: Message) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus {
                state: TaskState::Submitted,
                message: None,
                timestamp: Some(now),
            },
            history: vec![message],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> TaskState {
        self.status.state
    }
}

// ============================================================================
// Wire bodies
// ============================================================================

/// `POST /tasks` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub message: Message,
}

/// `POST /tasks` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: String,
    pub state: TaskState,
}

/// `GET /tasks/{task_id}` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    #[serde(default)]
    pub context_id: Option<String>,
    pub state: TaskState,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            context_id: Some(task.context_id.clone()),
            state: task.state(),
            status: task.status.clone(),
            created_at: Some(task.created_at),
            updated_at: Some(task.updated_at),
        }
    }
}

/// `POST /tasks/{task_id}/cancel` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub ack: bool,
    pub task_id: String,
    pub state: TaskState,
}

/// Error body returned by agent endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ============================================================================
// Discovery
// ============================================================================

/// Static descriptor an agent publishes for discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl AgentSkill {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        tags: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(TaskState::Rejected.is_terminal());
    }

    #[test]
    fn test_transitions_are_forward_only() {
        assert!(TaskState::Submitted.can_transition_to(TaskState::Working));
        assert!(TaskState::Submitted.can_transition_to(TaskState::Canceled));
        assert!(TaskState::Working.can_transition_to(TaskState::Completed));
        assert!(TaskState::Working.can_transition_to(TaskState::Working));
        assert!(!TaskState::Working.can_transition_to(TaskState::Submitted));

        for terminal in [
            TaskState::Completed,
            TaskState::Failed,
            TaskState::Canceled,
            TaskState::Rejected,
        ] {
            assert!(!terminal.can_transition_to(TaskState::Working));
            assert!(!terminal.can_transition_to(TaskState::Completed));
        }
    }

    #[test]
    fn test_message_wire_shape() {
        let msg = Message::user_text("hello").with_context_id("ctx-1");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["parts"][0]["type"], "text");
        assert_eq!(json["parts"][0]["text"], "hello");
        assert_eq!(json["contextId"], "ctx-1");
        assert!(json["messageId"].is_string());
        assert!(json.get("taskId").is_none());
    }

    #[test]
    fn test_first_text_skips_data_parts() {
        let msg = Message {
            role: Role::Agent,
            parts: vec![
                Part::Data {
                    data: serde_json::json!({"k": 1}),
                },
                Part::text("answer"),
            ],
            message_id: "m1".to_string(),
            context_id: None,
            task_id: None,
        };
        assert_eq!(msg.first_text(), Some("answer"));
        assert_eq!(msg.text_content(), "answer");
    }

    #[test]
    fn test_snapshot_decodes_without_optional_fields() {
        let body = r#"{"task_id":"t1","state":"working","status":{"state":"working"}}"#;
        let snapshot: TaskSnapshot = serde_json::from_str(body).unwrap();
        assert_eq!(snapshot.state, TaskState::Working);
        assert!(snapshot.status.message.is_none());
        assert!(snapshot.context_id.is_none());
    }

    #[test]
    fn test_agent_card_camel_case() {
        let card = AgentCard {
            name: "Agent".to_string(),
            description: "desc".to_string(),
            url: "http://localhost:1/".to_string(),
            version: "1.0.0".to_string(),
            capabilities: AgentCapabilities::default(),
            skills: vec![AgentSkill::new("s", "S", "skill", &["tag"])],
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["defaultInputModes"][0], "text");
        assert_eq!(json["capabilities"]["streaming"], false);
        assert_eq!(json["skills"][0]["tags"][0], "tag");
    }
}
