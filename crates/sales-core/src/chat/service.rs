//! Chat service
//!
//! Stores each customer message, asks the manager agent for a reply and
//! returns the session history.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::store::ChatStore;
use super::types::{ChatMessage, ChatSession, Sender};
use crate::a2a::{ConsultationClient, ConsultationOutcome, Message, TaskState, Unavailability};
use crate::agents::orchestrator::{format_transcript, preview, Speaker};
use crate::{Error, Result};

/// Reply stored when the manager could not produce one
pub const GENERIC_REPLY: &str = "I'm having trouble answering right now. Could you please rephrase your question or try again in a moment?";

pub struct ChatService {
    store: Arc<Mutex<ChatStore>>,
    manager: ConsultationClient,
    send_transcript: bool,
}

impl ChatService {
    pub fn new(store: ChatStore, manager: ConsultationClient, send_transcript: bool) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            manager,
            send_transcript,
        }
    }

    /// Handle one customer message.
    ///
    /// A new session is opened when `session_id` is `None`. Posting into a
    /// session owned by another user is reported as not found.
    pub async fn process_user_message(
        &self,
        user_id: &str,
        content: &str,
        session_id: Option<String>,
    ) -> Result<ChatSession> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::InvalidRequest("Message content is empty".to_string()));
        }

        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let request_text = {
            let store = self.store.lock().await;
            if let Some(owner) = store.session_owner(&session_id)? {
                if owner != user_id {
                    return Err(Error::SessionNotFound(session_id));
                }
            }
            store.create_message(&session_id, user_id, Sender::User, content)?;

            if self.send_transcript {
                let history = store.messages_by_session(&session_id)?;
                transcript_of(&history)
            } else {
                content.to_string()
            }
        };

        info!(session_id = %session_id, user_id = %user_id, "Forwarding message to manager: {}", preview(content, 100));
        let outcome = self
            .manager
            .consult_message(Message::user_text(request_text).with_context_id(&session_id))
            .await;
        let reply = reply_for(&session_id, outcome);

        let store = self.store.lock().await;
        store.create_message(&session_id, user_id, Sender::Agent, &reply)?;
        Ok(ChatSession {
            messages: store.messages_by_session(&session_id)?,
            session_id,
        })
    }

    /// History of a session owned by `user_id`
    pub async fn history(&self, user_id: &str, session_id: &str) -> Result<ChatSession> {
        let store = self.store.lock().await;
        let messages = store.messages_by_session(session_id)?;

        match messages.first() {
            Some(first) if first.user_id == user_id => Ok(ChatSession {
                session_id: session_id.to_string(),
                messages,
            }),
            _ => Err(Error::SessionNotFound(session_id.to_string())),
        }
    }
}

fn transcript_of(history: &[ChatMessage]) -> String {
    format_transcript(history.iter().map(|m| {
        let speaker = match m.sender {
            Sender::User => Speaker::Customer,
            Sender::Agent => Speaker::Agent,
        };
        (speaker, m.content.as_str())
    }))
}

/// Text shown to the customer for a manager outcome.
///
/// A failed manager task carries a user-facing error message and is shown
/// as-is; every other unavailability is replaced by [`GENERIC_REPLY`].
fn reply_for(session_id: &str, outcome: ConsultationOutcome) -> String {
    match outcome {
        ConsultationOutcome::Reply(text) => text,
        ConsultationOutcome::Unavailable(Unavailability::Unsuccessful {
            state: TaskState::Failed,
            message: Some(message),
            ..
        }) => {
            warn!(session_id = %session_id, "Manager task failed: {}", message);
            message
        }
        ConsultationOutcome::Unavailable(reason) => {
            warn!(session_id = %session_id, "Manager unavailable: {}", reason);
            GENERIC_REPLY.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_mapping() {
        assert_eq!(
            reply_for("s", ConsultationOutcome::Reply("hi".to_string())),
            "hi"
        );

        let failed = ConsultationOutcome::Unavailable(Unavailability::Unsuccessful {
            task_id: "t".to_string(),
            state: TaskState::Failed,
            message: Some("Unfortunately, an error occurred while processing your request: x".to_string()),
        });
        assert!(reply_for("s", failed).starts_with("Unfortunately"));

        let canceled = ConsultationOutcome::Unavailable(Unavailability::Unsuccessful {
            task_id: "t".to_string(),
            state: TaskState::Canceled,
            message: None,
        });
        assert_eq!(reply_for("s", canceled), GENERIC_REPLY);

        let down = ConsultationOutcome::Unavailable(Unavailability::Transport("refused".to_string()));
        assert_eq!(reply_for("s", down), GENERIC_REPLY);
    }
}
