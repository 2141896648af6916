//! Agent-to-agent task protocol
//!
//! - [`TaskEngine`]: hosts an executor, owns its tasks
//! - [`TaskExecutor`]: agent logic contract
//! - [`ConsultationClient`]: submit-and-poll client for remote agents

mod consult;
mod engine;
mod executor;
mod store;
mod transport;
mod types;

pub use consult::{ConsultationClient, ConsultationOutcome, PollPolicy, TaskHandle, Unavailability};
pub use engine::TaskEngine;
pub use executor::{RequestContext, TaskExecutor, TaskUpdater};
pub use store::{InMemoryTaskStore, TaskStore};
pub use transport::{AGENT_CARD_PATH, AgentTransport, HttpAgentTransport, LoopbackTransport};
pub use types::{
    AgentCapabilities, AgentCard, AgentSkill, CancelResponse, ErrorResponse, Message, Part, Role,
    SendMessageRequest, SubmitResponse, Task, TaskSnapshot, TaskState, TaskStatus,
};
