//! sales-core: Sales Gateway Core Library
//!
//! Agent-to-agent task protocol, the expert/manager executors that plug into it,
//! the text-completion client, the tool system, and the chat history service.

pub mod a2a;
pub mod agents;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod tool;

pub use a2a::{
    AgentCard, AgentTransport, ConsultationClient, ConsultationOutcome, HttpAgentTransport,
    InMemoryTaskStore, Message, Part, PollPolicy, RequestContext, Role, Task, TaskEngine,
    TaskExecutor, TaskState, TaskStore, TaskUpdater, Unavailability,
};
pub use agents::{ExpertExecutor, ManagerExecutor};
pub use chat::{ChatService, ChatStore};
pub use config::{AgentRole, ApiConfig, ChatConfig, ClientConfig, Config, LlmConfig, LlmProvider, PeerConfig};
pub use error::{Error, ExecutorError, Result};
pub use llm::{CompletionProvider, CompletionRequest, LlmClient, ResponseSchema, StructuredReply};
pub use tool::{Tool, ToolManager, ToolResult};
