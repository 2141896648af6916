//! sales-api: HTTP surfaces for the sales agents
//!
//! Serves the agent task protocol (card, submit, get, cancel) for the expert
//! and manager roles, and the chat backend API for the customer frontend.
//! Built with axum for async HTTP handling.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{agent_app, chat_app, start_agent_server, start_chat_server, AgentState, ChatState};
