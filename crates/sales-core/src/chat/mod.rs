//! Chat backend: message history and the manager round trip

mod service;
mod store;
mod types;

pub use service::{ChatService, GENERIC_REPLY};
pub use store::ChatStore;
pub use types::{ChatMessage, ChatSession, Sender};
