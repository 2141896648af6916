//! Sales agents
//!
//! Two executors plug into the same [`TaskEngine`](crate::a2a::TaskEngine):
//!
//! ```text
//! chat backend ──► manager agent ──► expert agent
//!                  ManagerExecutor    ExpertExecutor
//!                  (consults expert)  (catalog + calculator)
//! ```

pub mod cards;
pub mod catalog;
pub mod expert;
pub mod manager;
pub mod orchestrator;

pub use cards::{card_for, expert_card, manager_card};
pub use expert::ExpertExecutor;
pub use manager::ManagerExecutor;
pub use orchestrator::{format_transcript, Speaker};
