//! Tool-calling agent.
//!
//! The agent sends a question to a chat model together with the registered
//! course tools, executes whatever tools the model asks for, and feeds the
//! results back until the model answers in text or the round budget runs out.

mod runner;
mod state;

pub use runner::{Agent, AgentResponse, DEFAULT_MAX_ROUNDS};
pub use state::{ConversationState, Phase, ToolCallRecord};
