//! Conversation state threaded through the tool-calling loop.

use crate::llm::{Message, ModelParams, ModelResponse};
use crate::tools::{Source, ToolDefinition, ToolRegistry};

/// Phases of the tool-calling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// About to call the model (after the termination check).
    Thinking,
    /// Branching on the shape of the last response.
    Deciding,
    /// Running the tools the model asked for.
    ToolExecuting,
    /// Done; the last response holds the answer.
    Terminated,
}

/// Record of a tool call made while answering.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Tool-use id assigned by the model.
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
    /// Text returned to the model.
    pub result: String,
    /// Round in which the call ran, starting at 0.
    pub round: usize,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.input)
    }
}

/// Mutable state of one `generate` call. Never shared between queries.
pub struct ConversationState<'a> {
    pub query: String,
    pub system_prompt: String,
    pub params: ModelParams,
    /// Definitions advertised to the model, or `None` when no tools exist.
    pub tools: Option<Vec<ToolDefinition>>,
    pub registry: Option<&'a ToolRegistry>,
    /// Wire-ordered, append-only message list.
    pub messages: Vec<Message>,
    /// Completed tool-execution rounds.
    pub round_number: usize,
    pub max_rounds: usize,
    pub last_response: Option<ModelResponse>,
    pub should_terminate: bool,
    pub termination_reason: Option<String>,
    /// Sources from the most recent tool execution that recorded any.
    pub sources: Vec<Source>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub model_calls: usize,
}

impl<'a> ConversationState<'a> {
    /// Fresh state seeded with the query as the only message.
    pub fn new(
        query: &str,
        system_prompt: String,
        params: ModelParams,
        registry: Option<&'a ToolRegistry>,
        max_rounds: usize,
    ) -> Self {
        let tools = registry
            .map(|r| r.definitions())
            .filter(|definitions| !definitions.is_empty());

        Self {
            query: query.to_string(),
            system_prompt,
            params,
            tools,
            registry,
            messages: vec![Message::user_text(query)],
            round_number: 0,
            max_rounds,
            last_response: None,
            should_terminate: false,
            termination_reason: None,
            sources: Vec::new(),
            tool_calls: Vec::new(),
            model_calls: 0,
        }
    }

    /// Whether the next model call may offer tools.
    ///
    /// Withholding tools once the round budget is spent is what forces the
    /// final call to produce text.
    pub fn tools_allowed(&self) -> bool {
        self.round_number < self.max_rounds && self.tools.is_some()
    }

    /// Evaluated before every model call, including the first.
    pub fn check_termination(&self) -> bool {
        // The tool-free final call has already happened.
        if self.round_number > self.max_rounds {
            return true;
        }

        // A text answer ends the loop at any round, including round == max.
        if self
            .last_response
            .as_ref()
            .is_some_and(|response| !response.is_tool_use())
        {
            return true;
        }

        self.should_terminate
    }

    pub(crate) fn terminate(&mut self, reason: impl Into<String>) {
        self.should_terminate = true;
        self.termination_reason = Some(reason.into());
    }

    /// Branch on the last response: run tools or stop.
    pub fn decide(&mut self) -> Phase {
        let Some(response) = &self.last_response else {
            self.terminate("No response received");
            return Phase::Terminated;
        };

        if response.is_tool_use() {
            Phase::ToolExecuting
        } else {
            let reason = format!("Natural end: {}", response.stop_reason);
            self.terminate(reason);
            Phase::Terminated
        }
    }

    /// Text of the first text block of the final response, or empty.
    pub fn final_answer(&self) -> String {
        self.last_response
            .as_ref()
            .and_then(|response| response.first_text())
            .unwrap_or_default()
            .to_string()
    }
}
