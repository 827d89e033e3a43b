//! Agent runner with the bounded tool-calling loop.

use super::state::{ConversationState, Phase, ToolCallRecord};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::llm::{ChatModel, CompletionRequest, ContentBlock, Message, ModelParams, Role, ToolChoice};
use crate::tools::{Source, ToolOutput, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Default ceiling on tool-execution rounds per query.
pub const DEFAULT_MAX_ROUNDS: usize = 2;

/// Answers questions with a chat model, running retrieval tools on request.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    params: ModelParams,
    system_prompt: String,
}

impl Agent {
    /// Create an agent with the default system prompt.
    pub fn new(model: Arc<dyn ChatModel>, params: ModelParams) -> Self {
        Self {
            model,
            params,
            system_prompt: Prompts::default().generator.system,
        }
    }

    /// Create an agent from loaded settings and prompts.
    pub fn from_settings(model: Arc<dyn ChatModel>, settings: &Settings, prompts: &Prompts) -> Self {
        Self::new(model, settings.model_params()).with_system_prompt(&prompts.generator.system)
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Answer `query`, letting the model use the registry's tools for at most
    /// `max_rounds` rounds.
    ///
    /// At most `max_rounds + 1` model calls are made. Tool failures are fed
    /// back to the model as results; model call failures are returned.
    #[instrument(skip_all, fields(query = %query, max_rounds = max_rounds))]
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        registry: Option<&ToolRegistry>,
        max_rounds: usize,
    ) -> Result<AgentResponse> {
        let system_prompt = match history {
            Some(history) if !history.is_empty() => {
                format!("{}\n\nPrevious conversation:\n{}", self.system_prompt, history)
            }
            _ => self.system_prompt.clone(),
        };

        let mut state =
            ConversationState::new(query, system_prompt, self.params.clone(), registry, max_rounds);
        let mut phase = Phase::Thinking;

        loop {
            phase = match phase {
                Phase::Thinking => {
                    if state.check_termination() {
                        Phase::Terminated
                    } else {
                        self.think(&mut state).await?;
                        Phase::Deciding
                    }
                }
                Phase::Deciding => state.decide(),
                Phase::ToolExecuting => {
                    execute_tools(&mut state).await;
                    Phase::Thinking
                }
                Phase::Terminated => break,
            };
        }

        debug!(
            "Finished after {} model call(s), {} round(s): {}",
            state.model_calls,
            state.round_number,
            state.termination_reason.as_deref().unwrap_or("terminated")
        );

        Ok(AgentResponse {
            answer: state.final_answer(),
            sources: state.sources,
            tool_calls: state.tool_calls,
            rounds: state.round_number,
            model_calls: state.model_calls,
            termination_reason: state.termination_reason,
        })
    }

    /// Call the model, offering tools only while rounds remain.
    async fn think(&self, state: &mut ConversationState<'_>) -> Result<()> {
        let (tools, tool_choice) = if state.tools_allowed() {
            (state.tools.clone(), Some(ToolChoice::Auto))
        } else {
            (None, None)
        };

        debug!(
            "Model call {} (round {}, tools offered: {})",
            state.model_calls + 1,
            state.round_number,
            tools.is_some()
        );

        let request = CompletionRequest {
            system: state.system_prompt.clone(),
            messages: state.messages.clone(),
            params: state.params.clone(),
            tools,
            tool_choice,
        };

        let response = self.model.complete(&request).await?;
        state.model_calls += 1;
        state.last_response = Some(response);
        Ok(())
    }
}

/// Run every tool-use block of the last response, in order, and append the
/// assistant request and the batched results to the conversation.
async fn execute_tools(state: &mut ConversationState<'_>) {
    let Some(response) = state.last_response.as_ref().filter(|r| r.is_tool_use()) else {
        return;
    };
    let content = response.content.clone();

    state.messages.push(Message {
        role: Role::Assistant,
        content: content.clone(),
    });

    // Results of a request made after tools were withheld never reach the
    // model, so they must not become the answer's citations.
    let cite_sources = state.round_number < state.max_rounds;

    let mut results = Vec::new();
    for block in content {
        let ContentBlock::ToolUse { id, name, input } = block else {
            continue;
        };

        let outcome = match state.registry {
            Some(registry) => registry.dispatch(&name, &input).await,
            None => Ok(ToolOutput::text(format!("Tool '{}' not found", name))),
        };

        let result = match outcome {
            Ok(output) => {
                if let Some(sources) = output.sources.filter(|_| cite_sources) {
                    state.sources = sources;
                }
                output.content
            }
            Err(e) => {
                warn!("Tool '{}' failed: {}", name, e);
                format!("Error executing tool: {}", e)
            }
        };

        info!("Tool '{}' returned {} bytes", name, result.len());

        results.push(ContentBlock::ToolResult {
            tool_use_id: id.clone(),
            content: result.clone(),
        });
        state.tool_calls.push(ToolCallRecord {
            id,
            name,
            input,
            result,
            round: state.round_number,
        });
    }

    if !results.is_empty() {
        state.messages.push(Message {
            role: Role::User,
            content: results,
        });
    }

    state.round_number += 1;
}

/// Response from an agent run.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The final answer text (empty if the model produced none).
    pub answer: String,
    /// Sources recorded by the most recent tool execution that set any.
    pub sources: Vec<Source>,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Tool-execution rounds that ran.
    pub rounds: usize,
    /// Number of model calls made.
    pub model_calls: usize,
    /// Why the loop stopped.
    pub termination_reason: Option<String>,
}
