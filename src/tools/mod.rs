//! Retrieval tools the model can call, and the registry that dispatches them.

mod outline;
mod registry;
mod search;

pub use outline::CourseOutlineTool;
pub use registry::ToolRegistry;
pub use search::CourseSearchTool;

use crate::error::{CoursemateError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name within a registry.
    pub name: String,
    pub description: String,
    /// JSON schema of the tool's input object.
    pub input_schema: serde_json::Value,
}

/// A citation pointing back to the course material behind an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub display_name: String,
    pub link: Option<String>,
}

/// Result of one tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text fed back to the model.
    pub content: String,
    /// Replacement source list, or `None` when this execution left the
    /// previous sources untouched.
    pub sources: Option<Vec<Source>>,
}

impl ToolOutput {
    /// Output that does not touch sources.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: None,
        }
    }

    /// Output that replaces the sources.
    pub fn with_sources(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            content: content.into(),
            sources: Some(sources),
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Definition advertised to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool. Errors are reported to the model, not to the user.
    async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput>;

    /// Sources recorded by the most recent execution.
    fn last_sources(&self) -> Vec<Source> {
        Vec::new()
    }

    /// Forget recorded sources.
    fn reset_sources(&self) {}
}

/// Per-tool storage for the last recorded sources.
#[derive(Debug, Default)]
struct SourceSlot(Mutex<Vec<Source>>);

impl SourceSlot {
    fn get(&self) -> Vec<Source> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, sources: Vec<Source>) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = sources;
    }

    /// Record the sources carried by `output`, if any.
    fn record(&self, output: &ToolOutput) {
        if let Some(sources) = &output.sources {
            self.set(sources.clone());
        }
    }
}

/// Deserialize a tool's input object.
fn parse_input<T: DeserializeOwned>(tool: &str, input: &serde_json::Value) -> Result<T> {
    serde_json::from_value(input.clone())
        .map_err(|e| CoursemateError::InvalidInput(format!("Invalid arguments for {}: {}", tool, e)))
}
