//! Name-keyed tool registry.

use super::{Source, Tool, ToolDefinition, ToolOutput};
use crate::error::{CoursemateError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tools available to the model, in registration order.
///
/// Registering a name twice replaces the earlier tool but keeps its position.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under the name from its definition.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.definition().name;
        if name.trim().is_empty() {
            return Err(CoursemateError::Config(
                "Tool must have a name in its definition".to_string(),
            ));
        }

        match self.tools.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => {
                debug!("Replacing registered tool '{}'", name);
                slot.1 = tool;
            }
            None => {
                debug!("Registered tool '{}'", name);
                self.tools.push((name, tool));
            }
        }
        Ok(())
    }

    /// Definitions of all tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|(_, tool)| tool.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool.
    ///
    /// An unknown name is not an error: the model gets a
    /// `Tool '<name>' not found` result it can react to. Failures of a
    /// known tool are returned as `Err`.
    pub async fn dispatch(&self, name: &str, input: &serde_json::Value) -> Result<ToolOutput> {
        let Some((_, tool)) = self.tools.iter().find(|(n, _)| n == name) else {
            warn!("Model requested unknown tool '{}'", name);
            return Ok(ToolOutput::text(format!("Tool '{}' not found", name)));
        };

        info!("Calling tool: {} with args: {}", name, input);
        tool.execute(input).await
    }

    /// First non-empty source list, scanning tools in registration order.
    pub fn last_sources(&self) -> Vec<Source> {
        self.tools
            .iter()
            .map(|(_, tool)| tool.last_sources())
            .find(|sources| !sources.is_empty())
            .unwrap_or_default()
    }

    /// Clear recorded sources on every tool.
    pub fn reset_sources(&self) {
        for (_, tool) in &self.tools {
            tool.reset_sources();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubStore;
    use crate::tools::{CourseOutlineTool, CourseSearchTool};
    use async_trait::async_trait;
    use serde_json::json;

    /// Tool echoing its input under a configurable name.
    struct EchoTool {
        name: String,
        tag: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.clone(),
                description: "Echo".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput> {
            Ok(ToolOutput::text(format!("{}:{}", self.tag, input)))
        }
    }

    fn echo(name: &str, tag: &'static str) -> Arc<dyn Tool> {
        Arc::new(EchoTool {
            name: name.to_string(),
            tag,
        })
    }

    fn course_registry(store: &Arc<StubStore>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(CourseSearchTool::new(store.clone(), store.clone())))
            .unwrap();
        registry
            .register(Arc::new(CourseOutlineTool::new(store.clone())))
            .unwrap();
        registry
    }

    #[test]
    fn test_register_rejects_unnamed_tool() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(echo("", "x")).unwrap_err();
        assert!(matches!(err, CoursemateError::Config(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_definitions_in_registration_order() {
        let store = Arc::new(StubStore::new());
        let names: Vec<String> = course_registry(&store)
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["search_course_content", "get_course_outline"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_last_write_wins_in_place() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("alpha", "first")).unwrap();
        registry.register(echo("beta", "beta")).unwrap();
        registry.register(echo("alpha", "second")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.definitions()[0].name, "alpha");

        let output = registry.dispatch("alpha", &json!({})).await.unwrap();
        assert_eq!(output.content, "second:{}");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool_returns_sentinel() {
        let registry = ToolRegistry::new();
        let output = registry.dispatch("x", &json!({})).await.unwrap();
        assert_eq!(output.content, "Tool 'x' not found");
        assert_eq!(output.sources, None);
    }

    #[tokio::test]
    async fn test_dispatch_forwards_input_verbatim() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("echo", "e")).unwrap();
        let output = registry.dispatch("echo", &json!({"a": 1})).await.unwrap();
        assert_eq!(output.content, r#"e:{"a":1}"#);
    }

    #[tokio::test]
    async fn test_last_sources_and_reset() {
        let store = Arc::new(StubStore::new());
        let registry = course_registry(&store);
        assert!(registry.last_sources().is_empty());

        registry
            .dispatch("get_course_outline", &json!({"course_title": "Test"}))
            .await
            .unwrap();
        // The search tool has nothing recorded, so the outline tool's sources win.
        assert_eq!(registry.last_sources()[0].display_name, "Test Course");

        registry
            .dispatch("search_course_content", &json!({"query": "intro"}))
            .await
            .unwrap();
        assert_eq!(registry.last_sources()[0].display_name, "Test Course - Lesson 1");

        registry.reset_sources();
        assert!(registry.last_sources().is_empty());
    }
}
