//! Question answering over the course catalog.
//!
//! [`RagEngine`] is the entry point for a request layer: it wraps the user's
//! question, wires the course tools into a fresh registry and lets the agent
//! decide whether to search.

use crate::agent::{Agent, DEFAULT_MAX_ROUNDS};
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::llm::{ChatModel, ModelParams};
use crate::store::{CourseCatalog, CourseSearch};
use crate::tools::{CourseOutlineTool, CourseSearchTool, Source, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Answer to a single question.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Sources the answer was grounded on, if any tool recorded them.
    pub sources: Vec<Source>,
}

/// Catalog statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// RAG engine for course questions.
pub struct RagEngine {
    agent: Agent,
    search: Arc<dyn CourseSearch>,
    catalog: Arc<dyn CourseCatalog>,
    prompts: Prompts,
    max_rounds: usize,
}

impl RagEngine {
    /// Create an engine with default prompts and round budget.
    pub fn new(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn CourseSearch>,
        catalog: Arc<dyn CourseCatalog>,
        params: ModelParams,
    ) -> Self {
        Self {
            agent: Agent::new(model, params),
            search,
            catalog,
            prompts: Prompts::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Create an engine from loaded settings and prompts.
    pub fn from_settings(
        model: Arc<dyn ChatModel>,
        search: Arc<dyn CourseSearch>,
        catalog: Arc<dyn CourseCatalog>,
        settings: &Settings,
        prompts: Prompts,
    ) -> Self {
        Self {
            agent: Agent::from_settings(model, settings, &prompts),
            search,
            catalog,
            prompts,
            max_rounds: settings.generation.max_rounds,
        }
    }

    /// Override the tool-round budget.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Answer a question, optionally in the context of earlier turns.
    #[instrument(skip(self, history), fields(question = %question))]
    pub async fn ask(&self, question: &str, history: Option<&str>) -> Result<RagResponse> {
        info!("Processing question: {}", question);

        // Each query gets its own tools so recorded sources never leak between calls.
        let registry = self.registry()?;
        let query = self.prompts.render_question(question);

        let response = self
            .agent
            .generate(&query, history, Some(&registry), self.max_rounds)
            .await?;

        info!(
            "Answered with {} tool call(s) and {} source(s)",
            response.tool_calls.len(),
            response.sources.len()
        );

        Ok(RagResponse {
            answer: response.answer,
            sources: response.sources,
        })
    }

    /// Number and titles of the courses in the catalog.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let courses = self.catalog.all_courses_metadata().await?;
        Ok(CourseAnalytics {
            total_courses: courses.len(),
            course_titles: courses.into_iter().map(|c| c.title).collect(),
        })
    }

    fn registry(&self) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(
            self.search.clone(),
            self.catalog.clone(),
        )))?;
        registry.register(Arc::new(CourseOutlineTool::new(self.catalog.clone())))?;
        Ok(registry)
    }
}
