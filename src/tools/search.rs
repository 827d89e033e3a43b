//! Semantic search over course content.

use super::outline::{lookup_outline, OutlineLookup};
use super::{parse_input, Source, SourceSlot, Tool, ToolDefinition, ToolOutput};
use crate::error::Result;
use crate::store::{CourseCatalog, CourseSearch, SearchResults};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Query fragments that signal the user wants a course outline.
const OUTLINE_KEYWORDS: &[&str] = &[
    "outline",
    "syllabus",
    "课程大纲",
    "大纲",
    "课时",
    "lessons",
    "curriculum",
];

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
    course_name: Option<String>,
    lesson_number: Option<u32>,
    get_outline: Option<bool>,
}

impl SearchInput {
    /// Course filter, with blank names treated as absent.
    fn course_name(&self) -> Option<&str> {
        self.course_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }
}

/// Tool searching course passages, with outline detection.
///
/// Requests that look like outline requests and name a course are answered
/// from course metadata without a semantic search.
pub struct CourseSearchTool {
    search: Arc<dyn CourseSearch>,
    catalog: Arc<dyn CourseCatalog>,
    last_sources: SourceSlot,
    last_was_outline: AtomicBool,
}

impl CourseSearchTool {
    pub const NAME: &'static str = "search_course_content";

    pub fn new(search: Arc<dyn CourseSearch>, catalog: Arc<dyn CourseCatalog>) -> Self {
        Self {
            search,
            catalog,
            last_sources: SourceSlot::default(),
            last_was_outline: AtomicBool::new(false),
        }
    }

    /// Whether the most recent execution rendered an outline.
    pub fn last_was_outline(&self) -> bool {
        self.last_was_outline.load(Ordering::SeqCst)
    }

    async fn run(&self, input: SearchInput) -> Result<ToolOutput> {
        let course_name = input.course_name();

        if let Some(course_name) = course_name {
            if input.get_outline.unwrap_or(false) || is_outline_request(&input.query) {
                debug!("Routing '{}' to outline lookup for '{}'", input.query, course_name);
                let lookup = lookup_outline(self.catalog.as_ref(), course_name).await?;
                self.last_was_outline
                    .store(matches!(lookup, OutlineLookup::Found(_)), Ordering::SeqCst);
                return Ok(lookup.into_output());
            }
        }

        self.last_was_outline.store(false, Ordering::SeqCst);

        let results = self
            .search
            .search(&input.query, course_name, input.lesson_number)
            .await?;

        if let Some(error) = results.error {
            return Ok(ToolOutput::text(error));
        }

        if results.is_empty() {
            let mut filter_info = String::new();
            if let Some(course_name) = course_name {
                filter_info.push_str(&format!(" in course '{}'", course_name));
            }
            if let Some(lesson_number) = input.lesson_number {
                filter_info.push_str(&format!(" in lesson {}", lesson_number));
            }
            return Ok(ToolOutput::text(format!(
                "No relevant content found{}.",
                filter_info
            )));
        }

        self.format_results(results).await
    }

    /// Render passages under `[Course - Lesson N]` headers and collect
    /// deduplicated sources in first-seen order.
    async fn format_results(&self, results: SearchResults) -> Result<ToolOutput> {
        let mut blocks = Vec::with_capacity(results.len());
        let mut seen = HashSet::new();
        let mut sources = Vec::new();

        for (document, meta) in results.documents.iter().zip(&results.metadata) {
            let display_name = match meta.lesson_number {
                Some(n) => format!("{} - Lesson {}", meta.course_title, n),
                None => meta.course_title.clone(),
            };

            if seen.insert(display_name.clone()) {
                let link = match meta.lesson_number {
                    Some(n) => self.catalog.lesson_link(&meta.course_title, n).await?,
                    None => None,
                };
                sources.push(Source {
                    display_name: display_name.clone(),
                    link,
                });
            }

            blocks.push(format!("[{}]\n{}", display_name, document));
        }

        Ok(ToolOutput::with_sources(blocks.join("\n\n"), sources))
    }
}

fn is_outline_request(query: &str) -> bool {
    let query = query.to_lowercase();
    OUTLINE_KEYWORDS.iter().any(|keyword| query.contains(keyword))
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson \
                filtering. Can also retrieve course outlines/syllabi."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    },
                    "get_outline": {
                        "type": "boolean",
                        "description": "Set to true if requesting course outline/syllabus/lesson list",
                        "default": false
                    }
                },
                "required": ["query"]
            }),
        }
    }

    #[instrument(skip_all)]
    async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput> {
        let input: SearchInput = parse_input(Self::NAME, input)?;
        let output = self.run(input).await?;
        self.last_sources.record(&output);
        Ok(output)
    }

    fn last_sources(&self) -> Vec<Source> {
        self.last_sources.get()
    }

    fn reset_sources(&self) {
        self.last_sources.set(Vec::new());
    }
}
