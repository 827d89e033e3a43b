//! Course outline lookup.

use super::{parse_input, Source, SourceSlot, Tool, ToolDefinition, ToolOutput};
use crate::error::Result;
use crate::store::{Course, CourseCatalog};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Outcome of resolving and rendering a course outline.
pub(super) enum OutlineLookup {
    /// The course could not be resolved or its metadata is missing.
    Missing(String),
    /// A rendered outline.
    Found(ToolOutput),
}

impl OutlineLookup {
    pub(super) fn into_output(self) -> ToolOutput {
        match self {
            OutlineLookup::Missing(message) => ToolOutput::text(message),
            OutlineLookup::Found(output) => output,
        }
    }
}

/// Resolve a possibly partial course name and render its outline.
///
/// Metadata is only fetched once the name has resolved.
pub(super) async fn lookup_outline(catalog: &dyn CourseCatalog, course_name: &str) -> Result<OutlineLookup> {
    let Some(title) = catalog.resolve_course_name(course_name).await? else {
        return Ok(OutlineLookup::Missing(format!(
            "Course '{}' not found.",
            course_name
        )));
    };

    let courses = catalog.all_courses_metadata().await?;
    let Some(course) = courses.into_iter().find(|c| c.title == title) else {
        return Ok(OutlineLookup::Missing(format!(
            "Could not retrieve outline for '{}'.",
            title
        )));
    };

    debug!("Rendering outline for '{}' ({} lessons)", course.title, course.lessons.len());
    Ok(OutlineLookup::Found(render_outline(&course)))
}

fn render_outline(course: &Course) -> ToolOutput {
    let mut outline = format!("## Course Outline: {}\n\n", course.title);

    if let Some(instructor) = &course.instructor {
        let _ = write!(outline, "**Instructor:** {}\n\n", instructor);
    }

    let sources = if course.lessons.is_empty() {
        outline.push_str("No lesson information available.\n");
        Vec::new()
    } else {
        outline.push_str("**Lessons:**\n\n");
        for lesson in &course.lessons {
            let _ = writeln!(outline, "- **Lesson {}:** {}", lesson.lesson_number, lesson.title);
        }
        let _ = writeln!(outline, "\n**Total:** {} lessons", course.lessons.len());

        vec![Source {
            display_name: course.title.clone(),
            link: course.course_link.clone(),
        }]
    };

    if let Some(link) = &course.course_link {
        let _ = writeln!(outline, "\n**Course Link:** {}", link);
    }

    ToolOutput::with_sources(outline, sources)
}

#[derive(Debug, Deserialize)]
struct OutlineInput {
    course_title: String,
}

/// Tool returning a course's structured lesson list.
pub struct CourseOutlineTool {
    catalog: Arc<dyn CourseCatalog>,
    last_sources: SourceSlot,
}

impl CourseOutlineTool {
    pub const NAME: &'static str = "get_course_outline";

    pub fn new(catalog: Arc<dyn CourseCatalog>) -> Self {
        Self {
            catalog,
            last_sources: SourceSlot::default(),
        }
    }
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Get the course outline, syllabus, or lesson list for a specific course. \
                Returns course title, course link, instructor, and complete lesson list with \
                lesson numbers and titles."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "course_title": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    }
                },
                "required": ["course_title"]
            }),
        }
    }

    #[instrument(skip_all)]
    async fn execute(&self, input: &serde_json::Value) -> Result<ToolOutput> {
        let input: OutlineInput = parse_input(Self::NAME, input)?;
        let output = lookup_outline(self.catalog.as_ref(), &input.course_title)
            .await?
            .into_output();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Lesson;
    use crate::testing::StubStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_outline_renders_lessons_and_link() {
        let store = Arc::new(StubStore::new());
        let tool = CourseOutlineTool::new(store.clone());

        let output = tool.execute(&json!({"course_title": "Test"})).await.unwrap();

        assert_eq!(
            output.content,
            "## Course Outline: Test Course\n\n\
             **Instructor:** Test Instructor\n\n\
             **Lessons:**\n\n\
             - **Lesson 1:** Getting Started\n\
             - **Lesson 2:** Going Further\n\
             \n**Total:** 2 lessons\n\
             \n**Course Link:** https://example.com/test\n"
        );
        assert_eq!(
            tool.last_sources(),
            vec![Source {
                display_name: "Test Course".to_string(),
                link: Some("https://example.com/test".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_unresolved_course_never_fetches_metadata() {
        let store = Arc::new(StubStore::new().unresolvable());
        let tool = CourseOutlineTool::new(store.clone());

        let output = tool.execute(&json!({"course_title": "Nonexistent"})).await.unwrap();

        assert_eq!(output.content, "Course 'Nonexistent' not found.");
        assert_eq!(output.sources, None);
        assert_eq!(store.metadata_fetches(), 0);
    }

    #[tokio::test]
    async fn test_course_without_lessons_clears_sources() {
        let store = Arc::new(StubStore::new().with_courses(vec![Course {
            title: "Test Course".to_string(),
            course_link: None,
            instructor: None,
            lessons: Vec::new(),
        }]));
        let tool = CourseOutlineTool::new(store);
        tool.last_sources.set(vec![Source {
            display_name: "stale".to_string(),
            link: None,
        }]);

        let output = tool.execute(&json!({"course_title": "Test"})).await.unwrap();

        assert!(output.content.contains("No lesson information available."));
        assert!(!output.content.contains("Instructor"));
        assert!(!output.content.contains("Course Link"));
        assert!(tool.last_sources().is_empty());
    }

    #[tokio::test]
    async fn test_resolved_title_missing_from_metadata() {
        let store = Arc::new(StubStore::new().with_courses(vec![Course {
            title: "Other Course".to_string(),
            course_link: None,
            instructor: None,
            lessons: vec![Lesson {
                lesson_number: 1,
                title: "Only".to_string(),
                lesson_link: None,
            }],
        }]));
        let tool = CourseOutlineTool::new(store);

        let output = tool.execute(&json!({"course_title": "Test"})).await.unwrap();
        assert_eq!(output.content, "Could not retrieve outline for 'Test Course'.");
    }

    #[tokio::test]
    async fn test_missing_course_title_is_an_error() {
        let tool = CourseOutlineTool::new(Arc::new(StubStore::new()));
        let err = tool.execute(&json!({})).await.unwrap_err();
        assert!(err.to_string().contains("get_course_outline"));
    }
}
