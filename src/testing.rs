//! Test doubles shared by the unit tests.

use crate::embedding::Embedder;
use crate::error::{CoursemateError, Result};
use crate::llm::{ChatModel, CompletionRequest, ContentBlock, ModelResponse, StopReason};
use crate::store::{ChunkMetadata, Course, CourseCatalog, CourseSearch, Lesson, SearchResults};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Bag-of-words embedder: every distinct lowercase word gets its own axis.
pub struct KeywordEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
    dimensions: usize,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self {
            vocabulary: Mutex::new(HashMap::new()),
            dimensions: 512,
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; self.dimensions];
        let mut vocabulary = self.vocabulary.lock().unwrap();
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = vocabulary.len();
            let index = *vocabulary.entry(word.to_lowercase()).or_insert(next);
            if index >= self.dimensions {
                return Err(CoursemateError::Embedding("vocabulary full".to_string()));
            }
            vector[index] += 1.0;
        }
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Chat model that replays queued responses and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a transport failure.
    pub fn push_error(&self, error: CoursemateError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CoursemateError::Llm("script exhausted".to_string())))
    }
}

/// A final text answer.
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        stop_reason: StopReason::EndTurn,
        content: vec![ContentBlock::text(text)],
    }
}

/// A response requesting the given tools, as `(id, name, input)`.
pub fn tool_use_response(calls: &[(&str, &str, Value)]) -> ModelResponse {
    ModelResponse {
        stop_reason: StopReason::ToolUse,
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: input.clone(),
            })
            .collect(),
    }
}

/// Course collaborators with canned answers and call counters.
pub struct StubStore {
    pub results: Mutex<SearchResults>,
    pub resolved: Option<String>,
    pub courses: Vec<Course>,
    pub search_calls: AtomicUsize,
    pub metadata_calls: AtomicUsize,
    pub link_calls: AtomicUsize,
}

impl StubStore {
    /// A store resolving every name to "Test Course" with two lessons.
    pub fn new() -> Self {
        Self {
            results: Mutex::new(SearchResults {
                documents: vec!["Sample content 1".to_string(), "Sample content 2".to_string()],
                metadata: vec![
                    ChunkMetadata {
                        course_title: "Test Course".to_string(),
                        lesson_number: Some(1),
                    },
                    ChunkMetadata {
                        course_title: "Test Course".to_string(),
                        lesson_number: Some(2),
                    },
                ],
                distances: vec![0.1, 0.2],
                error: None,
            }),
            resolved: Some("Test Course".to_string()),
            courses: vec![Course {
                title: "Test Course".to_string(),
                course_link: Some("https://example.com/test".to_string()),
                instructor: Some("Test Instructor".to_string()),
                lessons: vec![
                    Lesson {
                        lesson_number: 1,
                        title: "Getting Started".to_string(),
                        lesson_link: Some("https://example.com/l1".to_string()),
                    },
                    Lesson {
                        lesson_number: 2,
                        title: "Going Further".to_string(),
                        lesson_link: Some("https://example.com/l2".to_string()),
                    },
                ],
            }],
            search_calls: AtomicUsize::new(0),
            metadata_calls: AtomicUsize::new(0),
            link_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_results(self, results: SearchResults) -> Self {
        *self.results.lock().unwrap() = results;
        self
    }

    pub fn unresolvable(mut self) -> Self {
        self.resolved = None;
        self
    }

    pub fn with_courses(mut self, courses: Vec<Course>) -> Self {
        self.courses = courses;
        self
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn metadata_fetches(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn link_lookups(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CourseSearch for StubStore {
    async fn search(
        &self,
        _query: &str,
        _course_name: Option<&str>,
        _lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.lock().unwrap().clone())
    }
}

#[async_trait]
impl CourseCatalog for StubStore {
    async fn resolve_course_name(&self, _partial: &str) -> Result<Option<String>> {
        Ok(self.resolved.clone())
    }

    async fn all_courses_metadata(&self) -> Result<Vec<Course>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.courses.clone())
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .courses
            .iter()
            .find(|c| c.title == course_title)
            .and_then(|c| c.lessons.iter().find(|l| l.lesson_number == lesson_number))
            .and_then(|l| l.lesson_link.clone()))
    }
}
