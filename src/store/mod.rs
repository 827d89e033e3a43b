//! Course corpus abstraction.
//!
//! The retrieval tools only see the two traits here: [`CourseSearch`] for
//! semantic passage search and [`CourseCatalog`] for course metadata. Any
//! vector database can sit behind them; [`MemoryCourseStore`] is the bundled
//! in-process implementation.

mod memory;

pub use memory::MemoryCourseStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Sequential lesson number (1, 2, 3, ...).
    pub lesson_number: u32,
    pub title: String,
    pub lesson_link: Option<String>,
}

/// A course and its ordered lessons. The title is the unique identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub course_link: Option<String>,
    pub instructor: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

/// A chunk of course text, ready for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    pub content: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    /// Position of this chunk in its source document.
    pub chunk_index: u32,
}

/// Where a retrieved passage came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
}

/// Passages returned by a search, aligned by index.
///
/// A search that could not run (e.g. an unknown course filter) carries a
/// human-readable `error` instead of results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
    /// Distance per passage (lower is closer).
    pub distances: Vec<f32>,
    pub error: Option<String>,
}

impl SearchResults {
    /// An empty result set carrying an error message.
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of passages.
    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Semantic search over course passages.
#[async_trait]
pub trait CourseSearch: Send + Sync {
    /// Search passages, optionally restricted to a (fuzzy) course name and a
    /// lesson number.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults>;
}

/// Course metadata lookups.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Resolve a partial course name to its canonical title.
    async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>>;

    /// Metadata for every stored course.
    async fn all_courses_metadata(&self) -> Result<Vec<Course>>;

    /// Link for a specific lesson, if one is stored.
    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
