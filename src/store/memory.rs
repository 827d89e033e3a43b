//! In-memory course store.
//!
//! Useful for testing and small catalogs.

use super::{
    cosine_similarity, ChunkMetadata, Course, CourseCatalog, CourseChunk, CourseSearch,
    SearchResults,
};
use crate::config::SearchSettings;
use crate::embedding::Embedder;
use crate::error::{CoursemateError, Result};
use async_trait::async_trait;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, instrument};

struct StoredCourse {
    course: Course,
    embedding: Vec<f32>,
}

struct StoredChunk {
    chunk: CourseChunk,
    embedding: Vec<f32>,
}

/// In-memory course store ranking passages by cosine similarity.
pub struct MemoryCourseStore {
    embedder: Arc<dyn Embedder>,
    courses: RwLock<Vec<StoredCourse>>,
    chunks: RwLock<Vec<StoredChunk>>,
    max_results: usize,
    min_course_score: f32,
}

impl MemoryCourseStore {
    /// Create an empty store with default search settings.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_settings(embedder, &SearchSettings::default())
    }

    /// Create an empty store with the given search settings.
    pub fn with_settings(embedder: Arc<dyn Embedder>, settings: &SearchSettings) -> Self {
        Self {
            embedder,
            courses: RwLock::new(Vec::new()),
            chunks: RwLock::new(Vec::new()),
            max_results: settings.max_results,
            min_course_score: settings.min_course_score,
        }
    }

    /// Add or replace a course, keyed by title.
    pub async fn add_course(&self, course: Course) -> Result<()> {
        let embedding = self.embedder.embed(&course.title).await?;

        let mut courses = write(&self.courses);
        courses.retain(|c| c.course.title != course.title);
        courses.push(StoredCourse { course, embedding });
        Ok(())
    }

    /// Index course chunks. Returns the number added.
    pub async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(CoursemateError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut store = write(&self.chunks);
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            store.push(StoredChunk {
                chunk: chunk.clone(),
                embedding,
            });
        }
        debug!("Indexed {} chunks", chunks.len());
        Ok(chunks.len())
    }

    /// Number of stored courses.
    pub fn course_count(&self) -> usize {
        read(&self.courses).len()
    }

    /// Number of indexed chunks.
    pub fn chunk_count(&self) -> usize {
        read(&self.chunks).len()
    }
}

#[async_trait]
impl CourseSearch for MemoryCourseStore {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(SearchResults::with_error(format!(
                        "No course found matching '{}'",
                        name
                    )))
                }
            },
            None => None,
        };

        let query_embedding = self.embedder.embed(query).await?;

        let chunks = read(&self.chunks);
        let mut scored: Vec<(&StoredChunk, f32)> = chunks
            .iter()
            .filter(|s| {
                course_title
                    .as_ref()
                    .map_or(true, |title| &s.chunk.course_title == title)
            })
            .filter(|s| lesson_number.is_none() || s.chunk.lesson_number == lesson_number)
            .map(|s| (s, cosine_similarity(&query_embedding, &s.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.max_results);

        let mut results = SearchResults::default();
        for (stored, score) in scored {
            results.documents.push(stored.chunk.content.clone());
            results.metadata.push(ChunkMetadata {
                course_title: stored.chunk.course_title.clone(),
                lesson_number: stored.chunk.lesson_number,
            });
            results.distances.push(1.0 - score);
        }

        debug!("Search returned {} passages", results.len());
        Ok(results)
    }
}

#[async_trait]
impl CourseCatalog for MemoryCourseStore {
    async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>> {
        {
            let courses = read(&self.courses);
            if let Some(exact) = courses
                .iter()
                .find(|c| c.course.title.eq_ignore_ascii_case(partial))
            {
                return Ok(Some(exact.course.title.clone()));
            }
            if courses.is_empty() {
                return Ok(None);
            }
        }

        let embedding = self.embedder.embed(partial).await?;

        let courses = read(&self.courses);
        let best = courses
            .iter()
            .map(|c| (c, cosine_similarity(&embedding, &c.embedding)))
            .filter(|(_, score)| *score >= self.min_course_score)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(best.map(|(c, _)| c.course.title.clone()))
    }

    async fn all_courses_metadata(&self) -> Result<Vec<Course>> {
        Ok(read(&self.courses).iter().map(|c| c.course.clone()).collect())
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let courses = read(&self.courses);
        Ok(courses
            .iter()
            .find(|c| c.course.title == course_title)
            .and_then(|c| {
                c.course
                    .lessons
                    .iter()
                    .find(|l| l.lesson_number == lesson_number)
            })
            .and_then(|l| l.lesson_link.clone()))
    }
}

// A panic while holding a lock leaves the data itself intact.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
