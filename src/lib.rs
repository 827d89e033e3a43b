//! Coursemate - tool-calling question answering over course materials
//!
//! A chat model answers questions about a catalog of courses. When a question
//! needs course content, the model calls retrieval tools (passage search and
//! course outlines) and the crate runs them, feeding results back for a
//! bounded number of rounds.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Provider-neutral chat messages and the OpenAI adapter
//! - `store` - Course records, the search/catalog collaborator traits, and an in-memory store
//! - `embedding` - Embedding abstraction used by the in-memory store
//! - `tools` - Course search and outline tools, plus the tool registry
//! - `agent` - The bounded tool-calling loop
//! - `rag` - Per-question facade wiring tools, prompts and the agent
//!
//! # Example
//!
//! ```rust,no_run
//! use coursemate::config::{Prompts, Settings};
//! use coursemate::embedding::Embedder;
//! use coursemate::llm::OpenAiChatModel;
//! use coursemate::rag::RagEngine;
//! use coursemate::store::MemoryCourseStore;
//! use std::sync::Arc;
//!
//! # async fn run(embedder: Arc<dyn Embedder>) -> coursemate::Result<()> {
//! let settings = Settings::load()?;
//! let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
//! let store = Arc::new(MemoryCourseStore::with_settings(embedder, &settings.search));
//! let model = Arc::new(OpenAiChatModel::from_settings(&settings)?);
//!
//! let engine = RagEngine::from_settings(model, store.clone(), store, &settings, prompts);
//! let response = engine.ask("What is covered in lesson 2 of the MCP course?", None).await?;
//! println!("{}", response.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod logging;
pub mod openai;
pub mod rag;
pub mod store;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::{CoursemateError, Result};
