//! Configuration module for Coursemate.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{GeneratorPrompts, Prompts};
pub use settings::{
    GeneralSettings, GenerationSettings, PromptSettings, SearchSettings, Settings,
};
