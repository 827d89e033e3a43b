//! Prompt templates for Coursemate.
//!
//! Prompts can be customized by placing a `generator.toml` file in the custom
//! prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub generator: GeneratorPrompts,
}

/// Prompts for the tool-calling answer generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorPrompts {
    /// Fixed instructions sent as the system prompt on every model call.
    pub system: String,
    /// Template wrapping the user's question. Supports `{{query}}`.
    pub question: String,
}

impl Default for GeneratorPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content with access to tools for searching course information.

Search Tool Usage:
- Use `search_course_content` **only** for questions about specific course content or detailed educational materials
- **Maximum 2 tool uses per query** - plan your searches to gather everything you need within this limit
- Synthesize search results into accurate, fact-based responses
- If a search yields no results, state this clearly without offering alternatives

Course Outline/Syllabus Requests:
- When users ask for an "outline", "syllabus", "课程大纲", "课时列表", or a lesson list:
  - Use the `get_course_outline` tool with the `course_title` parameter
  - It returns the course title, course link, instructor and the complete numbered lesson list

Response Protocol:
- General knowledge questions: answer from existing knowledge without searching
- Course-specific questions: search first, then answer
- No meta-commentary: give the answer only, without describing your reasoning or your searches, and never say "based on the search results"

All responses must be:
1. Brief, concise and focused
2. Educational
3. Clear
4. Example-supported when examples aid understanding
Provide only the direct answer to what was asked."#
                .to_string(),

            question: "Answer this question about course materials: {{query}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the defaults, overridden by files in `custom_dir`.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let generator_path = custom_path.join("generator.toml");
            if generator_path.exists() {
                let content = std::fs::read_to_string(&generator_path)?;
                prompts.generator = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Wrap a user question in the generator's question template.
    pub fn render_question(&self, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        Self::render(&self.generator.question, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.generator.system.contains("get_course_outline"));
        assert!(prompts.generator.system.contains("search_course_content"));
    }

    #[test]
    fn test_render_question() {
        let prompts = Prompts::default();
        assert_eq!(
            prompts.render_question("What is MCP?"),
            "Answer this question about course materials: What is MCP?"
        );
    }

    #[test]
    fn test_load_custom_generator_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("generator.toml"),
            "question = \"Q: {{query}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.render_question("hi"), "Q: hi");
        // Fields absent from the file keep their defaults.
        assert!(prompts.generator.system.contains("course materials"));
    }
}
