//! Prompt system for kbchat.
//!
//! - Built-in and YAML prompt definitions (`.kbchat/prompts/<id>.yml`)
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, render_template};
pub use defaults::{default_answer_prompt, ANSWER_PROMPT_ID};
pub use loader::{load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec};
