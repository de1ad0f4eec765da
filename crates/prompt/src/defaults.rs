//! Built-in prompt definitions.

use crate::types::{PromptDefinition, PromptOutputSpec};

/// Identifier of the context-constrained answer prompt.
pub const ANSWER_PROMPT_ID: &str = "rag.answer";

const ANSWER_TEMPLATE: &str = "Answer ONLY using the provided context.

Context:
{{context}}

Question:
{{question}}
";

/// The answer prompt used when the workspace does not override `rag.answer`.
pub fn default_answer_prompt() -> PromptDefinition {
    PromptDefinition {
        id: ANSWER_PROMPT_ID.to_string(),
        title: "Context-constrained answer".to_string(),
        api_version: "1.0".to_string(),
        created_by: "kbchat".to_string(),
        system: None,
        variables: vec!["context".to_string(), "question".to_string()],
        template: ANSWER_TEMPLATE.to_string(),
        output: PromptOutputSpec::default(),
    }
}
