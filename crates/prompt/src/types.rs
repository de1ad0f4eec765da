//! Prompt types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition, built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Optional system message sent alongside the rendered template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Variables the template cannot be rendered without
    #[serde(default)]
    pub variables: Vec<String>,

    /// Template string with Handlebars syntax
    pub template: String,

    /// Output specification
    #[serde(default)]
    pub output: PromptOutputSpec,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format (e.g., "text", "markdown")
    pub format: String,
}

impl Default for PromptOutputSpec {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: rag.answer
title: Strict answer
apiVersion: "1.0"
createdBy: ops
variables: [context, question]
template: "{{context}} / {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "rag.answer");
        assert_eq!(def.variables, vec!["context", "question"]);
        assert_eq!(def.output.format, "text");
        assert!(def.system.is_none());
    }

    #[test]
    fn test_built_prompt_creation() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "test".to_string());

        let built = BuiltPrompt::new(
            Some("System message".to_string()),
            "User message".to_string(),
            "rag.answer".to_string(),
            vars,
        );

        assert_eq!(built.system, Some("System message".to_string()));
        assert_eq!(built.user, "User message");
        assert_eq!(built.metadata.source_prompt_id, "rag.answer");
        assert_eq!(built.metadata.resolved_variables.len(), 1);
    }
}
