//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use kbchat_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every name listed in `definition.variables` must be present in
/// `variables`; values are inserted verbatim (no HTML escaping).
///
/// # Example
/// ```
/// use kbchat_prompt::{build_prompt, default_answer_prompt};
/// use std::collections::HashMap;
///
/// let mut vars = HashMap::new();
/// vars.insert("context".to_string(), "Refunds take 14 days.".to_string());
/// vars.insert("question".to_string(), "How long do refunds take?".to_string());
///
/// let built = build_prompt(&default_answer_prompt(), vars).unwrap();
/// assert!(built.user.contains("Refunds take 14 days."));
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    if let Some(missing) = definition
        .variables
        .iter()
        .find(|name| !variables.contains_key(name.as_str()))
    {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' requires variable '{}'",
            definition.id, missing
        )));
    }

    let user = render_template(&definition.template, &variables)?;

    let system = match definition.system {
        Some(ref system) => Some(render_template(system, &variables)?),
        None => None,
    };

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PromptOutputSpec;

    fn create_test_definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            system: system.map(str::to_string),
            variables: vec!["question".to_string()],
            template: "Question: {{question}}".to_string(),
            output: PromptOutputSpec::default(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Hello, world!".to_string());

        let result = render_template("Question: {{question}}", &vars).unwrap();
        assert_eq!(result, "Question: Hello, world!");
    }

    #[test]
    fn test_render_does_not_escape_markup() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "<b>a & b</b> \"quoted\"".to_string());

        let result = render_template("{{context}}", &vars).unwrap();
        assert_eq!(result, "<b>a & b</b> \"quoted\"");
    }

    #[test]
    fn test_build_prompt() {
        let def = create_test_definition(None);
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Test question".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.user, "Question: Test question");
        assert!(built.system.is_none());
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_renders_system() {
        let def = create_test_definition(Some("Answer about: {{question}}"));
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "refunds".to_string());

        let built = build_prompt(&def, vars).unwrap();
        assert_eq!(built.system.as_deref(), Some("Answer about: refunds"));
    }

    #[test]
    fn test_build_prompt_missing_required_variable() {
        let def = create_test_definition(None);
        let err = build_prompt(&def, HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("requires variable 'question'"));
    }

    #[test]
    fn test_render_template_unbalanced_braces() {
        let result = render_template("Question: {{#if}}", &HashMap::new());
        assert!(result.is_err());
    }
}
