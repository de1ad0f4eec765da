//! Prompt loader for YAML prompt definitions.

use crate::defaults::{default_answer_prompt, ANSWER_PROMPT_ID};
use crate::types::PromptDefinition;
use kbchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".kbchat").join("prompts")
}

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` in `.kbchat/prompts/`.
///
/// # Example
/// ```no_run
/// use kbchat_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Resolve a prompt, preferring a workspace override over the built-in.
///
/// Only `rag.answer` has a built-in; other IDs must exist on disk.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        return load_prompt(workspace_path, prompt_id);
    }

    if prompt_id == ANSWER_PROMPT_ID {
        tracing::debug!("Using built-in prompt '{}'", prompt_id);
        return Ok(default_answer_prompt());
    }

    Err(AppError::Prompt(format!(
        "Prompt '{}' is neither built in nor present at {:?}",
        prompt_id, prompt_file
    )))
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    // The answer workflow always supplies exactly these two slots.
    if def.id == ANSWER_PROMPT_ID {
        for required in ["context", "question"] {
            if !def.template.contains(required) {
                return Err(AppError::Prompt(format!(
                    "Prompt '{}' must reference {{{{{}}}}}",
                    def.id, required
                )));
            }
        }
    }

    Ok(())
}
