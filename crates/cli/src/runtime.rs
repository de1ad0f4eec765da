//! Shared handles for commands that answer questions.

use kbchat_core::config::ProviderConfig;
use kbchat_core::{AppConfig, AppError, AppResult};
use kbchat_knowledge::IndexRetriever;
use kbchat_llm::create_client_with_timeout;
use kbchat_prompt::{resolve_prompt, ANSWER_PROMPT_ID};
use kbchat_rag::{LlmGenerator, RagOptions, RagWorkflow};
use std::sync::Arc;
use std::time::Duration;

/// Validate the configuration and wire the answer workflow.
///
/// Runs once per process; any failure here aborts before a question is read.
pub fn build_workflow(config: &AppConfig) -> AppResult<RagWorkflow> {
    config.validate()?;

    let retriever = IndexRetriever::open(&config.workspace, &config.index_name)?;
    let generator = build_generator(config)?;
    let prompt = resolve_prompt(&config.workspace, ANSWER_PROMPT_ID)?;

    tracing::debug!(
        index = %config.index_name,
        provider = %config.provider,
        model = %config.model,
        prompt = %prompt.id,
        "Workflow ready"
    );

    Ok(RagWorkflow::new(Arc::new(retriever), Arc::new(generator))
        .with_prompt(prompt)
        .with_options(RagOptions::from(&config.rag)))
}

fn build_generator(config: &AppConfig) -> AppResult<LlmGenerator> {
    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.and_then(ProviderConfig::endpoint);
    let timeout = provider_config
        .and_then(ProviderConfig::timeout_secs)
        .map(Duration::from_secs);
    let api_key = config.resolve_api_key(&config.provider);

    let client = create_client_with_timeout(&config.provider, endpoint, api_key.as_deref(), timeout)
        .map_err(AppError::Config)?;

    Ok(LlmGenerator::new(client, config.model.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbchat_knowledge::{ingest, IngestOptions};
    use std::fs;
    use tempfile::TempDir;

    fn config_for(workspace: &TempDir, provider: &str) -> AppConfig {
        AppConfig {
            workspace: workspace.path().to_path_buf(),
            provider: provider.to_string(),
            model: "llama3".to_string(),
            index_name: "docs".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_missing_index_is_config_error() {
        let temp = TempDir::new().unwrap();
        let config = config_for(&temp, "ollama");

        let result = build_workflow(&config);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_provider_rejected_before_index_is_opened() {
        let temp = TempDir::new().unwrap();
        let config = config_for(&temp, "carrier-pigeon");

        let err = build_workflow(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[tokio::test]
    async fn test_builds_workflow_over_ingested_index() {
        let temp = TempDir::new().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("notes.md"), "Invoices are due in thirty days.").unwrap();

        let mut options = IngestOptions::new("docs");
        options.docs_dir = Some(docs);
        ingest(temp.path(), options).await.unwrap();

        let config = config_for(&temp, "ollama");
        let workflow = build_workflow(&config).unwrap();
        assert_eq!(workflow.options().top_k, 3);
    }
}
