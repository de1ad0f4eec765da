//! LLM provider factory.
//!
//! Builds the generator backend from configuration. Called once at startup;
//! the returned handle is shared by every question.

use crate::client::LlmClient;
use crate::providers::groq::{DEFAULT_GROQ_TIMEOUT, DEFAULT_GROQ_URL};
use crate::providers::{ollama::DEFAULT_OLLAMA_URL, GroqClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("groq", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by providers that authenticate
///
/// # Errors
/// Returns error if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    create_client_with_timeout(provider, endpoint, api_key, None)
}

/// Like [`create_client`], with a per-request timeout.
///
/// Groq requests fall back to [`DEFAULT_GROQ_TIMEOUT`] when `timeout` is `None`.
pub fn create_client_with_timeout(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Option<Duration>,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    let api_key = api_key.filter(|k| !k.trim().is_empty());
    if provider_type.requires_api_key() && api_key.is_none() {
        return Err(format!(
            "{} provider requires an API key",
            provider_type.as_str()
        ));
    }

    match provider_type {
        ProviderType::Groq => {
            let base_url = endpoint.unwrap_or(DEFAULT_GROQ_URL);
            let key = api_key.unwrap_or_default();
            tracing::debug!("Creating Groq client at {}", base_url);
            let timeout = timeout.unwrap_or(DEFAULT_GROQ_TIMEOUT);
            GroqClient::with_timeout(base_url, key, timeout)
                .map(|c| Arc::new(c) as Arc<dyn LlmClient>)
                .map_err(|e| e.to_string())
        }
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            tracing::debug!("Creating Ollama client at {}", base_url);
            match timeout {
                Some(timeout) => OllamaClient::with_timeout(base_url, timeout)
                    .map(|c| Arc::new(c) as Arc<dyn LlmClient>)
                    .map_err(|e| e.to_string()),
                None => Ok(Arc::new(OllamaClient::with_base_url(base_url))),
            }
        }
    }
}
