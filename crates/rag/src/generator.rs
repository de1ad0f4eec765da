//! Text generation seam and its LLM-backed implementation.

use async_trait::async_trait;
use kbchat_core::AppResult;
use kbchat_llm::{LlmClient, LlmRequest};
use std::sync::Arc;

/// Produces a completion for a fully rendered prompt.
///
/// Failures surface as [`kbchat_core::AppError::Llm`].
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;

    /// Complete with an optional system message.
    ///
    /// The default folds the system text in front of the prompt.
    async fn complete_with_system(&self, system: Option<&str>, prompt: &str) -> AppResult<String> {
        match system {
            Some(system) => self.complete(&format!("{}\n\n{}", system, prompt)).await,
            None => self.complete(prompt).await,
        }
    }
}

/// [`Generator`] backed by an [`LlmClient`] at a fixed temperature.
pub struct LlmGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmGenerator {
    /// Deterministic generator (temperature 0) for `model`.
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, system: Option<&str>, prompt: &str) -> LlmRequest {
        let mut request =
            LlmRequest::new(prompt, self.model.clone()).with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(system) = system {
            request = request.with_system(system);
        }
        request
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.complete_with_system(None, prompt).await
    }

    async fn complete_with_system(&self, system: Option<&str>, prompt: &str) -> AppResult<String> {
        let request = self.request(system, prompt);
        let response = self.client.complete(&request).await?;

        if !response.done {
            tracing::warn!(
                provider = self.client.provider_name(),
                model = %response.model,
                "Completion was cut off by the token limit"
            );
        }

        Ok(response.content)
    }
}
