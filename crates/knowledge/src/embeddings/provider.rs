//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{OllamaProvider, TrigramProvider};
use kbchat_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Create an embedding provider from index configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be greater than zero".to_string(),
        ));
    }

    match config.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(config.dimensions))),
        "ollama" => {
            let provider = OllamaProvider::new(
                config.endpoint.as_deref(),
                config.model.clone(),
                config.dimensions,
            )?;
            Ok(Arc::new(provider))
        }
        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama",
            other
        ))),
    }
}
