//! Embedding configuration.

use serde::{Deserialize, Serialize};

/// Embedding settings stored in an index's `config.yaml`.
///
/// Queries must be embedded with the same settings the index was built with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "trigram" or "ollama"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Provider endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

impl EmbeddingConfig {
    /// Ollama settings for `model` with the given output width.
    pub fn ollama(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            provider: "ollama".to_string(),
            model: model.into(),
            dimensions,
            endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_optional() {
        let yaml = "provider: ollama\nmodel: all-minilm\ndimensions: 384\n";
        let config: EmbeddingConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config, EmbeddingConfig::ollama("all-minilm", 384));
    }
}
