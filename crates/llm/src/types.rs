//! Provider identifiers.

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Groq,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Ollama => "ollama",
        }
    }

    /// Whether the provider refuses requests without an API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::Groq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("groq"), Some(ProviderType::Groq));
        assert_eq!(ProviderType::parse("GROQ"), Some(ProviderType::Groq));
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("unknown"), None);
    }

    #[test]
    fn test_requires_api_key() {
        assert!(ProviderType::Groq.requires_api_key());
        assert!(!ProviderType::Ollama.requires_api_key());
        assert_eq!(ProviderType::Ollama.as_str(), "ollama");
    }
}
