//! Generator backends for kbchat.
//!
//! A provider-agnostic completion interface with concrete providers:
//! - **Groq**: hosted OpenAI-compatible API (default)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use kbchat_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2").with_temperature(0.0);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, create_client_with_timeout};
pub use providers::{GroqClient, OllamaClient};
pub use types::ProviderType;
