//! Groq LLM provider.
//!
//! Groq serves an OpenAI-compatible chat completions API:
//! https://console.groq.com/docs/api-reference#chat-create

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use kbchat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Groq API base URL.
pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";

/// Request timeout used when none is configured.
pub const DEFAULT_GROQ_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Groq chat completions client.
pub struct GroqClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GroqClient {
    /// Create a client against the public Groq endpoint.
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_GROQ_URL, api_key)
    }

    /// Create a client against a custom OpenAI-compatible endpoint.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> AppResult<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_GROQ_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Groq HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);

        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }

    fn convert_response(&self, response: ChatResponse) -> AppResult<LlmResponse> {
        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("Groq response contained no choices".to_string()))?;

        let done = choice.finish_reason.as_deref() != Some("length");

        Ok(LlmResponse {
            content: choice.message.content,
            model: response.model,
            usage,
            done,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GroqClient {
    fn provider_name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, "Sending completion request to Groq");

        let body = self.to_chat_request(request);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Groq: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);

            return Err(AppError::Llm(format!("Groq API error ({}): {}", status, message)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Groq response: {}", e)))?;

        let converted = self.convert_response(chat_response)?;

        tracing::debug!(
            prompt_tokens = converted.usage.prompt_tokens,
            completion_tokens = converted.usage.completion_tokens,
            "Received completion from Groq"
        );

        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_puts_system_first() {
        let client = GroqClient::new("gsk_test").unwrap();
        let request = LlmRequest::new("What is the refund policy?", "llama-3.1-8b-instant")
            .with_system("Answer from context only")
            .with_temperature(0.0);

        let chat = client.to_chat_request(&request);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].role, "user");
        assert_eq!(chat.messages[1].content, "What is the refund policy?");
        assert_eq!(chat.temperature, Some(0.0));
        assert!(!chat.stream);
    }

    #[test]
    fn test_chat_request_without_system() {
        let client = GroqClient::new("gsk_test").unwrap();
        let chat = client.to_chat_request(&LlmRequest::new("hi", "m"));
        assert_eq!(chat.messages.len(), 1);
    }

    #[test]
    fn test_convert_response() {
        let client = GroqClient::new("gsk_test").unwrap();
        let raw: ChatResponse = serde_json::from_str(
            r#"{
                "model": "llama-3.1-8b-instant",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Within 14 days."}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 52, "completion_tokens": 5, "total_tokens": 57}
            }"#,
        )
        .unwrap();

        let response = client.convert_response(raw).unwrap();
        assert_eq!(response.content, "Within 14 days.");
        assert_eq!(response.usage.total_tokens, 57);
        assert!(response.done);
    }

    #[test]
    fn test_convert_response_without_choices_is_llm_error() {
        let client = GroqClient::new("gsk_test").unwrap();
        let raw: ChatResponse =
            serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();

        match client.convert_response(raw) {
            Err(AppError::Llm(msg)) => assert!(msg.contains("no choices")),
            other => panic!("expected Llm error, got {:?}", other.map(|r| r.content)),
        }
    }

    #[test]
    fn test_truncated_completion_is_not_done() {
        let client = GroqClient::new("gsk_test").unwrap();
        let raw: ChatResponse = serde_json::from_str(
            r#"{"model": "m", "choices": [{"message": {"role": "assistant", "content": "Refunds are"}, "finish_reason": "length"}]}"#,
        )
        .unwrap();

        assert!(!client.convert_response(raw).unwrap().done);
    }

    #[tokio::test]
    async fn test_stalled_endpoint_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection and never answer.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let client = GroqClient::with_timeout(
            format!("http://{}", addr),
            "gsk_test",
            Duration::from_millis(200),
        )
        .unwrap();
        let request = LlmRequest::new("Hello", "llama-3.1-8b-instant");

        let result = tokio::time::timeout(Duration::from_secs(10), client.complete(&request))
            .await
            .expect("client should give up on its own");
        assert!(matches!(result, Err(AppError::Llm(_))));

        server.abort();
    }
}
