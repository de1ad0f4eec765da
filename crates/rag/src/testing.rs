//! Recording stubs for workflow tests.

use crate::generator::Generator;
use crate::retriever::{Passage, Retriever};
use async_trait::async_trait;
use kbchat_core::{AppError, AppResult};
use std::sync::Mutex;

#[derive(Default)]
pub struct StubRetriever {
    passages: Vec<Passage>,
    fail: bool,
    calls: Mutex<Vec<(String, usize)>>,
}

impl StubRetriever {
    pub fn with_passages(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            ..Default::default()
        }
    }

    pub fn with_texts(texts: &[&str]) -> Self {
        Self::with_passages(texts.iter().map(|t| Passage::from(*t)).collect())
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for StubRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        self.calls.lock().unwrap().push((query.to_string(), k));
        if self.fail {
            return Err(AppError::Retrieval("index unreachable".to_string()));
        }
        Ok(self.passages.iter().take(k).cloned().collect())
    }
}

#[derive(Default)]
pub struct StubGenerator {
    reply: String,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(AppError::Llm("rate limited".to_string()));
        }
        Ok(self.reply.clone())
    }
}
