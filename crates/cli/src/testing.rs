//! Fixed-answer workflow pieces for command tests.

use async_trait::async_trait;
use kbchat_core::{AppError, AppResult};
use kbchat_rag::{Generator, Passage, RagWorkflow, Retriever};
use std::sync::Arc;

pub struct FixedRetriever {
    passages: Vec<&'static str>,
    fail_on: Option<&'static str>,
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        if self.fail_on == Some(query) {
            return Err(AppError::Retrieval("index unreachable".to_string()));
        }
        Ok(self.passages.iter().take(k).map(|t| Passage::from(*t)).collect())
    }
}

pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        Ok(format!("answered from {} chars", prompt.chars().count()))
    }
}

pub fn workflow(passages: Vec<&'static str>) -> RagWorkflow {
    build(passages, None)
}

/// Like [`workflow`], but retrieval fails for the question `fail_on`.
pub fn workflow_failing_on(passages: Vec<&'static str>, fail_on: &'static str) -> RagWorkflow {
    build(passages, Some(fail_on))
}

fn build(passages: Vec<&'static str>, fail_on: Option<&'static str>) -> RagWorkflow {
    let retriever = FixedRetriever { passages, fail_on };
    RagWorkflow::new(Arc::new(retriever), Arc::new(EchoGenerator))
}
