//! Retrieval seam between the workflow and a knowledge index.

use async_trait::async_trait;
use kbchat_core::AppResult;
use serde::Serialize;

/// A text passage returned by a retriever, most relevant first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub text: String,

    /// Similarity in `[0, 1]` when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Passage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

impl From<&str> for Passage {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Similarity search over a pre-built knowledge index.
///
/// Implementations return at most `k` passages ordered by descending
/// relevance. An empty result is not an error. Failures to reach or read
/// the index surface as [`kbchat_core::AppError::Retrieval`].
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<Passage>>;
}
