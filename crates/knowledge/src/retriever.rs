//! Index-backed [`Retriever`] used by the answer workflow.

use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::{config, index};
use async_trait::async_trait;
use kbchat_core::{AppError, AppResult};
use kbchat_rag::{Passage, Retriever};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Read-only view of a built index, opened once and shared by all requests.
pub struct IndexRetriever {
    index_name: String,
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexRetriever {
    /// Open the named index in `workspace`.
    ///
    /// Fails with [`AppError::Config`] when the index is missing, unreadable,
    /// or names an unknown embedding provider.
    pub fn open(workspace: &Path, index_name: &str) -> AppResult<Self> {
        let conn = index::open_index(&config::get_index_path(workspace, index_name))?;

        let index_config = config::load_config(workspace, index_name)
            .map_err(|e| AppError::Config(e.to_string()))?;
        let embedder = create_provider(&index_config.embedding)?;

        tracing::info!(
            index = index_name,
            provider = embedder.provider_name(),
            model = embedder.model_name(),
            "Opened knowledge index"
        );

        Ok(Self::new(index_name, conn, embedder))
    }

    pub fn new(
        index_name: impl Into<String>,
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            conn: Mutex::new(conn),
            embedder,
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to embed query: {}", e)))?;

        let results = {
            let conn = self
                .conn
                .lock()
                .map_err(|_| AppError::Retrieval("Index connection lock poisoned".to_string()))?;
            index::query_chunks(&conn, &embedding, k)
                .map_err(|e| AppError::Retrieval(e.to_string()))?
        };

        tracing::debug!(
            index = %self.index_name,
            passages = results.len(),
            top_score = ?results.first().map(|(_, s)| *s),
            "Retrieved passages"
        );

        Ok(results
            .into_iter()
            .map(|(chunk, score)| Passage::new(chunk.text).with_score(score.max(0.0)))
            .collect())
    }
}
