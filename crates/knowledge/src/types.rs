//! Knowledge index type definitions.

use crate::embeddings::EmbeddingConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted settings of one named index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Name of the index
    pub name: String,

    /// How chunks and queries are embedded
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
}

fn default_chunk_size() -> u32 {
    800
}

fn default_chunk_overlap() -> u32 {
    150
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            embedding: EmbeddingConfig::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Where a source document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Url,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Url => "url",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "url" => Some(Self::Url),
            _ => None,
        }
    }
}

/// A document recorded in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Unique source identifier
    pub id: String,

    /// File path or URL
    pub location: String,

    pub kind: SourceKind,

    /// Content type label (see `parser::ContentType`)
    pub content_type: String,

    pub ingested_at: DateTime<Utc>,

    /// Size of the extracted text in bytes
    pub size_bytes: u64,

    /// SHA-256 of the extracted text, hex encoded
    pub content_hash: String,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Character offsets within the source text
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Chunk before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Options for building or extending an index.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Index name
    pub index_name: String,

    /// Directory walked for `.txt`, `.md`, `.html` and `.pdf` files
    pub docs_dir: Option<PathBuf>,

    /// Web pages to fetch
    pub urls: Vec<String>,

    /// Drop existing content first
    pub reset: bool,

    /// Embedding settings for a new or reset index; `None` keeps the saved ones
    pub embedding: Option<EmbeddingConfig>,
}

impl IngestOptions {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            docs_dir: None,
            urls: Vec::new(),
            reset: false,
            embedding: None,
        }
    }
}

/// Statistics from an ingest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Sources newly indexed or re-indexed
    pub sources_count: u32,

    /// Sources whose content was already indexed
    pub unchanged_count: u32,

    /// Sources that could not be read or parsed
    pub skipped_count: u32,

    /// Files no longer present in the docs directory, dropped from the index
    #[serde(default)]
    pub removed_count: u32,

    /// Chunks written
    pub chunks_count: u32,

    /// Bytes of extracted text processed
    pub bytes_processed: u64,

    pub duration_secs: f64,
}

/// Statistics for an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub index_name: String,

    pub sources_count: u32,

    pub chunks_count: u32,

    /// Database size in bytes
    pub db_size_bytes: u64,

    pub embedding_provider: String,

    pub embedding_model: String,

    /// Most recent ingest time, if anything has been ingested
    pub last_ingest_at: Option<DateTime<Utc>>,
}
