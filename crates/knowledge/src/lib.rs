//! Knowledge index for kbchat.
//!
//! Builds a local SQLite vector index from documents and web pages, and
//! serves it to the answer workflow through [`IndexRetriever`].

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod retriever;
pub mod types;
pub mod web;

pub use embeddings::EmbeddingConfig;
pub use retriever::IndexRetriever;
pub use types::{
    IndexConfig, IndexStats, IndexedSource, IngestOptions, IngestStats, KnowledgeChunk, SourceKind,
};

use chrono::Utc;
use embeddings::{create_provider, EmbeddingProvider};
use kbchat_core::{AppError, AppResult};
use parser::ContentType;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Extracted text of one source, ready to be indexed.
struct SourceDocument {
    location: String,
    kind: SourceKind,
    content_type: ContentType,
    text: String,
}

enum IndexOutcome {
    Indexed { chunks: u32, bytes: u64 },
    Unchanged,
}

/// Build or extend an index from a docs directory and a list of URLs.
///
/// Sources that cannot be read, fetched or parsed are skipped with a
/// warning. Sources whose text is unchanged since the last run are left
/// alone; changed ones are re-indexed. Embedding failures abort the run.
pub async fn ingest(workspace: &Path, options: IngestOptions) -> AppResult<IngestStats> {
    let start = Instant::now();

    tracing::info!("Starting ingest for index '{}'", options.index_name);

    let mut index_config = config::load_config(workspace, &options.index_name)?;
    let conn = index::init_index(&config::get_index_path(workspace, &options.index_name))?;

    if options.reset {
        tracing::info!("Resetting index '{}'", options.index_name);
        index::reset_index(&conn)?;
    }

    if let Some(embedding) = options.embedding.clone() {
        if embedding != index_config.embedding {
            let (_, chunks) = index::get_stats(&conn)?;
            if chunks > 0 {
                return Err(AppError::Knowledge(format!(
                    "Index '{}' was built with {}/{}; re-run with --reset to switch embeddings",
                    options.index_name, index_config.embedding.provider, index_config.embedding.model
                )));
            }
            index_config.embedding = embedding;
        }
    }

    let embedder = create_provider(&index_config.embedding)?;
    let mut stats = IngestStats::default();

    if let Some(ref docs_dir) = options.docs_dir {
        let paths = collect_documents(docs_dir)?;
        let present: HashSet<String> = paths
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        stats.removed_count = remove_missing_files(&conn, docs_dir, &present)?;

        for path in paths {
            let location = path.to_string_lossy().to_string();
            let document = parser::parse_file(&path).map(|text| SourceDocument {
                location: location.clone(),
                kind: SourceKind::File,
                content_type: ContentType::from_path(&path),
                text,
            });
            ingest_document(&conn, embedder.as_ref(), &index_config, &location, document, &mut stats)
                .await?;
        }
    }

    if !options.urls.is_empty() {
        let client = web::build_client()?;
        for url in &options.urls {
            let document = web::fetch_url(&client, url).await.map(|page| SourceDocument {
                location: page.url,
                kind: SourceKind::Url,
                content_type: page.content_type,
                text: page.text,
            });
            ingest_document(&conn, embedder.as_ref(), &index_config, url, document, &mut stats)
                .await?;
        }
    }

    config::save_config(workspace, &index_config)?;

    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Ingest completed: {} sources ({} unchanged, {} skipped, {} removed), {} chunks, {} bytes in {:.2}s",
        stats.sources_count,
        stats.unchanged_count,
        stats.skipped_count,
        stats.removed_count,
        stats.chunks_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

async fn ingest_document(
    conn: &Connection,
    embedder: &dyn EmbeddingProvider,
    index_config: &IndexConfig,
    location: &str,
    document: AppResult<SourceDocument>,
    stats: &mut IngestStats,
) -> AppResult<()> {
    let document = match document {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Skipping {}: {}", location, e);
            stats.skipped_count += 1;
            return Ok(());
        }
    };

    match index_document(conn, embedder, index_config, document).await? {
        IndexOutcome::Indexed { chunks, bytes } => {
            stats.sources_count += 1;
            stats.chunks_count += chunks;
            stats.bytes_processed += bytes;
        }
        IndexOutcome::Unchanged => stats.unchanged_count += 1,
    }

    Ok(())
}

/// Chunk, embed and store one document, replacing any previous version.
async fn index_document(
    conn: &Connection,
    embedder: &dyn EmbeddingProvider,
    index_config: &IndexConfig,
    document: SourceDocument,
) -> AppResult<IndexOutcome> {
    let content_hash = hash_text(&document.text);
    let previous = index::find_source(conn, &document.location)?;

    if previous
        .as_ref()
        .is_some_and(|source| source.content_hash == content_hash)
    {
        tracing::debug!("Unchanged: {}", document.location);
        return Ok(IndexOutcome::Unchanged);
    }

    let source_id = uuid::Uuid::new_v4().to_string();
    let candidates = chunker::chunk_text(
        &source_id,
        &document.text,
        index_config.chunk_size as usize,
        index_config.chunk_overlap as usize,
    );

    let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    if embeddings.len() != candidates.len() {
        return Err(AppError::Knowledge(format!(
            "Embedding provider returned {} vectors for {} chunks",
            embeddings.len(),
            candidates.len()
        )));
    }

    let size_bytes = document.text.len() as u64;
    let source = IndexedSource {
        id: source_id,
        location: document.location,
        kind: document.kind,
        content_type: document.content_type.as_str().to_string(),
        ingested_at: Utc::now(),
        size_bytes,
        content_hash,
    };

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::Knowledge(format!("Failed to start transaction: {}", e)))?;

    if let Some(previous) = previous {
        index::delete_source(&tx, &previous.id)?;
    }
    index::insert_source(&tx, &source)?;

    let chunk_count = candidates.len() as u32;
    for (candidate, embedding) in candidates.into_iter().zip(embeddings) {
        let chunk = KnowledgeChunk {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: candidate.source_id,
            position: candidate.position,
            text: candidate.text,
            embedding: Some(embedding),
            metadata: candidate.metadata,
        };
        index::insert_chunk(&tx, &chunk)?;
    }

    tx.commit()
        .map_err(|e| AppError::Knowledge(format!("Failed to commit {}: {}", source.location, e)))?;

    tracing::debug!(
        "Indexed {}: {} chunks, {} bytes",
        source.location,
        chunk_count,
        size_bytes
    );

    Ok(IndexOutcome::Indexed {
        chunks: chunk_count,
        bytes: size_bytes,
    })
}

/// Drop file sources under `docs_dir` that are not in `present`.
fn remove_missing_files(
    conn: &Connection,
    docs_dir: &Path,
    present: &HashSet<String>,
) -> AppResult<u32> {
    let mut removed = 0;

    for source in index::list_sources(conn, SourceKind::File)? {
        if Path::new(&source.location).starts_with(docs_dir) && !present.contains(&source.location)
        {
            tracing::info!("Removing {} (no longer in {:?})", source.location, docs_dir);
            index::delete_source(conn, &source.id)?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Ingestible files under `dir`, in a stable order.
fn collect_documents(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Knowledge(format!(
            "Docs directory not found: {:?}",
            dir
        )));
    }

    Ok(WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| ContentType::from_path(p).is_ingestible())
        .collect())
}

fn hash_text(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Delete all content of an index, keeping its configuration.
pub fn clean(workspace: &Path, index_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning index '{}'", index_name);

    let index_path = config::get_index_path(workspace, index_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Index '{}' does not exist",
            index_name
        )));
    }

    let conn = index::init_index(&index_path)?;
    index::reset_index(&conn)?;

    tracing::info!("Index '{}' cleaned", index_name);
    Ok(())
}

/// Get statistics for an index.
pub fn stats(workspace: &Path, index_name: &str) -> AppResult<IndexStats> {
    let index_path = config::get_index_path(workspace, index_name);
    let conn = index::open_index(&index_path)?;
    let index_config = config::load_config(workspace, index_name)?;

    let (sources_count, chunks_count) = index::get_stats(&conn)?;
    let db_size_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

    Ok(IndexStats {
        index_name: index_name.to_string(),
        sources_count,
        chunks_count,
        db_size_bytes,
        embedding_provider: index_config.embedding.provider,
        embedding_model: index_config.embedding.model,
        last_ingest_at: index::last_ingest_at(&conn)?,
    })
}
