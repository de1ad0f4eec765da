//! SQLite-backed vector index for knowledge chunks.

use crate::embeddings::cosine_similarity;
use crate::types::{IndexedSource, KnowledgeChunk, SourceKind};
use chrono::{DateTime, Utc};
use kbchat_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sources (
        id TEXT PRIMARY KEY,
        location TEXT NOT NULL UNIQUE,
        kind TEXT NOT NULL,
        content_type TEXT NOT NULL,
        ingested_at TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        content_hash TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        source_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT,
        FOREIGN KEY (source_id) REFERENCES sources(id)
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
"#;

/// Create (if needed) and open the index database for writing.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(SCHEMA)
        .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Open an existing index read-only.
///
/// A missing or unreadable index is a configuration fault: nothing can be
/// answered until it has been built.
pub fn open_index(db_path: &Path) -> AppResult<Connection> {
    if !db_path.exists() {
        return Err(AppError::Config(format!(
            "Knowledge index not found at {:?}. Run 'kbchat ingest' first.",
            db_path
        )));
    }

    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| AppError::Config(format!("Failed to open index {:?}: {}", db_path, e)))?;

    // Fails on a file that is not a kbchat index.
    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get::<_, i64>(0))
        .map_err(|e| AppError::Config(format!("Index {:?} is unreadable: {}", db_path, e)))?;

    Ok(conn)
}

/// Insert a source into the index.
pub fn insert_source(conn: &Connection, source: &IndexedSource) -> AppResult<()> {
    conn.execute(
        "INSERT INTO sources (id, location, kind, content_type, ingested_at, size_bytes, content_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            source.id,
            source.location,
            source.kind.as_str(),
            source.content_type,
            source.ingested_at.to_rfc3339(),
            source.size_bytes as i64,
            source.content_hash,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

    Ok(())
}

/// Look up a source by its path or URL.
pub fn find_source(conn: &Connection, location: &str) -> AppResult<Option<IndexedSource>> {
    conn.query_row(
        "SELECT id, location, kind, content_type, ingested_at, size_bytes, content_hash
         FROM sources WHERE location = ?1",
        params![location],
        row_to_source,
    )
    .optional()
    .map_err(|e| AppError::Knowledge(format!("Failed to look up source: {}", e)))
}

/// All sources of one kind, ordered by location.
pub fn list_sources(conn: &Connection, kind: SourceKind) -> AppResult<Vec<IndexedSource>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, location, kind, content_type, ingested_at, size_bytes, content_hash
             FROM sources WHERE kind = ?1 ORDER BY location",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare source listing: {}", e)))?;

    let sources = stmt
        .query_map(params![kind.as_str()], row_to_source)
        .map_err(|e| AppError::Knowledge(format!("Failed to list sources: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Knowledge(format!("Failed to read source row: {}", e)))?;

    Ok(sources)
}

fn row_to_source(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexedSource> {
    let kind: String = row.get(2)?;
    let ingested_at: String = row.get(4)?;
    Ok(IndexedSource {
        id: row.get(0)?,
        location: row.get(1)?,
        kind: SourceKind::parse(&kind).unwrap_or(SourceKind::File),
        content_type: row.get(3)?,
        ingested_at: parse_timestamp(&ingested_at).unwrap_or_else(Utc::now),
        size_bytes: row.get::<_, i64>(5)? as u64,
        content_hash: row.get(6)?,
    })
}

/// Remove a source and its chunks.
pub fn delete_source(conn: &Connection, source_id: &str) -> AppResult<()> {
    conn.execute("DELETE FROM chunks WHERE source_id = ?1", params![source_id])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete chunks: {}", e)))?;
    conn.execute("DELETE FROM sources WHERE id = ?1", params![source_id])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete source: {}", e)))?;
    Ok(())
}

/// Insert a chunk with embedding into the index.
pub fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let embedding = chunk
        .embedding
        .as_ref()
        .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?;

    let metadata_json = serde_json::to_string(&chunk.metadata)?;

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.text,
            embedding_to_bytes(embedding),
            metadata_json,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

/// Return the `top_k` chunks most similar to `query_embedding`, best first.
///
/// Ties keep insertion order.
pub fn query_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<(KnowledgeChunk, f32)>> {
    if top_k == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn
        .prepare(
            "SELECT id, source_id, position, text, embedding, metadata
             FROM chunks ORDER BY rowid",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let metadata_json: Option<String> = row.get(5)?;
            Ok((
                KnowledgeChunk {
                    id: row.get(0)?,
                    source_id: row.get(1)?,
                    position: row.get::<_, i64>(2)? as u32,
                    text: row.get(3)?,
                    embedding: None,
                    metadata: metadata_json
                        .and_then(|m| serde_json::from_str(&m).ok())
                        .unwrap_or(serde_json::Value::Null),
                },
                embedding_bytes,
            ))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let (chunk, bytes) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk row: {}", e)))?;
        let embedding = bytes_to_embedding(&bytes)?;
        let score = cosine_similarity(query_embedding, &embedding);
        results.push((chunk, score));
    }

    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} chunks (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Count sources and chunks.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let sources_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM sources", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count sources: {}", e)))?;

    let chunks_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

    Ok((sources_count, chunks_count))
}

/// Time of the most recent ingest, if any source is indexed.
pub fn last_ingest_at(conn: &Connection) -> AppResult<Option<DateTime<Utc>>> {
    let latest: Option<String> = conn
        .query_row("SELECT MAX(ingested_at) FROM sources", [], |row| row.get(0))
        .map_err(|e| AppError::Knowledge(format!("Failed to read ingest time: {}", e)))?;

    Ok(latest.as_deref().and_then(parse_timestamp))
}

/// Delete all sources and chunks.
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute("DELETE FROM chunks", [])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete chunks: {}", e)))?;

    conn.execute("DELETE FROM sources", [])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete sources: {}", e)))?;

    tracing::info!("Reset knowledge index");
    Ok(())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
