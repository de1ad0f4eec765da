//! Ingest command handler.
//!
//! Builds or extends the knowledge index from a docs directory and web pages.

use clap::Args;
use kbchat_core::{AppConfig, AppError, AppResult};
use kbchat_knowledge::{ingest, EmbeddingConfig, IngestOptions};
use std::path::{Path, PathBuf};

/// Build the knowledge index from documents and URLs
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory of .txt, .md, .html and .pdf files (relative to the workspace)
    #[arg(short, long, default_value = "docs")]
    pub docs: PathBuf,

    /// Web page to fetch and index (repeatable)
    #[arg(short, long = "url")]
    pub urls: Vec<String>,

    /// File with one URL per line
    #[arg(long)]
    pub urls_file: Option<PathBuf>,

    /// Drop existing content before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Embed with an Ollama model instead of the built-in trigram embedder
    #[arg(long)]
    pub ollama_embeddings: Option<String>,

    /// Dimensions produced by the Ollama embedding model
    #[arg(long, default_value_t = 384, requires = "ollama_embeddings")]
    pub embedding_dim: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest options: {:?}", self);

        let options = self.to_options(config)?;
        let stats = ingest(&config.workspace, options).await?;

        if self.json {
            let json = serde_json::to_string_pretty(&stats)
                .map_err(|e| AppError::Knowledge(format!("Failed to serialize stats: {}", e)))?;
            println!("{}", json);
        } else {
            println!("Index '{}' updated", config.index_name);
            println!("  Sources indexed:   {}", stats.sources_count);
            println!("  Sources unchanged: {}", stats.unchanged_count);
            println!("  Sources skipped:   {}", stats.skipped_count);
            println!("  Sources removed:   {}", stats.removed_count);
            println!("  Chunks written:    {}", stats.chunks_count);
            println!("  Bytes processed:   {}", stats.bytes_processed);
            println!("  Duration:          {:.2}s", stats.duration_secs);
        }

        Ok(())
    }

    fn to_options(&self, config: &AppConfig) -> AppResult<IngestOptions> {
        let mut urls = self.urls.clone();
        if let Some(ref path) = self.urls_file {
            let path = resolve(&config.workspace, path);
            let content = std::fs::read_to_string(&path).map_err(|e| {
                AppError::Knowledge(format!("Failed to read URL list {:?}: {}", path, e))
            })?;
            urls.extend(parse_url_list(&content));
        }

        let docs_dir = resolve(&config.workspace, &self.docs);
        let docs_dir = if docs_dir.is_dir() {
            Some(docs_dir)
        } else if !urls.is_empty() {
            tracing::warn!("Docs directory {:?} not found, ingesting URLs only", docs_dir);
            None
        } else {
            return Err(AppError::Knowledge(format!(
                "Docs directory not found: {:?}",
                docs_dir
            )));
        };

        let mut options = IngestOptions::new(config.index_name.clone());
        options.docs_dir = docs_dir;
        options.urls = urls;
        options.reset = self.reset;
        options.embedding = self
            .ollama_embeddings
            .as_ref()
            .map(|model| EmbeddingConfig::ollama(model.clone(), self.embedding_dim));

        Ok(options)
    }
}

fn resolve(workspace: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// One URL per line; blank lines and `#` comments are ignored.
fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
