//! Stats command handler.

use clap::Args;
use kbchat_core::{AppConfig, AppError, AppResult};
use kbchat_knowledge::{stats, IndexStats};

/// Show knowledge index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = stats(&config.workspace, &config.index_name)?;

        if self.json {
            let json = serde_json::to_string_pretty(&stats)
                .map_err(|e| AppError::Knowledge(format!("Failed to serialize stats: {}", e)))?;
            println!("{}", json);
        } else {
            println!("{}", render(&stats));
        }

        Ok(())
    }
}

fn render(stats: &IndexStats) -> String {
    let last_ingest = stats
        .last_ingest_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        "Index: {}\n  Sources:    {}\n  Chunks:     {}\n  Size:       {:.2} MB\n  Embeddings: {} ({})\n  Last ingest: {}",
        stats.index_name,
        stats.sources_count,
        stats.chunks_count,
        stats.db_size_bytes as f64 / 1_048_576.0,
        stats.embedding_provider,
        stats.embedding_model,
        last_ingest
    )
}
