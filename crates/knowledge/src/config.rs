//! Index configuration and on-disk layout.
//!
//! Each index lives in `.kbchat/index/<name>/` with a `config.yaml`
//! and an `index.sqlite` database.

use crate::types::IndexConfig;
use kbchat_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Load index configuration, or defaults named `index_name` if none is saved.
pub fn load_config(workspace: &Path, index_name: &str) -> AppResult<IndexConfig> {
    let config_path = get_config_path(workspace, index_name);

    if !config_path.exists() {
        tracing::debug!(
            "Using default index config for '{}' (no config file found)",
            index_name
        );
        return Ok(IndexConfig {
            name: index_name.to_string(),
            ..Default::default()
        });
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Knowledge(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let mut config: IndexConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Knowledge(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    config.name = index_name.to_string();

    tracing::debug!("Loaded index config for '{}'", index_name);
    Ok(config)
}

/// Save index configuration next to its database.
pub fn save_config(workspace: &Path, config: &IndexConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace, &config.name);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Knowledge(format!("Failed to create index directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize config: {}", e)))?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Knowledge(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved index config for '{}'", config.name);
    Ok(())
}

pub fn get_index_dir(workspace: &Path, index_name: &str) -> PathBuf {
    workspace.join(".kbchat").join("index").join(index_name)
}

pub fn get_config_path(workspace: &Path, index_name: &str) -> PathBuf {
    get_index_dir(workspace, index_name).join("config.yaml")
}

pub fn get_index_path(workspace: &Path, index_name: &str) -> PathBuf {
    get_index_dir(workspace, index_name).join("index.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), "kb").unwrap();

        assert_eq!(config.name, "kb");
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.chunk_overlap, 150);
        assert_eq!(config.embedding.provider, "trigram");
        assert_eq!(config.embedding.dimensions, 384);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = IndexConfig {
            name: "handbook".to_string(),
            ..Default::default()
        };
        config.chunk_size = 1200;
        config.embedding.provider = "ollama".to_string();
        config.embedding.model = "all-minilm".to_string();

        save_config(temp.path(), &config).unwrap();
        assert!(temp.path().join(".kbchat/index/handbook/config.yaml").exists());

        let loaded = load_config(temp.path(), "handbook").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let dir = get_index_dir(temp.path(), "kb");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yaml"), "name: other\nchunk_overlap: 100\n").unwrap();

        let config = load_config(temp.path(), "kb").unwrap();
        assert_eq!(config.name, "kb");
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.chunk_overlap, 100);
    }

    #[test]
    fn test_index_path_layout() {
        let path = get_index_path(Path::new("/ws"), "kb");
        assert_eq!(path, PathBuf::from("/ws/.kbchat/index/kb/index.sqlite"));
    }
}
