//! Configuration management for kbchat.
//!
//! Configuration is merged from several sources, later ones winning:
//! - Built-in defaults
//! - A `.env` file in the current directory (if present)
//! - Config file (`.kbchat/config.yaml` or `KBCHAT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with indexes and prompt overrides
//! stored under `.kbchat/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the generator factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["groq", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .kbchat/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generator provider ("groq" or "ollama")
    pub provider: String,

    /// Generator model identifier
    pub model: String,

    /// Explicit API key for the generator provider
    pub api_key: Option<String>,

    /// Name of the index under `.kbchat/index/`
    pub index_name: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Answer workflow settings
    pub rag: RagSettings,
}

/// LLM section of config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Groq (OpenAI-compatible chat completions)
    Groq {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        /// Request timeout in seconds
        timeout: Option<u64>,
    },
    /// Local Ollama runtime
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::Groq { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Request timeout in seconds, if configured.
    pub fn timeout_secs(&self) -> Option<u64> {
        match self {
            Self::Groq { timeout, .. } | Self::Ollama { timeout, .. } => *timeout,
        }
    }

    /// Endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Groq { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// How the context assembler turns retrieved passages into a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidencePolicy {
    /// 0.9 when any context text was retrieved, 0.2 otherwise
    #[default]
    Presence,
    /// Best similarity score reported by the retriever
    Similarity,
}

/// Answer workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagSettings {
    /// Passages requested from the retriever per question
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: usize,

    /// Confidence derivation
    #[serde(default)]
    pub confidence: ConfidencePolicy,
}

fn default_top_k() -> usize {
    3
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            confidence: ConfidencePolicy::default(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    index: Option<IndexConfig>,
    rag: Option<RagSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexConfig {
    name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "groq".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key: None,
            index_name: "kb".to_string(),
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            rag: RagSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env`, the config file, and environment variables.
    ///
    /// Environment variables:
    /// - `KBCHAT_WORKSPACE`: Override workspace path
    /// - `KBCHAT_CONFIG`: Path to config file
    /// - `KBCHAT_PROVIDER`: Generator provider
    /// - `KBCHAT_MODEL`: Model identifier
    /// - `KBCHAT_API_KEY`: API key (otherwise the provider's key variable)
    /// - `KBCHAT_INDEX`: Index name
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use kbchat_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with a workspace and config file that take
    /// precedence over `KBCHAT_WORKSPACE` and `KBCHAT_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        // A missing .env is normal; keys may come from the real environment.
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("KBCHAT_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("KBCHAT_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.kbchat_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("KBCHAT_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("KBCHAT_MODEL") {
            config.model = model;
        }

        if let Ok(index) = std::env::var("KBCHAT_INDEX") {
            config.index_name = index;
        }

        config.api_key = std::env::var("KBCHAT_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(name) = config_file.index.and_then(|idx| idx.name) {
            result.index_name = name;
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over everything loaded so far.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        index_name: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(index_name) = index_name {
            self.index_name = index_name;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .kbchat directory.
    pub fn kbchat_dir(&self) -> PathBuf {
        self.workspace.join(".kbchat")
    }

    /// Ensure the .kbchat directory exists.
    pub fn ensure_kbchat_dir(&self) -> AppResult<()> {
        let dir = self.kbchat_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .kbchat directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the configuration block for a provider, if the config file has one.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: explicit key, the provider's `apiKeyEnv`, then the provider's
    /// conventional variable (`GROQ_API_KEY`).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::Groq { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        let conventional = match provider {
            "groq" => std::env::var("GROQ_API_KEY").ok(),
            _ => None,
        };

        conventional.filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration before any question is served.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if provider == "groq" && self.resolve_api_key(provider).is_none() {
            let env_var = match self.get_provider_config(provider) {
                Some(ProviderConfig::Groq { api_key_env, .. }) => api_key_env.as_str(),
                _ => "GROQ_API_KEY",
            };
            return Err(AppError::Config(format!(
                "{} not found. Set it in the environment or a .env file.",
                env_var
            )));
        }

        if self.rag.top_k == 0 {
            return Err(AppError::Config("rag.topK must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.index_name, "kb");
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.rag.confidence, ConfidencePolicy::Presence);
        assert!(!config.verbose);
    }

    #[test]
    fn test_kbchat_dir() {
        let config = AppConfig::default();
        assert!(config.kbchat_dir().ends_with(".kbchat"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            Some("handbook".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert_eq!(overridden.index_name, "handbook");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  providers:
    groq:
      apiKeyEnv: MY_GROQ_KEY
      model: llama-3.1-70b-versatile
      timeout: 45
    ollama:
      endpoint: http://localhost:11434
      model: qwen2.5
index:
  name: policies
rag:
  topK: 5
  confidence: similarity
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "qwen2.5");
        assert_eq!(merged.index_name, "policies");
        assert_eq!(merged.rag.top_k, 5);
        assert_eq!(merged.rag.confidence, ConfidencePolicy::Similarity);
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);

        match merged.get_provider_config("groq") {
            Some(ProviderConfig::Groq { api_key_env, .. }) => assert_eq!(api_key_env, "MY_GROQ_KEY"),
            other => panic!("expected groq config, got {:?}", other),
        }
        assert_eq!(
            merged.get_provider_config("groq").and_then(|p| p.timeout_secs()),
            Some(45)
        );
        assert_eq!(
            merged.get_provider_config("ollama").and_then(|p| p.endpoint()),
            Some("http://localhost:11434")
        );
    }

    #[test]
    fn test_load_from_reads_workspace_config() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".kbchat")).unwrap();
        std::fs::write(
            temp.path().join(".kbchat").join("config.yaml"),
            "rag:\n  topK: 7\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.rag.top_k, 7);
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(Some(temp.path().join("absent")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_merge_yaml_rejects_malformed_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "llm: [unterminated").unwrap();

        let err = AppConfig::default().merge_yaml(&path).unwrap_err();
        assert!(err.is_fatal_config());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama_needs_no_key() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_groq_with_explicit_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("gsk_test".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_api_key("groq").as_deref(), Some("gsk_test"));
    }

    #[test]
    fn test_validate_groq_missing_key_from_custom_env() {
        let mut config = AppConfig::default();
        let mut providers = HashMap::new();
        providers.insert(
            "groq".to_string(),
            ProviderConfig::Groq {
                api_key_env: "KBCHAT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                endpoint: None,
                timeout: None,
            },
        );
        config.llm = Some(LlmConfig {
            active_provider: "groq".to_string(),
            providers,
        });

        if std::env::var("GROQ_API_KEY").is_ok() {
            return;
        }

        let err = config.validate().unwrap_err();
        assert!(err.is_fatal_config());
        assert!(err.to_string().contains("KBCHAT_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_validate_zero_top_k() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        config.rag.top_k = 0;
        assert!(config.validate().is_err());
    }
}
