//! Configuration settings for kimi-agent.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub chunking: ChunkingSettings,
    pub web: WebSettings,
    pub retry: RetrySettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log file name inside the data directory. Empty means console only.
    pub log_file: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.kimi-agent".to_string(),
            log_file: Some("kimi_agent.log".to_string()),
        }
    }
}

/// Chat-completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible base URL.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// HTTP timeout for a single request.
    pub timeout_seconds: u64,
    /// Replaces the built-in system prompt when set.
    pub system_prompt: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.moonshot.cn/v1".to_string(),
            api_key_env: "MOONSHOT_API_KEY".to_string(),
            model: "kimi-k2-0711-preview".to_string(),
            temperature: 0.3,
            timeout_seconds: 300,
            system_prompt: None,
        }
    }
}

/// Embedding endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL override. Falls back to `OPENAI_API_BASE`, then the OpenAI default.
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// HTTP timeout for a single embeddings request.
    pub timeout_seconds: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            timeout_seconds: 60,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Path to the SQLite database file.
    pub sqlite_path: String,
    /// Prefix added to every collection this tool creates.
    pub collection_prefix: String,
    /// Maximum documents returned by `get_collection_content`.
    pub content_limit: usize,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.kimi-agent/kimi_agent.db".to_string(),
            collection_prefix: "kimi_agent_".to_string(),
            content_limit: 100,
        }
    }
}

/// Text chunking settings for file uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

/// Web downloader settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    /// Directory where downloaded pages are written.
    pub download_dir: String,
    /// Per-request timeout.
    pub timeout_seconds: u64,
    /// Pause after each request of a batch download.
    pub pacing_seconds: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Characters of extracted text echoed back to the model.
    pub preview_chars: usize,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            download_dir: "~/.kimi-agent/downloads".to_string(),
            timeout_seconds: 30,
            pacing_seconds: 1,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/94.0.4606.81 Safari/537.36"
                .to_string(),
            preview_chars: 500,
        }
    }
}

/// Rate-limit retry schedule for LLM calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first rate-limited attempt.
    pub initial_delay_seconds: f64,
    /// Factor applied to the delay after every further attempt.
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_seconds: 20.0,
            multiplier: 1.5,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::KimiError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kimi-agent")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded download directory path.
    pub fn download_dir(&self) -> PathBuf {
        Self::expand_path(&self.web.download_dir)
    }

    /// Read the chat endpoint API key from its configured environment variable.
    pub fn llm_api_key(&self) -> crate::error::Result<String> {
        read_key(&self.llm.api_key_env)
    }

    /// Read the embedding endpoint API key from its configured environment variable.
    pub fn embedding_api_key(&self) -> crate::error::Result<String> {
        read_key(&self.embedding.api_key_env)
    }

    /// Embedding base URL: explicit setting, then `OPENAI_API_BASE`.
    pub fn embedding_base_url(&self) -> Option<String> {
        self.embedding
            .base_url
            .clone()
            .or_else(|| std::env::var("OPENAI_API_BASE").ok())
            .filter(|u| !u.is_empty())
    }
}

impl RetrySettings {
    /// Delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs_f64(self.initial_delay_seconds.max(0.0))
    }
}

/// Load `KEY=value` pairs from a `.env` file into the process environment.
///
/// Without a path, `.env` is looked up from the current directory upwards.
/// Variables that are already set keep their value. Returns the file that
/// was loaded, if any.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenv::from_path(path).ok().map(|_| path.to_path_buf()),
        None => dotenv::dotenv().ok(),
    }
}

fn read_key(var: &str) -> crate::error::Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(key),
        Ok(_) => Err(crate::error::KimiError::Config(format!("{} is empty", var))),
        Err(_) => Err(crate::error::KimiError::Config(format!("{} not set", var))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.vector_store.collection_prefix, "kimi_agent_");
        assert_eq!(settings.chunking.chunk_size, 500);
        assert_eq!(settings.chunking.overlap, 50);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.initial_delay(), Duration::from_secs(20));
        assert_eq!(settings.web.timeout_seconds, 30);
        assert_eq!(settings.embedding.timeout_seconds, 60);
        assert_eq!(settings.general.log_file.as_deref(), Some("kimi_agent.log"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [llm]
            model = "moonshot-v1-8k"

            [retry]
            max_attempts = 3
            "#,
        )
        .unwrap();

        assert_eq!(settings.llm.model, "moonshot-v1-8k");
        assert_eq!(settings.llm.base_url, "https://api.moonshot.cn/v1");
        assert_eq!(settings.retry.max_attempts, 3);
        assert!((settings.retry.multiplier - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.general.log_file = Some("session.log".to_string());
        settings.embedding.timeout_seconds = 15;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.general.log_file.as_deref(), Some("session.log"));
        assert_eq!(loaded.embedding.timeout_seconds, 15);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = PathBuf::from("/nonexistent/kimi-agent/config.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.llm.api_key_env, "MOONSHOT_API_KEY");
    }
}
