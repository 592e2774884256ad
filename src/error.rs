//! Error types for kimi-agent.

use thiserror::Error;

/// Library-level error type for kimi-agent operations.
#[derive(Error, Debug)]
pub enum KimiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM API error: {0}")]
    Llm(String),

    #[error("LLM API rate limit: {0}")]
    RateLimited(String),

    #[error("LLM API call failed: exceeded maximum retries ({attempts} attempts)")]
    RetriesExhausted { attempts: u32 },

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Collection '{0}' does not exist, create it first")]
    CollectionNotFound(String),

    #[error("Database not connected, call connect_database first")]
    NotConnected,

    #[error("Download failed: {0}")]
    Fetch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Agent error: {0}")]
    Agent(String),
}

impl KimiError {
    /// Whether this error is a transient rate-limit rejection worth retrying.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, KimiError::RateLimited(_))
    }
}

/// Result type alias for kimi-agent operations.
pub type Result<T> = std::result::Result<T, KimiError>;
