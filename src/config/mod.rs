//! Configuration module for kimi-agent.
//!
//! Handles loading and saving application settings.

mod settings;

pub use settings::{
    load_env_file, ChunkingSettings, EmbeddingSettings, GeneralSettings, LlmSettings,
    RetrySettings, Settings, VectorStoreSettings, WebSettings,
};
