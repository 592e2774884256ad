//! OpenAI-compatible client construction.
//!
//! The chat endpoint (Kimi) and the embedding endpoint are configured
//! separately, each with its own key, base URL and timeout.

use crate::error::{KimiError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a client for an OpenAI-compatible endpoint.
///
/// `base_url` of `None` keeps the library default (`https://api.openai.com/v1`).
pub fn create_client(
    base_url: Option<&str>,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| KimiError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(url) = base_url {
        config = config.with_api_base(url.trim_end_matches('/'));
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
