//! OpenAI embeddings implementation.

use super::Embedder;
use crate::config::Settings;
use crate::error::{KimiError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Inputs per embeddings request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder from the `[embedding]` settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.embedding_api_key()?;
        let base_url = settings.embedding_base_url();
        let client = create_client(
            base_url.as_deref(),
            &api_key,
            Duration::from_secs(settings.embedding.timeout_seconds),
        )?;

        Ok(Self {
            client,
            model: settings.embedding.model.clone(),
            dimensions: settings.embedding.dimensions as usize,
        })
    }

    /// Create an embedder around an existing client.
    pub fn with_client(
        client: async_openai::Client<async_openai::config::OpenAIConfig>,
        model: &str,
        dimensions: usize,
    ) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
        }
    }

    /// Only the v3 models accept an explicit `dimensions` parameter.
    fn supports_dimensions(&self) -> bool {
        self.model.starts_with("text-embedding-3")
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| KimiError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let mut args = CreateEmbeddingRequestArgs::default();
            args.model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()));
            if self.supports_dimensions() {
                args.dimensions(self.dimensions as u32);
            }
            let request = args
                .build()
                .map_err(|e| KimiError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| KimiError::Embedding(format!("Embedding API error: {}", e)))?;

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> async_openai::Client<async_openai::config::OpenAIConfig> {
        create_client(None, "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_embedder_creation() {
        let embedder = OpenAIEmbedder::with_client(client(), "text-embedding-ada-002", 1536);
        assert_eq!(embedder.dimensions(), 1536);
        assert!(!embedder.supports_dimensions());

        let embedder = OpenAIEmbedder::with_client(client(), "text-embedding-3-large", 3072);
        assert_eq!(embedder.dimensions(), 3072);
        assert!(embedder.supports_dimensions());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let embedder = OpenAIEmbedder::with_client(client(), "text-embedding-ada-002", 1536);
        assert!(embedder.embed_batch(&[]).await.unwrap().is_empty());
    }
}
