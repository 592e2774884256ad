//! Chat model seam: one tool-enabled completion per call.

use crate::config::Settings;
use crate::error::{KimiError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestMessage, ChatCompletionTool,
    ChatCompletionToolChoiceOption, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// What the model answered with.
#[derive(Debug, Clone)]
pub enum ModelReply {
    /// The model wants these tools run before it answers.
    ToolCalls(Vec<ChatCompletionMessageToolCall>),
    /// Final answer text.
    Answer(String),
}

/// A chat model that can request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the conversation so far and return the model's next reply.
    ///
    /// Rate limiting must surface as [`KimiError::RateLimited`] so the
    /// caller can retry it.
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ModelReply>;
}

/// Chat model behind an OpenAI-compatible endpoint (Moonshot by default).
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str, temperature: f32) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature,
        }
    }

    /// Create a model client from the `[llm]` settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.llm_api_key()?;
        let client = create_client(
            Some(&settings.llm.base_url),
            &api_key,
            Duration::from_secs(settings.llm.timeout_seconds),
        )?;
        Ok(Self::new(client, &settings.llm.model, settings.llm.temperature))
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn complete(
        &self,
        messages: &[ChatCompletionRequestMessage],
        tools: &[ChatCompletionTool],
    ) -> Result<ModelReply> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages.to_vec())
            .temperature(self.temperature)
            .tools(tools.to_vec())
            .tool_choice(ChatCompletionToolChoiceOption::Auto)
            .build()
            .map_err(|e| KimiError::Agent(e.to_string()))?;

        debug!("Sending {} messages to {}", messages.len(), self.model);

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| KimiError::Llm("No response from model".to_string()))?;

        match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() => Ok(ModelReply::ToolCalls(calls)),
            _ => Ok(ModelReply::Answer(choice.message.content.unwrap_or_default())),
        }
    }
}

/// Map a client error, separating rate limiting from other failures.
fn classify_error(err: OpenAIError) -> KimiError {
    let status_429 = match &err {
        OpenAIError::Reqwest(e) => e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS),
        _ => false,
    };

    let message = err.to_string();
    if status_429 || is_rate_limit_message(&message) {
        KimiError::RateLimited(message)
    } else {
        KimiError::Llm(message)
    }
}

fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate_limit") || lower.contains("rate limit") || message.contains("429")
}
