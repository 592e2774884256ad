//! Tool-calling assistant.
//!
//! Runs one user command as a conversation with the chat model, executing
//! the vector-store and web tools the model asks for until it answers.
//! Rate-limited model calls are retried with exponential backoff.

mod llm;
mod resolve;
mod retry;
mod runner;
mod tools;

pub use llm::{ChatModel, ModelReply, OpenAIChatModel};
pub use resolve::{resolve_collection, SAMPLE_DATA_COLLECTION};
pub use retry::{retry_with_backoff, Backoff, Sleeper, TokioSleeper};
pub use runner::{Assistant, CommandTrace, ToolCallRecord, DEFAULT_SYSTEM_PROMPT};
pub use tools::{
    parse_tool_call, tool_definitions, PageBatch, ToolCall, ToolContext, ToolOutput, TOOL_NAMES,
};
