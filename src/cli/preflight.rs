//! Pre-flight checks before talking to the model.
//!
//! Validates that the required API keys are available before starting a
//! session that would otherwise fail on its first request.

use crate::config::Settings;
use crate::error::{KimiError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Chat and ask need the chat key and the embedding key.
    Assistant,
    /// Showing configuration needs nothing.
    Config,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Assistant => {
            check_api_key(&settings.llm.api_key_env)?;
            check_api_key(&settings.embedding.api_key_env)?;
        }
        Operation::Config => {}
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(KimiError::Config(format!(
            "{} is empty. Set it with: export {}='sk-...' or add it to .env",
            var, var
        ))),
        Err(_) => Err(KimiError::Config(format!(
            "{} not set. Set it with: export {}='sk-...' or add it to .env",
            var, var
        ))),
    }
}
