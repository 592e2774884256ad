//! Ask command implementation.

use crate::agent::Assistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run a single command through the assistant and print the answer.
pub async fn run_ask(command: &str, show_tools: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Assistant, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut assistant = Assistant::from_settings(&settings)?;

    let spinner = Output::spinner("Thinking...");
    let trace = assistant.execute_command_traced(command).await;
    spinner.finish_and_clear();
    assistant.shutdown();

    if show_tools && !trace.tool_calls.is_empty() {
        Output::header(&format!("Tool calls ({})", trace.tool_calls.len()));
        for record in &trace.tool_calls {
            Output::tool_call(record);
        }
        println!();
    }

    if trace.failed {
        Output::error(&trace.answer);
        anyhow::bail!("command failed");
    }

    println!("{}", trace.answer);
    Ok(())
}
