//! Interactive chat command.

use crate::agent::Assistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::future::Future;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Words that end the session, compared case-insensitively.
const QUIT_WORDS: [&str; 4] = ["quit", "exit", "bye", "退出"];

/// Whether the input asks to leave the session.
pub(crate) fn is_quit(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    QUIT_WORDS.contains(&input.as_str())
}

/// Result of waiting on work that an interrupt may cut short.
#[derive(Debug, PartialEq)]
pub(crate) enum Turn<T> {
    Done(T),
    Interrupted,
}

/// Drive `work` to completion unless `interrupt` fires first.
pub(crate) async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future,
) -> Turn<T> {
    tokio::select! {
        value = work => Turn::Done(value),
        _ = interrupt => Turn::Interrupted,
    }
}

/// Run the interactive chat command.
///
/// Each line is answered independently; the assistant keeps no memory
/// between commands. End of input or Ctrl-C, at the prompt or while a
/// command runs, ends the session and closes the store connection.
pub async fn run_chat(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Assistant, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut assistant = Assistant::from_settings(&settings)?;

    println!("\n{}", style("Kimi Agent").bold().cyan());
    println!(
        "{}\n",
        style("Ask anything, or manage your documents in plain language. Type 'quit' to leave.")
            .dim()
    );
    println!("{}", style("Examples:").dim());
    for example in [
        "Connect to the database and list all collections",
        "Upload ./notes.txt into a collection called notes",
        "Search my notes for vector databases",
        "Download three free books",
    ] {
        println!("  {} {}", style("*").cyan(), style(example).dim());
    }
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", style("You:").green().bold());
        io::stdout().flush()?;

        let reading = lines.next_line();
        let line = match until_interrupted(reading, tokio::signal::ctrl_c()).await {
            Turn::Done(line) => line?,
            Turn::Interrupted => {
                println!();
                Output::info("Interrupted. Goodbye!");
                break;
            }
        };

        let Some(line) = line else {
            println!();
            Output::info("Goodbye!");
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if is_quit(input) {
            Output::info("Goodbye!");
            break;
        }

        let spinner = Output::spinner("Thinking...");
        let running = assistant.execute_command_traced(input);
        let trace = match until_interrupted(running, tokio::signal::ctrl_c()).await {
            Turn::Done(trace) => trace,
            Turn::Interrupted => {
                spinner.finish_and_clear();
                Output::info("Interrupted. Goodbye!");
                break;
            }
        };
        spinner.finish_and_clear();

        for record in &trace.tool_calls {
            Output::tool_call(record);
        }

        if trace.failed {
            Output::error(&trace.answer);
        } else {
            println!("\n{} {}\n", style("Kimi:").cyan().bold(), trace.answer);
        }
    }

    assistant.shutdown();
    info!("Chat session closed");
    Ok(())
}
