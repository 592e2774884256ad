//! CLI module for kimi-agent.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Kimi Agent - a tool-calling assistant over a local vector store
///
/// Talk to the Kimi model in plain language; it can store and search
/// documents, chunk local files and download web pages on your behalf.
#[derive(Parser, Debug)]
#[command(name = "kimi-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Defaults to `chat` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive session (the default)
    Chat,

    /// Run a single command and print the answer
    Ask {
        /// What to ask or ask for, in natural language
        command: String,

        /// Also list the tools the model called
        #[arg(short, long)]
        tools: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Write the current configuration to the config file
    Init,

    /// Show configuration file path
    Path,
}
