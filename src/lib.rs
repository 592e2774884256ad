//! Kimi Agent - a tool-calling assistant over a local vector store
//!
//! A command-line assistant that lets the Kimi chat model answer questions
//! and manage documents by calling tools: a SQLite-backed vector store and
//! a web page downloader.
//!
//! # Overview
//!
//! Kimi Agent allows you to:
//! - Ask questions in natural language and get direct answers
//! - Create collections and add documents with OpenAI embeddings
//! - Chunk local text files and upload them into collections
//! - Search collections by semantic similarity
//! - Download web pages and public-domain books as text
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `agent` - Conversation loop, tool catalog, retry with backoff
//! - `knowledge` - Vector-store operations exposed as tools
//! - `vector_store` - Vector database abstraction (SQLite, in-memory)
//! - `embedding` - Embedding generation
//! - `chunking` - Fixed-window text chunking
//! - `web` - Web page download and text extraction
//!
//! # Example
//!
//! ```rust,no_run
//! use kimi_agent::agent::Assistant;
//! use kimi_agent::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut assistant = Assistant::from_settings(&settings)?;
//!
//!     let answer = assistant
//!         .execute_command("Connect to the database and list all collections")
//!         .await;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod logging;
pub mod openai;
pub mod vector_store;
pub mod web;

pub use error::{KimiError, Result};
