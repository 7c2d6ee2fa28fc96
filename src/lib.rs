//! url2tldr - summarize YouTube videos and Reddit threads with a local model
//!
//! Paste a URL, get a ready-to-use summarization prompt, and optionally run it
//! against a locally running model runtime (Ollama).
//!
//! # Architecture
//!
//! - `source` - URL classification and content extraction (YouTube captions, Reddit threads)
//! - `prompt` - Prompt synthesis from extracted content
//! - `runtime` - Local model runtime client
//! - `session` - Two-track state machine (extraction, runtime)
//! - `orchestrator` - Dispatches background work and publishes session snapshots
//! - `config` - Settings and prompt templates
//! - `cli` - Command-line and HTTP front ends
//!
//! # Example
//!
//! ```rust,no_run
//! use url2tldr::config::Settings;
//! use url2tldr::orchestrator::Orchestrator;
//! use url2tldr::session::ExtractionState;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     orchestrator.submit_url("https://youtu.be/dQw4w9WgXcQ?t=42");
//!     if let ExtractionState::PromptReady { prompt, .. } = orchestrator.wait_for_extraction().await.extraction {
//!         println!("{}", prompt.text);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod runtime;
pub mod session;
pub mod source;

pub use error::{ErrorKind, Result, Url2TldrError};
