//! CLI module for url2tldr.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// url2tldr - summarize YouTube videos and Reddit threads with a local model
///
/// Paste a URL to get a ready-to-use summarization prompt, or run it
/// straight away against a locally running Ollama.
#[derive(Parser, Debug)]
#[command(name = "url2tldr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the summarization prompt for a YouTube or Reddit URL
    Prompt {
        /// YouTube video or Reddit thread URL
        url: String,

        /// Write the prompt to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List the models installed in the local runtime
    Models,

    /// Build the prompt for a URL and run it on a local model
    Summarize {
        /// YouTube video or Reddit thread URL
        url: String,

        /// Model to use (default: configured default model, else the first installed)
        #[arg(short, long)]
        model: Option<String>,

        /// Also print the prompt that was sent
        #[arg(long)]
        show_prompt: bool,
    },

    /// Start the HTTP interface
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// URL to submit as soon as the server starts
        #[arg(long)]
        url: Option<String>,
    },

    /// Check external tools, the model runtime and configuration
    Doctor,

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

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
