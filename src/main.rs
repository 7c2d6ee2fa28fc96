//! url2tldr CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url2tldr::cli::{commands, Cli, Commands};
use url2tldr::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("url2tldr={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    // Execute command
    match &cli.command {
        Commands::Prompt { url, output } => {
            commands::run_prompt(url, output.clone(), settings).await?;
        }

        Commands::Models => {
            commands::run_models(settings).await?;
        }

        Commands::Summarize { url, model, show_prompt } => {
            commands::run_summarize(url, model.clone(), *show_prompt, settings).await?;
        }

        Commands::Serve { host, port, url } => {
            commands::run_serve(host.clone(), *port, url.clone(), settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
