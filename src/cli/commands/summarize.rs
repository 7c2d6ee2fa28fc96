//! Summarize command implementation.

use super::models::list_models;
use super::prompt::extract_prompt;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::session::{RunResult, RuntimeState};
use anyhow::Result;
use console::style;

/// Run the summarize command.
pub async fn run_summarize(
    url: &str,
    model: Option<String>,
    show_prompt: bool,
    settings: Settings,
) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;

    // The tracks are independent: probe the runtime while content is fetched.
    let (prompt, listing) = tokio::join!(
        extract_prompt(&orchestrator, url),
        list_models(&orchestrator, &settings)
    );
    let prompt = prompt?;
    let (_, suggested) = listing?;

    if show_prompt {
        Output::header("Prompt");
        println!("{}", prompt.text);
    }

    let Some(model) = model.or(suggested) else {
        Output::info("Install one with: ollama pull <model>");
        anyhow::bail!("no models are installed in the runtime");
    };

    let spinner = Output::spinner(&format!("Summarizing with {}", model));
    orchestrator.run_model(&model)?;
    let snapshot = orchestrator.wait_for_runtime().await;
    spinner.finish_and_clear();

    match snapshot.runtime {
        RuntimeState::RunComplete {
            result: RunResult::Succeeded { output_text, model, .. },
        } => {
            Output::header(&format!("Summary ({})", model));
            println!("{}", output_text);
            println!("\n{}", style(&prompt.source_url).dim());
            Ok(())
        }
        RuntimeState::RunFailed {
            result: RunResult::Failed { error, .. },
        } => {
            Output::notice(&error);
            anyhow::bail!("model run failed ({})", error.kind)
        }
        other => anyhow::bail!("model run ended in an unexpected state: {:?}", other),
    }
}
