//! Models command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::session::RuntimeState;
use anyhow::Result;
use console::style;

/// Run the models command.
pub async fn run_models(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;
    let (models, suggested) = list_models(&orchestrator, &settings).await?;

    if models.is_empty() {
        Output::warning("The runtime is running but no models are installed.");
        Output::info("Install one with: ollama pull <model>");
        return Ok(());
    }

    Output::header("Installed models");
    for model in &models {
        if suggested.as_deref() == Some(model.as_str()) {
            Output::list_item(&format!("{} {}", model, style("(default)").dim()));
        } else {
            Output::list_item(model);
        }
    }

    Ok(())
}

/// Probe the runtime and return its models plus the suggested one.
pub(crate) async fn list_models(
    orchestrator: &Orchestrator,
    settings: &Settings,
) -> Result<(Vec<String>, Option<String>)> {
    let spinner = Output::spinner(&format!("Contacting runtime at {}", settings.runtime.base_url));
    orchestrator.probe_runtime()?;
    let snapshot = orchestrator.wait_for_runtime().await;
    spinner.finish_and_clear();

    match snapshot.runtime {
        RuntimeState::ModelsListed { models, suggested } => Ok((models, suggested)),
        RuntimeState::Unknown { notice: Some(notice) } => {
            Output::notice(&notice);
            anyhow::bail!("model runtime not available ({})", notice.kind)
        }
        other => anyhow::bail!("runtime probe ended in an unexpected state: {:?}", other),
    }
}
