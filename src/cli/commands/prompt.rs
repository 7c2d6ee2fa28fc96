//! Prompt command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::ErrorKind;
use crate::orchestrator::Orchestrator;
use crate::prompt::Prompt;
use crate::session::ExtractionState;
use anyhow::Result;

/// Run the prompt command.
pub async fn run_prompt(url: &str, output: Option<String>, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;
    let prompt = extract_prompt(&orchestrator, url).await?;

    match output {
        Some(path) => {
            let path = Settings::expand_path(&path);
            std::fs::write(&path, &prompt.text)?;
            Output::success(&format!("Prompt written to {}", path.display()));
        }
        None => println!("{}", prompt.text),
    }

    Ok(())
}

/// Submit a URL and wait for its prompt, reporting failures on the way.
pub(crate) async fn extract_prompt(orchestrator: &Orchestrator, url: &str) -> Result<Prompt> {
    let spinner = Output::spinner(&format!("Extracting {}", url.trim()));
    orchestrator.submit_url(url);
    let snapshot = orchestrator.wait_for_extraction().await;
    spinner.finish_and_clear();

    match snapshot.extraction {
        ExtractionState::PromptReady { prompt, .. } => {
            if prompt.is_partial() {
                Output::warning(ErrorKind::ExtractionPartial.user_message());
                for issue in &prompt.issues {
                    Output::list_item(&issue.to_string());
                }
            }
            Ok(prompt)
        }
        ExtractionState::Idle { notice: Some(notice) } => {
            Output::notice(&notice);
            anyhow::bail!("no prompt was produced ({})", notice.kind)
        }
        other => anyhow::bail!("extraction ended in an unexpected state: {:?}", other),
    }
}
