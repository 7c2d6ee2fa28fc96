//! Doctor command - verify external tools, the model runtime and configuration.

use crate::cli::Output;
use crate::config::Settings;
use crate::runtime::{Availability, ModelRuntime, OllamaRuntime};
use crate::session::resolve_model;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("url2tldr Doctor");
    println!();
    println!("Checking external tools, the model runtime and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    let tool_check = check_ytdlp(&settings.youtube.ytdlp_path).await;
    tool_check.print();
    checks.push(tool_check);

    println!();

    println!("{}", style("Model Runtime").bold());
    let runtime_checks = check_runtime(settings).await;
    for check in &runtime_checks {
        check.print();
    }
    checks.extend(runtime_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(), check_prompts(settings)];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using url2tldr.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! url2tldr is ready to use.");
    }

    Ok(())
}

/// yt-dlp is optional: without it, prompts just lack video details.
async fn check_ytdlp(path: &str) -> CheckResult {
    let output = tokio::process::Command::new(path).arg("--version").output().await;

    match output {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();
            CheckResult::ok("yt-dlp", &version)
        }
        Ok(_) => CheckResult::warning("yt-dlp", "installed but not working", install_hint_ytdlp()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::warning(
            "yt-dlp",
            "not found (video details will be missing from prompts)",
            install_hint_ytdlp(),
        ),
        Err(e) => CheckResult::warning("yt-dlp", &format!("error: {}", e), install_hint_ytdlp()),
    }
}

async fn check_runtime(settings: &Settings) -> Vec<CheckResult> {
    let name = "Ollama";
    let runtime = match OllamaRuntime::new(&settings.runtime) {
        Ok(runtime) => runtime,
        Err(e) => return vec![CheckResult::error(name, &e.to_string(), "Check the [runtime] section")],
    };

    match runtime.probe().await {
        Ok(Availability::Reachable { version }) => {
            let mut results = vec![CheckResult::ok(
                name,
                &format!(
                    "{} (version {})",
                    runtime.base_url(),
                    version.as_deref().unwrap_or("unknown")
                ),
            )];
            results.push(match runtime.list_models().await {
                Ok(models) => check_models(&models, settings.runtime.default_model.as_deref()),
                Err(e) => CheckResult::error("Models", &e.to_string(), "Check the runtime logs"),
            });
            results
        }
        Ok(Availability::Unreachable { reason }) => vec![CheckResult::warning(
            name,
            &reason,
            "Start it with: ollama serve (prompts still work without it)",
        )],
        Err(e) => vec![CheckResult::warning(name, &e.to_string(), "Is something slow answering on that port?")],
    }
}

fn check_models(models: &[String], default_model: Option<&str>) -> CheckResult {
    if models.is_empty() {
        return CheckResult::warning("Models", "none installed", "Install one with: ollama pull llama3.2");
    }

    match default_model {
        Some(name) if resolve_model(models, name).is_none() => CheckResult::warning(
            "Models",
            &format!("{} installed, default '{}' is not one of them", models.len(), name),
            &format!("Install it with: ollama pull {}", name),
        ),
        _ => CheckResult::ok("Models", &format!("{} installed", models.len())),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: url2tldr config edit",
        )
    }
}

fn check_prompts(settings: &Settings) -> CheckResult {
    let Some(dir) = settings.prompts.custom_dir.as_deref() else {
        return CheckResult::ok("Prompts", "built-in templates");
    };

    let path = Settings::expand_path(dir);
    if !path.is_dir() {
        return CheckResult::warning(
            "Prompts",
            &format!("{} does not exist", path.display()),
            "Create it and add youtube.toml / reddit.toml overrides",
        );
    }

    match crate::config::Prompts::load(Some(dir), Some(&settings.prompts.variables)) {
        Ok(_) => CheckResult::ok("Prompts", &format!("custom templates from {}", path.display())),
        Err(e) => CheckResult::error("Prompts", &e.to_string(), "Fix the template files"),
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}
