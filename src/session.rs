//! Two-track session state machine.
//!
//! The extraction track goes `Idle → Classifying → Extracting → PromptReady`.
//! The runtime track goes `Unknown → Probing → ModelsListed → Running →
//! RunComplete | RunFailed`. The tracks never touch each other's state.
//!
//! Every dispatched operation gets a sequence number from its track. A
//! completion is applied only if its number is still the latest one issued and
//! the track is still waiting for it; anything else is stale and dropped.
//! Nothing here performs I/O.

use crate::error::{ErrorKind, Result, Url2TldrError};
use crate::prompt::Prompt;
use crate::source::{Classification, SourceKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Per-track submission sequence number.
pub type Seq = u64;

/// A user-facing message attached to a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
    /// Technical detail, when there is any.
    pub detail: Option<String>,
}

impl Notice {
    pub fn new(kind: ErrorKind, detail: Option<String>) -> Self {
        Self {
            kind,
            message: kind.user_message().to_string(),
            detail,
        }
    }
}

impl From<&Url2TldrError> for Notice {
    fn from(err: &Url2TldrError) -> Self {
        Notice::new(err.kind(), Some(err.to_string()))
    }
}

impl From<Url2TldrError> for Notice {
    fn from(err: Url2TldrError) -> Self {
        Notice::from(&err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExtractionState {
    /// Waiting for a URL. Carries the warning or error of the last attempt.
    Idle { notice: Option<Notice> },
    Classifying { seq: Seq, input: String },
    Extracting { seq: Seq, kind: SourceKind, source_url: String },
    PromptReady { seq: Seq, prompt: Prompt },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RuntimeState {
    Unknown { notice: Option<Notice> },
    Probing { seq: Seq },
    ModelsListed { models: Vec<String>, suggested: Option<String> },
    Running { seq: Seq, model: String, prompt_seq: Option<Seq> },
    RunComplete { result: RunResult },
    RunFailed { result: RunResult },
}

/// Outcome of one model run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunResult {
    Succeeded {
        model: String,
        prompt_used: String,
        /// Extraction sequence of the prompt the run was started from.
        prompt_seq: Option<Seq>,
        output_text: String,
        succeeded_at: DateTime<Utc>,
    },
    Failed {
        model: String,
        prompt_used: String,
        prompt_seq: Option<Seq>,
        error: Notice,
    },
}

impl RunResult {
    pub fn model(&self) -> &str {
        match self {
            RunResult::Succeeded { model, .. } | RunResult::Failed { model, .. } => model,
        }
    }

    pub fn prompt_seq(&self) -> Option<Seq> {
        match self {
            RunResult::Succeeded { prompt_seq, .. } | RunResult::Failed { prompt_seq, .. } => *prompt_seq,
        }
    }
}

/// What to run: a model, the prompt text and the prompt it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub model: String,
    pub prompt_text: String,
    pub prompt_seq: Option<Seq>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Unreachable(String),
    Listed(Vec<String>),
    Failed(Notice),
}

/// Completion of a dispatched operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ExtractionFinished { seq: Seq, outcome: std::result::Result<Prompt, Notice> },
    ProbeFinished { seq: Seq, outcome: ProbeOutcome },
    RunFinished { seq: Seq, outcome: std::result::Result<String, Notice> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    Stale,
}

/// Everything the presentation layer needs to render progress and results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub extraction: ExtractionState,
    pub runtime: RuntimeState,
    /// Models from the last successful listing.
    pub models: Option<Vec<String>>,
    /// Result superseded by the current run.
    pub previous_result: Option<RunResult>,
    /// Whether the current run result was produced from the current prompt.
    pub result_matches_prompt: bool,
}

/// State of one user session.
#[derive(Debug, Clone)]
pub struct Session {
    extraction: ExtractionState,
    extraction_seq: Seq,
    runtime: RuntimeState,
    runtime_seq: Seq,
    models: Option<Vec<String>>,
    previous_result: Option<RunResult>,
    last_run: Option<RunRequest>,
    default_model: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Session {
    pub fn new(default_model: Option<String>) -> Self {
        Self {
            extraction: ExtractionState::Idle { notice: None },
            extraction_seq: 0,
            runtime: RuntimeState::Unknown { notice: None },
            runtime_seq: 0,
            models: None,
            previous_result: None,
            last_run: None,
            default_model,
        }
    }

    pub fn extraction(&self) -> &ExtractionState {
        &self.extraction
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    pub fn models(&self) -> Option<&[String]> {
        self.models.as_deref()
    }

    pub fn previous_result(&self) -> Option<&RunResult> {
        self.previous_result.as_ref()
    }

    pub fn current_prompt(&self) -> Option<(Seq, &Prompt)> {
        match &self.extraction {
            ExtractionState::PromptReady { seq, prompt } => Some((*seq, prompt)),
            _ => None,
        }
    }

    pub fn current_result(&self) -> Option<&RunResult> {
        match &self.runtime {
            RuntimeState::RunComplete { result } | RuntimeState::RunFailed { result } => Some(result),
            _ => None,
        }
    }

    /// Whether the current run result belongs to the prompt now on display.
    pub fn result_matches_prompt(&self) -> bool {
        match (self.current_result(), self.current_prompt()) {
            (Some(result), Some((seq, _))) => result.prompt_seq() == Some(seq),
            _ => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            extraction: self.extraction.clone(),
            runtime: self.runtime.clone(),
            models: self.models.clone(),
            previous_result: self.previous_result.clone(),
            result_matches_prompt: self.result_matches_prompt(),
        }
    }

    // ------------------------------------------------------------------
    // Extraction track
    // ------------------------------------------------------------------

    /// Start a new submission. Always allowed; supersedes any in-flight one.
    pub fn submit_url(&mut self, input: &str) -> Seq {
        self.extraction_seq += 1;
        self.extraction = ExtractionState::Classifying {
            seq: self.extraction_seq,
            input: input.trim().to_string(),
        };
        self.extraction_seq
    }

    /// Record the classification of submission `seq`.
    pub fn classified(&mut self, seq: Seq, classification: &Classification) -> Applied {
        if !matches!(self.extraction, ExtractionState::Classifying { seq: s, .. } if s == seq) {
            debug!(seq, current = self.extraction_seq, "Dropping stale classification");
            return Applied::Stale;
        }

        self.extraction = match classification.canonical_url() {
            Some(source_url) => ExtractionState::Extracting {
                seq,
                kind: classification.kind(),
                source_url,
            },
            None => ExtractionState::Idle {
                notice: Some(Notice::new(ErrorKind::ClassificationUnsupported, None)),
            },
        };
        Applied::Accepted
    }

    // ------------------------------------------------------------------
    // Runtime track
    // ------------------------------------------------------------------

    /// Start an availability probe (followed by a model listing).
    pub fn begin_probe(&mut self) -> Result<Seq> {
        if matches!(self.runtime, RuntimeState::Probing { .. } | RuntimeState::Running { .. }) {
            return Err(Url2TldrError::InvalidTransition(
                "the runtime is busy; wait for the current operation to finish".to_string(),
            ));
        }
        self.runtime_seq += 1;
        self.runtime = RuntimeState::Probing { seq: self.runtime_seq };
        Ok(self.runtime_seq)
    }

    /// Start a run. Requires a model list that contains the model.
    ///
    /// Returns the run's sequence number and the request with the model name
    /// resolved against the listing.
    pub fn begin_run(&mut self, mut request: RunRequest) -> Result<(Seq, RunRequest)> {
        if !matches!(
            self.runtime,
            RuntimeState::ModelsListed { .. } | RuntimeState::RunComplete { .. } | RuntimeState::RunFailed { .. }
        ) {
            return Err(Url2TldrError::InvalidTransition(
                "list the installed models before running one".to_string(),
            ));
        }

        let models = self.models.as_deref().unwrap_or_default();
        request.model = resolve_model(models, &request.model)
            .ok_or_else(|| Url2TldrError::ModelNotFound(request.model.clone()))?;

        if let Some(result) = self.current_result().cloned() {
            self.previous_result = Some(result);
        }

        self.runtime_seq += 1;
        self.runtime = RuntimeState::Running {
            seq: self.runtime_seq,
            model: request.model.clone(),
            prompt_seq: request.prompt_seq,
        };
        self.last_run = Some(request.clone());
        Ok((self.runtime_seq, request))
    }

    /// Re-run the failed request. Only valid after a failed run.
    pub fn retry_run(&mut self) -> Result<(Seq, RunRequest)> {
        if !matches!(self.runtime, RuntimeState::RunFailed { .. }) {
            return Err(Url2TldrError::InvalidTransition(
                "only a failed run can be retried".to_string(),
            ));
        }
        let request = self
            .last_run
            .clone()
            .ok_or_else(|| Url2TldrError::InvalidTransition("no run to retry".to_string()))?;
        self.begin_run(request)
    }

    // ------------------------------------------------------------------
    // Completions
    // ------------------------------------------------------------------

    pub fn apply(&mut self, event: SessionEvent) -> Applied {
        match event {
            SessionEvent::ExtractionFinished { seq, outcome } => {
                if !matches!(self.extraction, ExtractionState::Extracting { seq: s, .. } if s == seq) {
                    debug!(seq, current = self.extraction_seq, "Dropping stale extraction result");
                    return Applied::Stale;
                }
                self.extraction = match outcome {
                    Ok(prompt) => ExtractionState::PromptReady { seq, prompt },
                    Err(notice) => ExtractionState::Idle { notice: Some(notice) },
                };
            }
            SessionEvent::ProbeFinished { seq, outcome } => {
                if !matches!(self.runtime, RuntimeState::Probing { seq: s } if s == seq) {
                    debug!(seq, current = self.runtime_seq, "Dropping stale probe result");
                    return Applied::Stale;
                }
                self.runtime = match outcome {
                    ProbeOutcome::Listed(models) => {
                        let suggested = self
                            .default_model
                            .as_deref()
                            .and_then(|name| resolve_model(&models, name))
                            .or_else(|| models.first().cloned());
                        self.models = Some(models.clone());
                        RuntimeState::ModelsListed { models, suggested }
                    }
                    ProbeOutcome::Unreachable(reason) => {
                        self.models = None;
                        RuntimeState::Unknown {
                            notice: Some(Notice::new(ErrorKind::RuntimeUnreachable, Some(reason))),
                        }
                    }
                    ProbeOutcome::Failed(notice) => {
                        self.models = None;
                        RuntimeState::Unknown { notice: Some(notice) }
                    }
                };
            }
            SessionEvent::RunFinished { seq, outcome } => {
                let RuntimeState::Running { seq: current, .. } = &self.runtime else {
                    debug!(seq, current = self.runtime_seq, "Dropping run result with no run in flight");
                    return Applied::Stale;
                };
                if *current != seq {
                    debug!(seq, current = *current, "Dropping superseded run result");
                    return Applied::Stale;
                }
                let Some(request) = self.last_run.clone() else {
                    return Applied::Stale;
                };

                self.runtime = match outcome {
                    Ok(text) => RuntimeState::RunComplete {
                        result: RunResult::Succeeded {
                            model: request.model,
                            prompt_used: request.prompt_text,
                            prompt_seq: request.prompt_seq,
                            output_text: text.trim().to_string(),
                            succeeded_at: Utc::now(),
                        },
                    },
                    Err(error) => RuntimeState::RunFailed {
                        result: RunResult::Failed {
                            model: request.model,
                            prompt_used: request.prompt_text,
                            prompt_seq: request.prompt_seq,
                            error,
                        },
                    },
                };
            }
        }
        Applied::Accepted
    }
}

/// Match a model name against a listing, accepting a missing `:latest` tag.
pub fn resolve_model(models: &[String], name: &str) -> Option<String> {
    let name = name.trim();
    models
        .iter()
        .find(|m| *m == name)
        .or_else(|| models.iter().find(|m| **m == format!("{}:latest", name)))
        .cloned()
}
