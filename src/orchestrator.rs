//! Session orchestrator for url2tldr.
//!
//! Owns the [`Session`] state machine and dispatches every external call as a
//! background task. Completions come back as [`SessionEvent`]s and are applied
//! only if still current. Each change is published as a [`SessionSnapshot`] on
//! a watch channel, which is what the presentation layer reads.

use crate::config::{Prompts, RuntimeSettings, Settings};
use crate::error::{Result, Url2TldrError};
use crate::prompt::{Prompt, PromptSynthesizer};
use crate::runtime::{Availability, ModelRuntime, OllamaRuntime};
use crate::session::{
    Applied, ExtractionState, Notice, ProbeOutcome, RunRequest, RuntimeState, Seq, Session,
    SessionEvent, SessionSnapshot,
};
use crate::source::{Classification, Extractor, RedditExtractor, SourceKind, UrlClassifier, YoutubeExtractor};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// The pieces the orchestrator drives.
pub struct Components {
    pub youtube: Arc<dyn Extractor>,
    pub reddit: Arc<dyn Extractor>,
    pub runtime: Arc<dyn ModelRuntime>,
    pub prompts: Prompts,
}

/// Handle to a session. Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    classifier: UrlClassifier,
    youtube: Arc<dyn Extractor>,
    reddit: Arc<dyn Extractor>,
    synthesizer: PromptSynthesizer,
    runtime: Arc<dyn ModelRuntime>,
    runtime_settings: RuntimeSettings,
    extraction_timeout: Duration,
    session: Mutex<Session>,
    updates: watch::Sender<SessionSnapshot>,
}

impl Orchestrator {
    /// Create an orchestrator with the default extractors and the Ollama runtime.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let components = Components {
            youtube: Arc::new(YoutubeExtractor::new(&settings.youtube)?),
            reddit: Arc::new(RedditExtractor::new(&settings.reddit)?),
            runtime: Arc::new(OllamaRuntime::new(&settings.runtime)?),
            prompts,
        };

        Ok(Self::with_components(settings, components))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(settings: &Settings, components: Components) -> Self {
        let session = Session::new(settings.runtime.default_model.clone());
        let (updates, _) = watch::channel(session.snapshot());

        Self {
            inner: Arc::new(Inner {
                classifier: UrlClassifier::new(),
                youtube: components.youtube,
                reddit: components.reddit,
                synthesizer: PromptSynthesizer::new(components.prompts),
                runtime: components.runtime,
                runtime_settings: settings.runtime.clone(),
                extraction_timeout: settings.extraction_timeout(),
                session: Mutex::new(session),
                updates,
            }),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Wait until the extraction track is no longer busy.
    pub async fn wait_for_extraction(&self) -> SessionSnapshot {
        self.wait_until(|s| {
            !matches!(
                s.extraction,
                ExtractionState::Classifying { .. } | ExtractionState::Extracting { .. }
            )
        })
        .await
    }

    /// Wait until the runtime track is no longer busy.
    pub async fn wait_for_runtime(&self) -> SessionSnapshot {
        self.wait_until(|s| {
            !matches!(s.runtime, RuntimeState::Probing { .. } | RuntimeState::Running { .. })
        })
        .await
    }

    async fn wait_until(&self, done: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
        let mut rx = self.subscribe();
        let snapshot = match rx.wait_for(done).await {
            Ok(snapshot) => snapshot.clone(),
            // The sender lives as long as `self`.
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    // ------------------------------------------------------------------
    // Extraction track
    // ------------------------------------------------------------------

    /// Submit a URL. Supersedes any submission still in flight.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip(self))]
    pub fn submit_url(&self, input: &str) -> Seq {
        let seq = self.update(|session| session.submit_url(input));

        let classification = self.inner.classifier.classify(input);
        info!(seq, kind = %classification.kind(), "Classified input");

        if self.update(|session| session.classified(seq, &classification)) == Applied::Stale {
            return seq;
        }
        if classification.kind() == SourceKind::Unsupported {
            return seq;
        }

        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.extract(&classification).await.map_err(|e| {
                warn!(seq, "Extraction failed: {}", e);
                Notice::from(&e)
            });
            this.update(|session| session.apply(SessionEvent::ExtractionFinished { seq, outcome }));
        });

        seq
    }

    async fn extract(&self, classification: &Classification) -> Result<Prompt> {
        let kind = classification.kind();
        let extractor = [&self.inner.youtube, &self.inner.reddit]
            .into_iter()
            .find(|extractor| extractor.kind() == kind)
            .ok_or_else(|| Url2TldrError::Unsupported(format!("{:?}", classification)))?;

        let timeout = self.inner.extraction_timeout;
        let extraction = tokio::time::timeout(timeout, extractor.extract(classification))
            .await
            .map_err(|_| Url2TldrError::timeout("content extraction", timeout.as_secs()))??;

        if extraction.is_partial() {
            warn!("Partial extraction: {} issue(s)", extraction.issues.len());
        }
        Ok(self.inner.synthesizer.synthesize(&extraction))
    }

    // ------------------------------------------------------------------
    // Runtime track
    // ------------------------------------------------------------------

    /// Probe the runtime and, if it answers, list its models.
    #[instrument(skip(self))]
    pub fn probe_runtime(&self) -> Result<Seq> {
        let seq = self.update(|session| session.begin_probe())?;

        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.probe_and_list().await;
            this.update(|session| session.apply(SessionEvent::ProbeFinished { seq, outcome }));
        });

        Ok(seq)
    }

    async fn probe_and_list(&self) -> ProbeOutcome {
        let settings = &self.inner.runtime_settings;
        let runtime = &self.inner.runtime;

        let availability = bounded("runtime probe", settings.probe_timeout(), runtime.probe()).await;
        match availability {
            Ok(Availability::Reachable { version }) => {
                debug!(
                    runtime = runtime.name(),
                    version = version.as_deref().unwrap_or("unknown"),
                    "Runtime reachable"
                );
            }
            Ok(Availability::Unreachable { reason }) => {
                info!(runtime = runtime.name(), "Runtime unreachable: {}", reason);
                return ProbeOutcome::Unreachable(reason);
            }
            Err(e) => return ProbeOutcome::Failed(Notice::from(&e)),
        }

        match bounded("listing models", settings.list_timeout(), runtime.list_models()).await {
            Ok(models) => {
                info!("{} model(s) installed", models.len());
                ProbeOutcome::Listed(models)
            }
            Err(e) => {
                warn!("Listing models failed: {}", e);
                ProbeOutcome::Failed(Notice::from(&e))
            }
        }
    }

    /// Run the current prompt on `model`.
    pub fn run_model(&self, model: &str) -> Result<Seq> {
        let (prompt_seq, text) = {
            let session = self.lock();
            let (seq, prompt) = session.current_prompt().ok_or_else(|| {
                Url2TldrError::InvalidTransition("no prompt is ready to run".to_string())
            })?;
            (seq, prompt.text.clone())
        };
        self.start_run(model, text, Some(prompt_seq))
    }

    /// Run caller-supplied prompt text (e.g. an edited prompt) on `model`.
    pub fn run_with_prompt(&self, model: &str, text: &str) -> Result<Seq> {
        if text.trim().is_empty() {
            return Err(Url2TldrError::InvalidInput("the prompt is empty".to_string()));
        }
        let prompt_seq = self.lock().current_prompt().map(|(seq, _)| seq);
        self.start_run(model, text.to_string(), prompt_seq)
    }

    /// Retry the last failed run.
    pub fn retry_run(&self) -> Result<Seq> {
        let (seq, request) = self.update(|session| session.retry_run())?;
        self.dispatch_run(seq, request);
        Ok(seq)
    }

    fn start_run(&self, model: &str, text: String, prompt_seq: Option<Seq>) -> Result<Seq> {
        let prompt_text = match self.inner.runtime_settings.max_prompt_chars {
            Some(max) => truncate_chars(&text, max),
            None => text,
        };
        let request = RunRequest {
            model: model.to_string(),
            prompt_text,
            prompt_seq,
        };

        let (seq, request) = self.update(|session| session.begin_run(request))?;
        self.dispatch_run(seq, request);
        Ok(seq)
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    fn dispatch_run(&self, seq: Seq, request: RunRequest) {
        let this = self.clone();
        tokio::spawn(async move {
            let timeout = this.inner.runtime_settings.run_timeout();
            let outcome = bounded(
                "model run",
                timeout,
                this.inner.runtime.run(&request.model, &request.prompt_text),
            )
            .await
            .map_err(|e| {
                warn!(seq, "Model run failed: {}", e);
                Notice::from(&e)
            });
            this.update(|session| session.apply(SessionEvent::RunFinished { seq, outcome }));
        });
    }

    // ------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the session and publish the resulting snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.lock();
        let result = f(&mut session);
        self.inner.updates.send_replace(session.snapshot());
        result
    }
}

async fn bounded<T>(
    operation: &str,
    limit: Duration,
    call: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Url2TldrError::timeout(operation, limit.as_secs()))?
}

/// Keep at most `max` characters, cutting on a character boundary.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}
