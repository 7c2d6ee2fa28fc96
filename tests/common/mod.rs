//! Fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url2tldr::config::{Prompts, Settings};
use url2tldr::error::{ExtractionFailure, Result, Url2TldrError};
use url2tldr::orchestrator::{Components, Orchestrator};
use url2tldr::runtime::{Availability, ModelRuntime};
use url2tldr::source::{
    youtube_watch_url, Classification, ContentMetadata, ExtractedBody, Extraction, Extractor,
    SourceKind, TranscriptSegment, VideoMetadata,
};

/// How the fake YouTube extractor answers for one video id.
#[derive(Clone)]
pub enum VideoBehavior {
    Transcript(Vec<&'static str>),
    NoCaptions,
    /// Wait for the gate before answering with the transcript.
    Gated(Arc<Notify>, Vec<&'static str>),
    Hang,
}

#[derive(Default)]
pub struct FakeYoutube {
    videos: Mutex<HashMap<String, VideoBehavior>>,
    pub calls: AtomicUsize,
}

impl FakeYoutube {
    pub fn with(self, video_id: &str, behavior: VideoBehavior) -> Self {
        self.videos.lock().unwrap().insert(video_id.to_string(), behavior);
        self
    }
}

#[async_trait]
impl Extractor for FakeYoutube {
    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    async fn extract(&self, target: &Classification) -> Result<Extraction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Classification::YouTube { video_id } = target else {
            return Err(Url2TldrError::InvalidInput("not a video".to_string()));
        };
        let behavior = self.videos.lock().unwrap().get(video_id).cloned();

        let lines = match behavior {
            Some(VideoBehavior::Transcript(lines)) => lines,
            Some(VideoBehavior::Gated(gate, lines)) => {
                gate.notified().await;
                lines
            }
            Some(VideoBehavior::Hang) => std::future::pending().await,
            Some(VideoBehavior::NoCaptions) | None => {
                return Err(ExtractionFailure::CaptionsUnavailable(video_id.clone()).into())
            }
        };

        Ok(Extraction {
            source_url: youtube_watch_url(video_id),
            metadata: ContentMetadata::YouTube(VideoMetadata {
                title: Some(format!("Video {}", video_id)),
                ..Default::default()
            }),
            body: ExtractedBody::Transcript(
                lines
                    .iter()
                    .enumerate()
                    .map(|(i, text)| TranscriptSegment::new(*text, i as f64))
                    .collect(),
            ),
            issues: vec![],
        })
    }
}

/// Extractor that must never be reached.
pub struct UnusedExtractor(pub SourceKind);

#[async_trait]
impl Extractor for UnusedExtractor {
    fn kind(&self) -> SourceKind {
        self.0
    }

    async fn extract(&self, _target: &Classification) -> Result<Extraction> {
        panic!("extractor for {} should not be called", self.0);
    }
}

pub struct FakeRuntime {
    pub reachable: bool,
    pub models: Vec<String>,
    pub list_calls: AtomicUsize,
    pub run_calls: AtomicUsize,
    /// Number of upcoming runs that fail.
    pub failing_runs: AtomicUsize,
    /// When set, each run waits for a notification before answering.
    pub run_gate: Option<Arc<Notify>>,
}

impl FakeRuntime {
    pub fn reachable(models: &[&str]) -> Self {
        Self {
            reachable: true,
            models: models.iter().map(|m| m.to_string()).collect(),
            list_calls: AtomicUsize::new(0),
            run_calls: AtomicUsize::new(0),
            failing_runs: AtomicUsize::new(0),
            run_gate: None,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::reachable(&[])
        }
    }
}

#[async_trait]
impl ModelRuntime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    async fn probe(&self) -> Result<Availability> {
        if self.reachable {
            Ok(Availability::Reachable { version: Some("0.0.0".to_string()) })
        } else {
            Ok(Availability::Unreachable { reason: "connection refused".to_string() })
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.models.clone())
    }

    async fn run(&self, model: &str, prompt: &str) -> Result<String> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.run_gate {
            gate.notified().await;
        }
        let failing = self.failing_runs.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_runs.store(failing - 1, Ordering::SeqCst);
            return Err(Url2TldrError::RunFailed("model crashed".to_string()));
        }
        Ok(format!("\n{} summarized {} chars\n", model, prompt.chars().count()))
    }
}

pub fn orchestrator(
    settings: &Settings,
    youtube: Arc<dyn Extractor>,
    reddit: Arc<dyn Extractor>,
    runtime: Arc<dyn ModelRuntime>,
) -> Orchestrator {
    Orchestrator::with_components(
        settings,
        Components {
            youtube,
            reddit,
            runtime,
            prompts: Prompts::default(),
        },
    )
}
