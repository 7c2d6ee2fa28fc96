//! Error types for url2tldr.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an extraction could not produce any usable content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// Captions are disabled or absent for the video.
    #[error("captions are disabled or unavailable for video {0}")]
    CaptionsUnavailable(String),

    /// The video is invalid, private, removed or otherwise unplayable.
    #[error("video {video_id} is unavailable: {reason}")]
    VideoUnavailable { video_id: String, reason: String },

    /// The thread does not exist or was deleted.
    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    /// The remote service refused the request (rate limit, bot check).
    #[error("request blocked by remote service: {0}")]
    Blocked(String),

    /// The remote service could not be reached.
    #[error("network error: {0}")]
    Transport(String),

    /// The remote service answered with something we cannot interpret.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl ExtractionFailure {
    /// Whether a later attempt with the same input could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractionFailure::Transport(_) | ExtractionFailure::Blocked(_))
    }
}

/// Library-level error type for url2tldr operations.
#[derive(Error, Debug)]
pub enum Url2TldrError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported URL: {0}")]
    Unsupported(String),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionFailure),

    #[error("Model runtime unreachable: {0}")]
    RuntimeUnreachable(String),

    #[error("Model not installed: {0}")]
    ModelNotFound(String),

    #[error("Model run failed: {0}")]
    RunFailed(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Url2TldrError {
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Url2TldrError::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Classify this error into the user-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Url2TldrError::Unsupported(_) => ErrorKind::ClassificationUnsupported,
            Url2TldrError::Extraction(failure) => match failure {
                ExtractionFailure::CaptionsUnavailable(_) => ErrorKind::CaptionsUnavailable,
                ExtractionFailure::VideoUnavailable { .. } => ErrorKind::VideoUnavailable,
                ExtractionFailure::ThreadNotFound(_) => ErrorKind::ThreadNotFound,
                ExtractionFailure::Blocked(_) => ErrorKind::SourceBlocked,
                ExtractionFailure::Transport(_) => ErrorKind::SourceUnreachable,
                ExtractionFailure::InvalidResponse(_) => ErrorKind::InvalidSourceResponse,
            },
            Url2TldrError::RuntimeUnreachable(_) => ErrorKind::RuntimeUnreachable,
            Url2TldrError::ModelNotFound(_) => ErrorKind::ModelNotFound,
            Url2TldrError::RunFailed(_) => ErrorKind::RunFailed,
            Url2TldrError::Timeout { .. } => ErrorKind::Timeout,
            Url2TldrError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Url2TldrError::ToolNotFound(_) => ErrorKind::ToolNotFound,
            Url2TldrError::Config(_)
            | Url2TldrError::InvalidInput(_)
            | Url2TldrError::Io(_)
            | Url2TldrError::Json(_)
            | Url2TldrError::TomlParse(_) => ErrorKind::Internal,
        }
    }
}

/// Every outcome the presentation layer must be able to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ClassificationUnsupported,
    ExtractionPartial,
    CaptionsUnavailable,
    VideoUnavailable,
    ThreadNotFound,
    SourceBlocked,
    SourceUnreachable,
    InvalidSourceResponse,
    RuntimeUnreachable,
    ModelNotFound,
    RunFailed,
    Timeout,
    InvalidTransition,
    ToolNotFound,
    Internal,
}

impl ErrorKind {
    /// A specific, human-readable message for this kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::ClassificationUnsupported => {
                "Only YouTube video and Reddit thread URLs are supported."
            }
            ErrorKind::ExtractionPartial => {
                "Some details could not be retrieved; the prompt was built from what was available."
            }
            ErrorKind::CaptionsUnavailable => "This video has no captions or transcript available.",
            ErrorKind::VideoUnavailable => "This video is private, removed, or does not exist.",
            ErrorKind::ThreadNotFound => "This Reddit thread does not exist or was deleted.",
            ErrorKind::SourceBlocked => {
                "The site refused the request (rate limited or bot check). Try again later."
            }
            ErrorKind::SourceUnreachable => "Could not reach the site. Check your network connection.",
            ErrorKind::InvalidSourceResponse => "The site returned a response that could not be read.",
            ErrorKind::RuntimeUnreachable => {
                "The local model runtime is not running. Start it (e.g. `ollama serve`) and try again."
            }
            ErrorKind::ModelNotFound => "That model is not installed in the local runtime.",
            ErrorKind::RunFailed => "The model runtime reported an error while generating.",
            ErrorKind::Timeout => "The request took too long and was abandoned.",
            ErrorKind::InvalidTransition => "That action is not available right now.",
            ErrorKind::ToolNotFound => "A required external tool is not installed.",
            ErrorKind::Internal => "An internal error occurred.",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        write!(f, "{}", name)
    }
}

/// Map a reqwest failure for an outbound extraction call.
pub(crate) fn transport_error(operation: &str, seconds: u64, err: reqwest::Error) -> Url2TldrError {
    if err.is_timeout() {
        Url2TldrError::timeout(operation, seconds)
    } else {
        Url2TldrError::Extraction(ExtractionFailure::Transport(format!("{}: {}", operation, err)))
    }
}

/// Result type alias for url2tldr operations.
pub type Result<T> = std::result::Result<T, Url2TldrError>;
