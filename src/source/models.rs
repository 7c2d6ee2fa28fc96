//! Data models for extracted content.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of content a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    YouTube,
    Reddit,
    Unsupported,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::YouTube => write!(f, "youtube"),
            SourceKind::Reddit => write!(f, "reddit"),
            SourceKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Video details. Every field is optional: the lookup is best-effort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub channel: Option<String>,
    pub upload_date: Option<NaiveDate>,
    pub duration_seconds: Option<u64>,
    pub view_count: Option<u64>,
}

impl VideoMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.channel.is_none()
            && self.upload_date.is_none()
            && self.duration_seconds.is_none()
            && self.view_count.is_none()
    }
}

/// Details of the post that opens a thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    pub title: Option<String>,
    pub subreddit: Option<String>,
    pub author: Option<String>,
    pub score: Option<i64>,
    pub num_comments: Option<u64>,
    pub permalink: Option<String>,
    /// Body of a text post.
    pub selftext: Option<String>,
}

impl ThreadMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.subreddit.is_none()
            && self.author.is_none()
            && self.score.is_none()
            && self.num_comments.is_none()
            && self.permalink.is_none()
            && self.selftext.is_none()
    }
}

/// Kind-specific metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentMetadata {
    YouTube(VideoMetadata),
    Reddit(ThreadMetadata),
}

impl ContentMetadata {
    pub fn kind(&self) -> SourceKind {
        match self {
            ContentMetadata::YouTube(_) => SourceKind::YouTube,
            ContentMetadata::Reddit(_) => SourceKind::Reddit,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ContentMetadata::YouTube(m) => m.is_empty(),
            ContentMetadata::Reddit(m) => m.is_empty(),
        }
    }
}

// ============================================================================
// Body
// ============================================================================

/// A timestamped caption fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_seconds: f64,
    pub duration_seconds: Option<f64>,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start_seconds: f64) -> Self {
        Self {
            text: text.into(),
            start_seconds,
            duration_seconds: None,
        }
    }
}

/// One comment of a flattened thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Reddit fullname-less id (e.g. `k2x9f1`), if known.
    pub id: Option<String>,
    /// Fullname of the parent (`t1_…` for a comment, `t3_…` for the post).
    pub parent_id: Option<String>,
    pub author: String,
    pub body: String,
    /// 0 for top-level comments.
    pub depth: usize,
    pub score: Option<i64>,
}

/// Placeholder used for deleted, removed or collapsed comment fields.
pub const DELETED_PLACEHOLDER: &str = "[deleted]";

/// Ordered body content of an extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum ExtractedBody {
    Transcript(Vec<TranscriptSegment>),
    Comments(Vec<Comment>),
}

impl ExtractedBody {
    pub fn len(&self) -> usize {
        match self {
            ExtractedBody::Transcript(s) => s.len(),
            ExtractedBody::Comments(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Join caption segments with single spaces, in order, without any rewriting.
pub fn transcript_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Extraction result
// ============================================================================

/// Something that could not be retrieved while the extraction still succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionIssue {
    /// What is missing ("video metadata", "post details").
    pub what: String,
    pub reason: String,
}

impl ExtractionIssue {
    pub fn new(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ExtractionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.what, self.reason)
    }
}

/// Everything an extractor produced for one source URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Canonical URL of the source.
    pub source_url: String,
    pub metadata: ContentMetadata,
    pub body: ExtractedBody,
    pub issues: Vec<ExtractionIssue>,
}

impl Extraction {
    pub fn kind(&self) -> SourceKind {
        self.metadata.kind()
    }

    pub fn is_partial(&self) -> bool {
        !self.issues.is_empty()
    }
}
