//! Content sources for url2tldr.
//!
//! A pasted URL is classified into a [`Classification`], then handed to the
//! [`Extractor`] for its kind, which produces an [`Extraction`]: metadata plus an
//! ordered body (caption segments or a flattened comment tree).

mod classifier;
mod models;
mod reddit;
mod youtube;

pub use classifier::{classify, youtube_watch_url, Classification, UrlClassifier, REDDIT_CANONICAL_HOST};
pub use models::{
    transcript_text, Comment, ContentMetadata, ExtractedBody, Extraction, ExtractionIssue,
    SourceKind, ThreadMetadata, TranscriptSegment, VideoMetadata, DELETED_PLACEHOLDER,
};
pub use reddit::{flatten_comments, parse_thread, RedditExtractor};
pub use youtube::{parse_caption_xml, parse_ytdlp_metadata, CaptionTrack, YoutubeExtractor};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for content extractors.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// The kind of source this extractor handles.
    fn kind(&self) -> SourceKind;

    /// Fetch metadata and body for a classified URL of this extractor's kind.
    async fn extract(&self, target: &Classification) -> Result<Extraction>;
}
