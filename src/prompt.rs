//! Prompt synthesis.
//!
//! Turns an [`Extraction`] into the single text blob handed to a model. The
//! output depends only on the extraction and the loaded templates, so the same
//! input always renders byte-identical text. Nothing is truncated here.

use crate::config::{Prompts, SourcePrompts};
use crate::source::{
    transcript_text, Comment, ContentMetadata, ExtractedBody, Extraction, ExtractionIssue,
    SourceKind, ThreadMetadata, VideoMetadata,
};
use serde::Serialize;
use std::collections::HashMap;

/// A synthesized prompt, attributable to the source it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompt {
    pub kind: SourceKind,
    pub source_url: String,
    pub text: String,
    /// Parts of the extraction that could not be retrieved.
    pub issues: Vec<ExtractionIssue>,
}

impl Prompt {
    pub fn is_partial(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Builds prompts from extractions using the configured templates.
#[derive(Debug, Clone, Default)]
pub struct PromptSynthesizer {
    prompts: Prompts,
}

impl PromptSynthesizer {
    pub fn new(prompts: Prompts) -> Self {
        Self { prompts }
    }

    pub fn synthesize(&self, extraction: &Extraction) -> Prompt {
        let templates = match extraction.kind() {
            SourceKind::Reddit => &self.prompts.reddit,
            _ => &self.prompts.youtube,
        };

        let mut vars = HashMap::new();
        vars.insert("source_url".to_string(), extraction.source_url.clone());

        let mut text = self.prompts.render_with_custom(&templates.instructions, &vars);

        if extraction.is_partial() {
            let issues = extraction
                .issues
                .iter()
                .map(ExtractionIssue::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            vars.insert("issues".to_string(), issues);
            text.push('\n');
            text.push_str(&self.prompts.render_with_custom(&templates.partial_notice, &vars));
        }
        text.push_str("\n\n");

        let (mut lines, permalink) = match &extraction.metadata {
            ContentMetadata::YouTube(meta) => (video_lines(meta), None),
            ContentMetadata::Reddit(meta) => (thread_lines(meta), meta.permalink.as_deref()),
        };
        if !lines.is_empty() {
            lines.push(format!("- URL: {}", permalink.unwrap_or(&extraction.source_url)));
            text.push_str(&templates.metadata_heading);
            text.push('\n');
            text.push_str(&lines.join("\n"));
            text.push_str("\n\n");
        }

        if let ContentMetadata::Reddit(ThreadMetadata {
            selftext: Some(selftext),
            ..
        }) = &extraction.metadata
        {
            text.push_str("Original post:\n");
            text.push_str(selftext);
            text.push_str("\n\n");
        }

        push_body(&mut text, templates, &extraction.body);

        Prompt {
            kind: extraction.kind(),
            source_url: extraction.source_url.clone(),
            text,
            issues: extraction.issues.clone(),
        }
    }
}

fn push_body(text: &mut String, templates: &SourcePrompts, body: &ExtractedBody) {
    let rendered = match body {
        ExtractedBody::Transcript(segments) => transcript_text(segments),
        ExtractedBody::Comments(comments) => comments
            .iter()
            .map(render_comment)
            .collect::<Vec<_>>()
            .join("\n"),
    };

    text.push_str(&templates.body_heading);
    text.push('\n');
    if !rendered.is_empty() {
        text.push('\n');
        text.push_str(&rendered);
    }
}

fn video_lines(meta: &VideoMetadata) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(title) = &meta.title {
        lines.push(format!("- Title: {}", title));
    }
    if let Some(channel) = &meta.channel {
        lines.push(format!("- Channel: {}", channel));
    }
    if let Some(date) = meta.upload_date {
        lines.push(format!("- Upload date: {}", date.format("%Y-%m-%d")));
    }
    if let Some(seconds) = meta.duration_seconds {
        lines.push(format!("- Length: {}", format_duration(seconds)));
    }
    if let Some(views) = meta.view_count {
        lines.push(format!("- Views: {}", views));
    }
    lines
}

fn thread_lines(meta: &ThreadMetadata) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(subreddit) = &meta.subreddit {
        lines.push(format!("- Subreddit: r/{}", subreddit));
    }
    if let Some(title) = &meta.title {
        lines.push(format!("- Title: {}", title));
    }
    if let Some(author) = &meta.author {
        lines.push(format!("- Author: u/{}", author));
    }
    if let Some(score) = meta.score {
        lines.push(format!("- Post score: {}", score));
    }
    if let Some(count) = meta.num_comments {
        lines.push(format!("- Comments: {}", count));
    }
    lines
}

/// `- author (n points): body`, indented two spaces per level.
fn render_comment(comment: &Comment) -> String {
    let indent = "  ".repeat(comment.depth);
    let header = match comment.score {
        Some(1) => format!("{}- {} (1 point)", indent, comment.author),
        Some(score) => format!("{}- {} ({} points)", indent, comment.author, score),
        None => format!("{}- {}", indent, comment.author),
    };

    let continuation = format!("\n{}  ", indent);
    let body = comment.body.trim().replace('\n', &continuation);
    format!("{}: {}", header, body)
}

fn format_duration(total: u64) -> String {
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::TranscriptSegment;
    use chrono::NaiveDate;

    fn video_extraction(metadata: VideoMetadata, issues: Vec<ExtractionIssue>) -> Extraction {
        Extraction {
            source_url: "https://www.youtube.com/watch?v=abc123".to_string(),
            metadata: ContentMetadata::YouTube(metadata),
            body: ExtractedBody::Transcript(vec![
                TranscriptSegment::new("hello there", 0.0),
                TranscriptSegment::new("general kenobi", 1.5),
            ]),
            issues,
        }
    }

    fn comment(author: &str, body: &str, depth: usize, score: Option<i64>) -> Comment {
        Comment {
            id: None,
            parent_id: None,
            author: author.to_string(),
            body: body.to_string(),
            depth,
            score,
        }
    }

    #[test]
    fn test_youtube_layout() {
        let meta = VideoMetadata {
            title: Some("Rust in 100 Seconds".to_string()),
            channel: Some("Fireship".to_string()),
            upload_date: NaiveDate::from_ymd_opt(2021, 9, 22),
            duration_seconds: Some(3725),
            view_count: None,
        };
        let prompt = PromptSynthesizer::default().synthesize(&video_extraction(meta, vec![]));
        let instructions = &Prompts::default().youtube.instructions;

        let expected = format!(
            "{}\n\nVideo information:\n- Title: Rust in 100 Seconds\n- Channel: Fireship\n\
             - Upload date: 2021-09-22\n- Length: 1:02:05\n\
             - URL: https://www.youtube.com/watch?v=abc123\n\nTranscript:\n\nhello there general kenobi",
            instructions
        );
        assert_eq!(prompt.text, expected);
        assert_eq!(prompt.kind, SourceKind::YouTube);
        assert_eq!(prompt.source_url, "https://www.youtube.com/watch?v=abc123");
        assert!(!prompt.is_partial());
    }

    #[test]
    fn test_deterministic() {
        let synthesizer = PromptSynthesizer::default();
        let extraction = video_extraction(
            VideoMetadata {
                title: Some("t".to_string()),
                ..Default::default()
            },
            vec![],
        );
        assert_eq!(synthesizer.synthesize(&extraction), synthesizer.synthesize(&extraction));
    }

    #[test]
    fn test_no_metadata_heading_when_all_absent() {
        let prompt = PromptSynthesizer::default().synthesize(&video_extraction(VideoMetadata::default(), vec![]));
        assert!(!prompt.text.contains("Video information:"));
        assert!(!prompt.text.contains("- Title"));
        assert!(prompt.text.ends_with("\n\nTranscript:\n\nhello there general kenobi"));
    }

    #[test]
    fn test_partial_extraction_is_flagged() {
        let issues = vec![ExtractionIssue::new("video metadata", "yt-dlp is not installed")];
        let prompt = PromptSynthesizer::default().synthesize(&video_extraction(VideoMetadata::default(), issues));

        assert!(prompt.is_partial());
        assert!(prompt
            .text
            .contains("\nNote: some details could not be retrieved (video metadata: yt-dlp is not installed).\n\n"));
    }

    #[test]
    fn test_locked_thread_without_comments() {
        let extraction = Extraction {
            source_url: "https://www.reddit.com/r/rust/comments/1abc2d/locked".to_string(),
            metadata: ContentMetadata::Reddit(ThreadMetadata {
                title: Some("Locked thread".to_string()),
                subreddit: Some("rust".to_string()),
                author: Some("mod".to_string()),
                score: Some(5),
                ..Default::default()
            }),
            body: ExtractedBody::Comments(vec![]),
            issues: vec![],
        };
        let prompt = PromptSynthesizer::default().synthesize(&extraction);
        let instructions = &Prompts::default().reddit.instructions;

        let expected = format!(
            "{}\n\nThread information:\n- Subreddit: r/rust\n- Title: Locked thread\n- Author: u/mod\n\
             - Post score: 5\n- URL: https://www.reddit.com/r/rust/comments/1abc2d/locked\n\nReddit comments:\n",
            instructions
        );
        assert_eq!(prompt.text, expected);
        assert_eq!(prompt.kind, SourceKind::Reddit);
    }

    #[test]
    fn test_url_line_prefers_permalink() {
        let mut extraction = Extraction {
            source_url: "https://www.reddit.com/comments/1abc2d".to_string(),
            metadata: ContentMetadata::Reddit(ThreadMetadata {
                title: Some("Moved".to_string()),
                permalink: Some("https://www.reddit.com/r/rust/comments/1abc2d/moved/".to_string()),
                ..Default::default()
            }),
            body: ExtractedBody::Comments(vec![]),
            issues: vec![],
        };
        let synthesizer = PromptSynthesizer::default();
        assert!(synthesizer
            .synthesize(&extraction)
            .text
            .contains("- Title: Moved\n- URL: https://www.reddit.com/r/rust/comments/1abc2d/moved/\n\n"));

        extraction.metadata = ContentMetadata::Reddit(ThreadMetadata::default());
        assert!(!synthesizer.synthesize(&extraction).text.contains("- URL:"));
    }

    #[test]
    fn test_comment_rendering() {
        let extraction = Extraction {
            source_url: "https://www.reddit.com/comments/1abc2d".to_string(),
            metadata: ContentMetadata::Reddit(ThreadMetadata {
                selftext: Some("What do you think?".to_string()),
                ..Default::default()
            }),
            body: ExtractedBody::Comments(vec![
                comment("alice", "First line\nsecond line", 0, Some(10)),
                comment("bob", "A reply", 1, Some(1)),
                comment("[deleted]", "[deleted]", 2, None),
            ]),
            issues: vec![],
        };
        let prompt = PromptSynthesizer::default().synthesize(&extraction);

        assert!(!prompt.text.contains("Thread information:"));
        assert!(prompt.text.contains("\n\nOriginal post:\nWhat do you think?\n\nReddit comments:\n\n"));
        assert!(prompt.text.ends_with(
            "- alice (10 points): First line\n  second line\n  - bob (1 point): A reply\n    - [deleted]: [deleted]"
        ));
    }

    #[test]
    fn test_custom_instructions_with_variables() {
        let mut prompts = Prompts::default();
        prompts.youtube.instructions = "Summarize {{source_url}} in {{language}}.".to_string();
        prompts.variables.insert("language".to_string(), "French".to_string());

        let prompt = PromptSynthesizer::new(prompts).synthesize(&video_extraction(VideoMetadata::default(), vec![]));
        assert!(prompt
            .text
            .starts_with("Summarize https://www.youtube.com/watch?v=abc123 in French.\n\n"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(725), "12:05");
        assert_eq!(format_duration(3600), "1:00:00");
    }
}
