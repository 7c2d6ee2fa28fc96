//! URL classification.

use super::SourceKind;
use regex::Regex;
use serde::Serialize;
use url::Url;

/// Canonical host that normalized thread URLs are expressed against.
pub const REDDIT_CANONICAL_HOST: &str = "https://www.reddit.com";

/// Outcome of classifying a pasted URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Classification {
    YouTube { video_id: String },
    Reddit { thread_url: String },
    Unsupported { input: String },
}

impl Classification {
    pub fn kind(&self) -> SourceKind {
        match self {
            Classification::YouTube { .. } => SourceKind::YouTube,
            Classification::Reddit { .. } => SourceKind::Reddit,
            Classification::Unsupported { .. } => SourceKind::Unsupported,
        }
    }

    /// URL the resulting prompt is attributed to.
    pub fn canonical_url(&self) -> Option<String> {
        match self {
            Classification::YouTube { video_id } => Some(youtube_watch_url(video_id)),
            Classification::Reddit { thread_url } => Some(thread_url.clone()),
            Classification::Unsupported { .. } => None,
        }
    }
}

pub fn youtube_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Recognizes YouTube video and Reddit thread URLs.
pub struct UrlClassifier {
    video_id_regex: Regex,
    reddit_id_regex: Regex,
}

impl UrlClassifier {
    pub fn new() -> Self {
        Self {
            video_id_regex: Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex"),
            reddit_id_regex: Regex::new(r"^[A-Za-z0-9]+$").expect("Invalid regex"),
        }
    }

    /// Classify a (possibly untrimmed, possibly scheme-less) URL.
    pub fn classify(&self, input: &str) -> Classification {
        let trimmed = input.trim();
        let unsupported = || Classification::Unsupported {
            input: trimmed.to_string(),
        };

        let Some(url) = parse_loose(trimmed) else {
            return unsupported();
        };
        let Some(host) = url.host_str().map(|h| h.to_ascii_lowercase()) else {
            return unsupported();
        };

        if let Some(video_id) = self.youtube_video_id(&host, &url) {
            return Classification::YouTube { video_id };
        }
        if let Some(thread_url) = self.reddit_thread_url(&host, &url) {
            return Classification::Reddit { thread_url };
        }
        unsupported()
    }

    fn youtube_video_id(&self, host: &str, url: &Url) -> Option<String> {
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

        let candidate: Option<String> = if host == "youtu.be" {
            segments.first().map(|s| s.to_string())
        } else if is_youtube_host(host) {
            match segments.as_slice() {
                ["watch", ..] => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                ["shorts" | "embed" | "live" | "v", id, ..] => Some(id.to_string()),
                _ => None,
            }
        } else {
            None
        };

        candidate.filter(|id| self.video_id_regex.is_match(id))
    }

    fn reddit_thread_url(&self, host: &str, url: &Url) -> Option<String> {
        let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

        if host == "redd.it" {
            let id = segments.first()?;
            return self
                .reddit_id_regex
                .is_match(id)
                .then(|| format!("{}/comments/{}", REDDIT_CANONICAL_HOST, id));
        }

        if host != "reddit.com" && !host.ends_with(".reddit.com") {
            return None;
        }

        // Everything up to the thread id, plus the slug when present. A trailing
        // comment id (comment permalink) is dropped so the whole thread is fetched.
        let pos = segments.iter().position(|s| *s == "comments")?;
        let id = segments.get(pos + 1)?;
        if !self.reddit_id_regex.is_match(id) {
            return None;
        }
        let keep = (pos + 3).min(segments.len());
        Some(format!("{}/{}", REDDIT_CANONICAL_HOST, segments[..keep].join("/")))
    }
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify with a fresh classifier.
pub fn classify(input: &str) -> Classification {
    UrlClassifier::new().classify(input)
}

fn parse_loose(input: &str) -> Option<Url> {
    if input.is_empty() || input.chars().any(char::is_whitespace) {
        return None;
    }
    let url = if input.contains("://") {
        Url::parse(input).ok()?
    } else {
        Url::parse(&format!("https://{}", input)).ok()?
    };
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn is_youtube_host(host: &str) -> bool {
    matches!(
        host,
        "youtube.com" | "www.youtube.com" | "m.youtube.com" | "music.youtube.com"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_id(input: &str) -> Option<String> {
        match classify(input) {
            Classification::YouTube { video_id } => Some(video_id),
            _ => None,
        }
    }

    fn thread(input: &str) -> Option<String> {
        match classify(input) {
            Classification::Reddit { thread_url } => Some(thread_url),
            _ => None,
        }
    }

    #[test]
    fn test_short_link_with_timestamp() {
        assert_eq!(video_id("https://youtu.be/abc123?t=42"), Some("abc123".to_string()));
    }

    #[test]
    fn test_query_variations_keep_the_same_id() {
        let bare = video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(bare, Some("dQw4w9WgXcQ".to_string()));

        let variants = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG&index=3",
            "https://www.youtube.com/watch?list=PLx0sYbCqOb8&v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&feature=share",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "  https://youtu.be/dQw4w9WgXcQ?si=AbCdEf&t=10  ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ?feature=share",
            "https://www.youtube.com/embed/dQw4w9WgXcQ?start=30",
            "https://www.youtube.com/live/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ#comments",
        ];
        for variant in variants {
            assert_eq!(video_id(variant), bare, "variant: {}", variant);
        }
    }

    #[test]
    fn test_youtube_without_video_is_unsupported() {
        for input in [
            "https://www.youtube.com/",
            "https://www.youtube.com/@somechannel",
            "https://www.youtube.com/playlist?list=PLtest",
            "https://www.youtube.com/watch?list=PLtest",
            "https://youtu.be/",
            "https://www.youtube.com/watch?v=bad%20id",
        ] {
            assert_eq!(classify(input).kind(), SourceKind::Unsupported, "input: {}", input);
        }
    }

    #[test]
    fn test_reddit_threads_are_normalized() {
        let expected = "https://www.reddit.com/r/rust/comments/1abc2d/some_title";
        for input in [
            "https://www.reddit.com/r/rust/comments/1abc2d/some_title/",
            "https://old.reddit.com/r/rust/comments/1abc2d/some_title/?sort=top",
            "https://m.reddit.com/r/rust/comments/1abc2d/some_title",
            "reddit.com/r/rust/comments/1abc2d/some_title/#thing",
            "https://www.reddit.com/r/rust/comments/1abc2d/some_title/k9zz1x/",
        ] {
            assert_eq!(thread(input).as_deref(), Some(expected), "input: {}", input);
        }

        assert_eq!(
            thread("https://www.reddit.com/r/rust/comments/1abc2d").as_deref(),
            Some("https://www.reddit.com/r/rust/comments/1abc2d")
        );
        assert_eq!(
            thread("https://redd.it/1abc2d").as_deref(),
            Some("https://www.reddit.com/comments/1abc2d")
        );
    }

    #[test]
    fn test_reddit_without_thread_is_unsupported() {
        for input in [
            "https://www.reddit.com/r/rust/",
            "https://www.reddit.com/",
            "https://www.reddit.com/user/someone",
            "https://notreddit.com/r/rust/comments/1abc2d/x",
        ] {
            assert_eq!(classify(input).kind(), SourceKind::Unsupported, "input: {}", input);
        }
    }

    #[test]
    fn test_other_inputs_are_unsupported() {
        for input in [
            "",
            "   ",
            "hello world",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://vimeo.com/123456",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://notyoutube.com/watch?v=dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
        ] {
            let result = classify(input);
            assert_eq!(result.kind(), SourceKind::Unsupported, "input: {:?}", input);
            assert_eq!(result.canonical_url(), None);
        }
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(
            classify("https://youtu.be/abc123?t=42").canonical_url().as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
    }
}
