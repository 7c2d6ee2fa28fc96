//! Reddit thread extractor using the public `.json` thread endpoint.

use super::{
    Classification, Comment, ContentMetadata, ExtractedBody, Extraction, ExtractionIssue,
    Extractor, SourceKind, ThreadMetadata, DELETED_PLACEHOLDER, REDDIT_CANONICAL_HOST,
};
use crate::config::{CommentFilterSettings, RedditSettings};
use crate::error::{transport_error, ExtractionFailure, Result, Url2TldrError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

static EMOTE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[img\]\(emote\|[^)]*\)").expect("Invalid regex"));

/// Reddit content extractor.
pub struct RedditExtractor {
    client: reqwest::Client,
    settings: RedditSettings,
}

impl RedditExtractor {
    pub fn new(settings: &RedditSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| Url2TldrError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    /// JSON endpoint for a canonical thread URL, rooted at the configured host.
    pub fn json_url(&self, thread_url: &str) -> String {
        let path = thread_url
            .strip_prefix(REDDIT_CANONICAL_HOST)
            .unwrap_or(thread_url)
            .trim_end_matches('/');
        format!(
            "{}{}.json?raw_json=1",
            self.settings.base_url.trim_end_matches('/'),
            path
        )
    }

    #[instrument(skip(self))]
    async fn fetch_thread(&self, thread_url: &str) -> Result<Value> {
        let seconds = self.settings.request_timeout_secs;
        let url = self.json_url(thread_url);
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("Reddit thread", seconds, e))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => {
                return Err(ExtractionFailure::ThreadNotFound(thread_url.to_string()).into())
            }
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                return Err(ExtractionFailure::Blocked(format!("Reddit returned {}", status)).into())
            }
            s if !s.is_success() => {
                return Err(ExtractionFailure::Transport(format!("Reddit returned {}", s)).into())
            }
            _ => {}
        }

        let text = response
            .text()
            .await
            .map_err(|e| transport_error("Reddit thread", seconds, e))?;

        serde_json::from_str(&text).map_err(|_| {
            ExtractionFailure::InvalidResponse("thread response was not JSON".to_string()).into()
        })
    }
}

#[async_trait]
impl Extractor for RedditExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Reddit
    }

    async fn extract(&self, target: &Classification) -> Result<Extraction> {
        let Classification::Reddit { thread_url } = target else {
            return Err(Url2TldrError::InvalidInput(format!(
                "Reddit extractor cannot handle {:?}",
                target.kind()
            )));
        };

        info!("Extracting Reddit thread {}", thread_url);
        let json = self.fetch_thread(thread_url).await?;
        let extraction = parse_thread(&json, thread_url, &self.settings.filter)?;

        info!(
            "Extracted {} comments{}",
            extraction.body.len(),
            if extraction.is_partial() { " (partial)" } else { "" }
        );
        Ok(extraction)
    }
}

/// Build an extraction from a thread response (`[post listing, comment listing]`).
pub fn parse_thread(json: &Value, thread_url: &str, filter: &CommentFilterSettings) -> Result<Extraction> {
    if let Some(code) = json.get("error") {
        if code.as_i64() == Some(404) {
            return Err(ExtractionFailure::ThreadNotFound(thread_url.to_string()).into());
        }
        return Err(ExtractionFailure::InvalidResponse(format!("Reddit reported error {}", code)).into());
    }

    let Some(listings) = json.as_array() else {
        return Err(ExtractionFailure::InvalidResponse(
            "expected a post listing and a comment listing".to_string(),
        )
        .into());
    };

    let mut issues = Vec::new();
    let metadata = match listings.first().map(|l| &l["data"]["children"][0]["data"]) {
        Some(post) if post.is_object() => {
            if is_deleted_post(post) {
                return Err(ExtractionFailure::ThreadNotFound(thread_url.to_string()).into());
            }
            parse_post(post)
        }
        _ => {
            issues.push(ExtractionIssue::new("post details", "missing from the thread response"));
            ThreadMetadata::default()
        }
    };

    let children = listings
        .get(1)
        .and_then(|l| l["data"]["children"].as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut comments = flatten_comments(children);
    if filter.is_enabled() {
        let before = comments.len();
        comments = filter_comments(comments, filter);
        debug!("Comment filter kept {} of {}", comments.len(), before);
    }

    Ok(Extraction {
        source_url: thread_url.to_string(),
        metadata: ContentMetadata::Reddit(metadata),
        body: ExtractedBody::Comments(comments),
        issues,
    })
}

/// Deleted and removed posts still answer 200, with their content blanked.
fn is_deleted_post(post: &Value) -> bool {
    if !post["removed_by_category"].is_null() {
        return true;
    }
    post["author"].as_str() == Some("[deleted]")
        && matches!(post["selftext"].as_str(), Some("[deleted]" | "[removed]"))
}

fn parse_post(post: &Value) -> ThreadMetadata {
    let text = |key: &str| {
        post[key]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    ThreadMetadata {
        title: text("title"),
        subreddit: text("subreddit"),
        author: text("author"),
        score: post["score"].as_i64(),
        num_comments: post["num_comments"].as_u64(),
        permalink: text("permalink").map(|p| {
            if p.starts_with('/') {
                format!("{}{}", REDDIT_CANONICAL_HOST, p)
            } else {
                p
            }
        }),
        selftext: text("selftext"),
    }
}

/// Flatten a comment listing depth-first, parents before their replies.
///
/// Only `t1` entries are comments; "load more" stubs are skipped.
pub fn flatten_comments(children: &[Value]) -> Vec<Comment> {
    let mut comments = Vec::new();
    collect_comments(children, 0, &mut comments);
    comments
}

fn collect_comments(children: &[Value], depth: usize, out: &mut Vec<Comment>) {
    for child in children {
        if child["kind"].as_str() != Some("t1") {
            continue;
        }
        let data = &child["data"];

        out.push(Comment {
            id: data["id"].as_str().map(str::to_string),
            parent_id: data["parent_id"].as_str().map(str::to_string),
            author: field_or_placeholder(data, "author"),
            body: field_or_placeholder(data, "body"),
            depth,
            score: data["score"].as_i64(),
        });

        // `replies` is an empty string when there are none.
        if let Some(replies) = data["replies"]["data"]["children"].as_array() {
            collect_comments(replies, depth + 1, out);
        }
    }
}

fn field_or_placeholder(data: &Value, key: &str) -> String {
    match data[key].as_str().map(str::trim) {
        Some(value) if !value.is_empty() && value != "[deleted]" && value != "[removed]" => {
            value.to_string()
        }
        _ => DELETED_PLACEHOLDER.to_string(),
    }
}

/// Drop comments that fail the filter. Replies of a dropped comment go with it.
fn filter_comments(comments: Vec<Comment>, filter: &CommentFilterSettings) -> Vec<Comment> {
    let mut dropped_depth: Option<usize> = None;

    comments
        .into_iter()
        .filter(|comment| {
            if let Some(depth) = dropped_depth {
                if comment.depth > depth {
                    return false;
                }
                dropped_depth = None;
            }

            let keep = !(filter.top_level_only && comment.depth > 0)
                && !matches!((filter.min_score, comment.score), (Some(min), Some(score)) if score < min)
                && !matches!(filter.min_body_chars, Some(min) if comment.body.chars().count() < min)
                && !(filter.skip_emotes && EMOTE_REGEX.replace_all(&comment.body, "").trim().is_empty());

            if !keep {
                dropped_depth = Some(comment.depth);
            }
            keep
        })
        .collect()
}
