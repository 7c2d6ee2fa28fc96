//! YouTube extractor.
//!
//! Metadata comes from yt-dlp and is best-effort. Captions come from the
//! player API: the watch page yields an API key, the player response lists the
//! caption tracks, and the chosen track's timedtext document holds the segments.

use super::{
    youtube_watch_url, Classification, ContentMetadata, ExtractedBody, Extraction,
    ExtractionIssue, Extractor, SourceKind, TranscriptSegment, VideoMetadata,
};
use crate::config::YoutubeSettings;
use crate::error::{transport_error, ExtractionFailure, Result, Url2TldrError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

static TEXT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)").expect("Invalid regex"));
static START_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bstart="([^"]*)""#).expect("Invalid regex"));
static DUR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"\bdur="([^"]*)""#).expect("Invalid regex"));
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));
static ENTITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9A-Fa-f]+|#[0-9]+|[A-Za-z]+);").expect("Invalid regex"));

/// A caption track listed by the player API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<PlayerCaptions>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerCaptions {
    player_captions_tracklist_renderer: Option<CaptionTracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTracklist {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

impl PlayerResponse {
    fn into_tracks(self) -> Vec<CaptionTrack> {
        self.captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .map(|r| r.caption_tracks)
            .unwrap_or_default()
    }
}

/// YouTube content extractor.
pub struct YoutubeExtractor {
    client: reqwest::Client,
    settings: YoutubeSettings,
    api_key_regex: Regex,
}

impl YoutubeExtractor {
    pub fn new(settings: &YoutubeSettings) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, header::HeaderValue::from_static("en-US"));
        // Skips the EU consent interstitial on the watch page.
        headers.insert(header::COOKIE, header::HeaderValue::from_static("CONSENT=YES+cb; SOCS=CAI"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Url2TldrError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings: settings.clone(),
            api_key_regex: Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#)
                .expect("Invalid regex"),
        })
    }

    fn base_url(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    /// Fetch metadata using yt-dlp.
    #[instrument(skip(self))]
    pub async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMetadata> {
        let url = youtube_watch_url(video_id);
        let seconds = self.settings.metadata_timeout_secs;

        let mut command = tokio::process::Command::new(&self.settings.ytdlp_path);
        command
            .args(["--dump-json", "--skip-download", "--no-playlist", "--no-warnings", &url])
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(seconds), command.output())
            .await
            .map_err(|_| Url2TldrError::timeout("yt-dlp metadata lookup", seconds))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Url2TldrError::ToolNotFound(self.settings.ytdlp_path.clone())
                } else {
                    Url2TldrError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first_line = stderr.lines().next().unwrap_or("").trim().to_string();
            return Err(ExtractionFailure::InvalidResponse(format!(
                "yt-dlp exited with {}: {}",
                output.status, first_line
            ))
            .into());
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            ExtractionFailure::InvalidResponse(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        Ok(parse_ytdlp_metadata(&json))
    }

    /// Fetch the caption segments of a video.
    #[instrument(skip(self))]
    pub async fn fetch_transcript(&self, video_id: &str) -> Result<Vec<TranscriptSegment>> {
        let api_key = self.fetch_api_key(video_id).await?;
        let player = self.fetch_player(video_id, &api_key).await?;

        check_playability(video_id, player.playability_status.as_ref())?;

        let tracks = player.into_tracks();
        let track = select_track(&tracks, &self.settings.preferred_languages)
            .ok_or_else(|| ExtractionFailure::CaptionsUnavailable(video_id.to_string()))?;

        debug!(
            "Using {} caption track '{}' ({} available)",
            if track.is_generated() { "generated" } else { "manual" },
            track.language_code,
            tracks.len()
        );

        let document = self.fetch_caption_document(track).await?;
        let segments = parse_caption_xml(&document);

        if segments.is_empty() {
            return Err(ExtractionFailure::CaptionsUnavailable(video_id.to_string()).into());
        }

        info!("Fetched {} caption segments", segments.len());
        Ok(segments)
    }

    async fn fetch_api_key(&self, video_id: &str) -> Result<String> {
        let seconds = self.settings.request_timeout_secs;
        let url = format!("{}/watch?v={}", self.base_url(), video_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("YouTube watch page", seconds, e))?;
        check_status(response.status(), "watch page")?;

        let html = response
            .text()
            .await
            .map_err(|e| transport_error("YouTube watch page", seconds, e))?;

        if let Some(caps) = self.api_key_regex.captures(&html) {
            return Ok(caps[1].to_string());
        }
        if html.contains("class=\"g-recaptcha\"") {
            return Err(ExtractionFailure::Blocked("YouTube is asking for a captcha".to_string()).into());
        }
        Err(ExtractionFailure::InvalidResponse("watch page did not contain a player API key".to_string()).into())
    }

    async fn fetch_player(&self, video_id: &str, api_key: &str) -> Result<PlayerResponse> {
        let seconds = self.settings.request_timeout_secs;
        let url = format!("{}/youtubei/v1/player?key={}", self.base_url(), api_key);
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("YouTube player API", seconds, e))?;
        check_status(response.status(), "player API")?;

        let text = response
            .text()
            .await
            .map_err(|e| transport_error("YouTube player API", seconds, e))?;

        serde_json::from_str(&text).map_err(|e| {
            ExtractionFailure::InvalidResponse(format!("Failed to parse player response: {}", e)).into()
        })
    }

    async fn fetch_caption_document(&self, track: &CaptionTrack) -> Result<String> {
        let seconds = self.settings.request_timeout_secs;
        let mut url = track.base_url.replace("&fmt=srv3", "");
        if url.starts_with('/') {
            url = format!("{}{}", self.base_url(), url);
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("YouTube captions", seconds, e))?;
        check_status(response.status(), "caption document")?;

        response
            .text()
            .await
            .map_err(|e| transport_error("YouTube captions", seconds, e))
    }
}

#[async_trait]
impl Extractor for YoutubeExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    async fn extract(&self, target: &Classification) -> Result<Extraction> {
        let Classification::YouTube { video_id } = target else {
            return Err(Url2TldrError::InvalidInput(format!(
                "YouTube extractor cannot handle {:?}",
                target.kind()
            )));
        };

        info!("Extracting YouTube video {}", video_id);

        // Both lookups run together; only the transcript is required.
        let (metadata, transcript) = futures::future::join(
            self.fetch_metadata(video_id),
            self.fetch_transcript(video_id),
        )
        .await;

        let segments = transcript?;

        let mut issues = Vec::new();
        let metadata = match metadata {
            Ok(metadata) => {
                if metadata.is_empty() {
                    issues.push(ExtractionIssue::new("video metadata", "lookup returned no details"));
                }
                metadata
            }
            Err(e) => {
                warn!("Metadata lookup failed for {}: {}", video_id, e);
                issues.push(ExtractionIssue::new("video metadata", metadata_failure_reason(&e)));
                VideoMetadata::default()
            }
        };

        Ok(Extraction {
            source_url: youtube_watch_url(video_id),
            metadata: ContentMetadata::YouTube(metadata),
            body: ExtractedBody::Transcript(segments),
            issues,
        })
    }
}

fn metadata_failure_reason(err: &Url2TldrError) -> String {
    match err {
        Url2TldrError::ToolNotFound(tool) => format!("{} is not installed", tool),
        Url2TldrError::Timeout { seconds, .. } => format!("lookup timed out after {}s", seconds),
        other => other.to_string(),
    }
}

fn check_status(status: StatusCode, what: &str) -> Result<()> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ExtractionFailure::Blocked(format!("YouTube {} returned {}", what, status)).into());
    }
    if !status.is_success() {
        return Err(ExtractionFailure::Transport(format!("YouTube {} returned {}", what, status)).into());
    }
    Ok(())
}

fn check_playability(video_id: &str, status: Option<&PlayabilityStatus>) -> Result<()> {
    let Some(status) = status else {
        return Ok(());
    };
    if status.status == "OK" {
        return Ok(());
    }

    let reason = status.reason.clone().unwrap_or_else(|| status.status.clone());
    if status.status == "LOGIN_REQUIRED" && reason.contains("not a bot") {
        return Err(ExtractionFailure::Blocked(reason).into());
    }
    Err(ExtractionFailure::VideoUnavailable {
        video_id: video_id.to_string(),
        reason,
    }
    .into())
}

/// Pick a caption track.
///
/// Preferred languages are tried in order, manual tracks before generated ones.
/// Without a match the first manual track wins, then the first generated one.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], preferred: &[String]) -> Option<&'a CaptionTrack> {
    for language in preferred {
        let matching = |generated: bool| {
            tracks
                .iter()
                .find(|t| t.language_code == *language && t.is_generated() == generated)
        };
        if let Some(track) = matching(false).or_else(|| matching(true)) {
            return Some(track);
        }
    }

    tracks
        .iter()
        .find(|t| !t.is_generated())
        .or_else(|| tracks.first())
}

/// Extract video metadata from yt-dlp's `--dump-json` output.
pub fn parse_ytdlp_metadata(json: &serde_json::Value) -> VideoMetadata {
    let text = |key: &str| {
        json[key]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let upload_date = json["upload_date"]
        .as_str()
        .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y%m%d").ok());

    let duration_seconds = json["duration"]
        .as_u64()
        .or_else(|| json["duration"].as_f64().map(|d| d.round() as u64));

    VideoMetadata {
        title: text("title"),
        channel: text("channel").or_else(|| text("uploader")),
        upload_date,
        duration_seconds,
        view_count: json["view_count"].as_u64(),
    }
}

/// Parse a timedtext XML document into caption segments.
///
/// Entities are decoded twice (the document escapes already-escaped HTML) and
/// inline formatting tags are dropped. Empty segments are skipped.
pub fn parse_caption_xml(xml: &str) -> Vec<TranscriptSegment> {
    TEXT_REGEX
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let raw = caps.get(2)?.as_str();

            let decoded = unescape_entities(&unescape_entities(raw));
            let text = TAG_REGEX.replace_all(&decoded, "").trim().to_string();
            if text.is_empty() {
                return None;
            }

            let start_seconds = START_REGEX
                .captures(attrs)
                .and_then(|c| c[1].parse::<f64>().ok())
                .unwrap_or(0.0);
            let duration_seconds = DUR_REGEX.captures(attrs).and_then(|c| c[1].parse::<f64>().ok());

            Some(TranscriptSegment {
                text,
                start_seconds,
                duration_seconds,
            })
        })
        .collect()
}

/// Decode one level of XML/HTML character references.
fn unescape_entities(input: &str) -> String {
    ENTITY_REGEX
        .replace_all(input, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}
