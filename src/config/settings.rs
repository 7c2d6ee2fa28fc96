//! Configuration settings for url2tldr.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub youtube: YoutubeSettings,
    pub reddit: RedditSettings,
    pub runtime: RuntimeSettings,
    pub prompts: PromptSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Upper bound for one whole extraction (metadata + body).
    pub extraction_timeout_secs: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            extraction_timeout_secs: 120,
        }
    }
}

/// YouTube-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Base URL for watch pages and the player API.
    pub base_url: String,
    /// yt-dlp executable used for metadata lookups.
    pub ytdlp_path: String,
    /// Timeout for the metadata lookup.
    pub metadata_timeout_secs: u64,
    /// Timeout for each caption-related HTTP request.
    pub request_timeout_secs: u64,
    /// Caption languages to prefer, in order. Empty = the video's own track.
    pub preferred_languages: Vec<String>,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            ytdlp_path: "yt-dlp".to_string(),
            metadata_timeout_secs: 60,
            request_timeout_secs: 30,
            preferred_languages: Vec::new(),
        }
    }
}

/// Reddit-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    /// Host that thread paths are fetched from.
    pub base_url: String,
    /// User agent sent with every request (Reddit rejects empty ones).
    pub user_agent: String,
    /// Timeout for the thread request.
    pub request_timeout_secs: u64,
    /// Optional comment pruning. Disabled unless set.
    pub filter: CommentFilterSettings,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            user_agent: format!("url2tldr/{} (local summarizer)", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 10,
            filter: CommentFilterSettings::default(),
        }
    }
}

/// Comment pruning rules applied after flattening.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CommentFilterSettings {
    /// Drop comments scoring below this value.
    pub min_score: Option<i64>,
    /// Drop comments whose body is shorter than this many characters.
    pub min_body_chars: Option<usize>,
    /// Keep only top-level comments.
    pub top_level_only: bool,
    /// Drop comments that are only an image emote.
    pub skip_emotes: bool,
}

impl CommentFilterSettings {
    pub fn is_enabled(&self) -> bool {
        self.min_score.is_some() || self.min_body_chars.is_some() || self.top_level_only || self.skip_emotes
    }
}

/// Local model runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Base URL of the Ollama API.
    pub base_url: String,
    pub probe_timeout_secs: u64,
    pub list_timeout_secs: u64,
    pub run_timeout_secs: u64,
    /// Model suggested after listing, when installed.
    pub default_model: Option<String>,
    /// Truncate prompts to this many characters before running.
    pub max_prompt_chars: Option<usize>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            probe_timeout_secs: 5,
            list_timeout_secs: 10,
            run_timeout_secs: 600,
            default_model: None,
            max_prompt_chars: None,
        }
    }
}

impl RuntimeSettings {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// HTTP interface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8050,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::Url2TldrError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("url2tldr")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.general.extraction_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(settings.runtime.base_url, "http://127.0.0.1:11434");
        assert_eq!(settings.server.port, 8050);
        assert!(!settings.reddit.filter.is_enabled());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[runtime]\ndefault_model = \"llama3.2\"\n\n[reddit.filter]\nmin_score = 1\n",
        )
        .unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.runtime.default_model.as_deref(), Some("llama3.2"));
        assert_eq!(settings.runtime.run_timeout_secs, 600);
        assert_eq!(settings.reddit.filter.min_score, Some(1));
        assert!(settings.reddit.filter.is_enabled());
        assert_eq!(settings.youtube.ytdlp_path, "yt-dlp");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.youtube.preferred_languages = vec!["fr".to_string(), "en".to_string()];
        settings.save_to(&path).unwrap();

        let reloaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(reloaded.youtube.preferred_languages, vec!["fr", "en"]);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[runtime\nbase_url = ").unwrap();
        assert!(matches!(
            Settings::load_from(Some(&path)),
            Err(crate::error::Url2TldrError::TomlParse(_))
        ));
    }
}
