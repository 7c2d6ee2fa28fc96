//! Ollama runtime client.

use super::{Availability, ModelRuntime};
use crate::config::RuntimeSettings;
use crate::error::{Result, Url2TldrError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Client for a local Ollama server.
pub struct OllamaRuntime {
    client: reqwest::Client,
    base_url: String,
    probe_timeout: Duration,
    list_timeout: Duration,
    run_timeout: Duration,
}

impl OllamaRuntime {
    pub fn new(settings: &RuntimeSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Url2TldrError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            probe_timeout: settings.probe_timeout(),
            list_timeout: settings.list_timeout(),
            run_timeout: settings.run_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_error(&self, operation: &str, timeout: Duration, err: reqwest::Error) -> Url2TldrError {
        if err.is_timeout() {
            Url2TldrError::timeout(operation, timeout.as_secs())
        } else if err.is_connect() {
            Url2TldrError::RuntimeUnreachable(format!("{}: {}", self.base_url, err))
        } else {
            Url2TldrError::RunFailed(format!("{}: {}", operation, err))
        }
    }
}

#[derive(Deserialize)]
struct VersionResponse {
    version: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

/// Chat API message for `/api/chat`.
#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Request payload for the `/api/chat` endpoint.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Prefer the `error` field of an Ollama error body over the raw text.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => format!("runtime returned {}", status),
        Err(_) => format!("runtime returned {}: {}", status, body.trim()),
    }
}

#[async_trait]
impl ModelRuntime for OllamaRuntime {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn probe(&self) -> Result<Availability> {
        let response = self
            .client
            .get(format!("{}/api/version", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return Err(Url2TldrError::timeout("runtime probe", self.probe_timeout.as_secs()))
            }
            Err(e) => {
                warn!("Runtime probe failed: {}", e);
                return Ok(Availability::Unreachable {
                    reason: format!("nothing answered at {}", self.base_url),
                });
            }
        };

        if !response.status().is_success() {
            warn!("Runtime probe returned {}", response.status());
            return Ok(Availability::Unreachable {
                reason: format!("{} answered with {}", self.base_url, response.status()),
            });
        }

        let version = response
            .json::<VersionResponse>()
            .await
            .ok()
            .and_then(|v| v.version);
        info!("Runtime reachable (version {})", version.as_deref().unwrap_or("unknown"));
        Ok(Availability::Reachable { version })
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.list_timeout)
            .send()
            .await
            .map_err(|e| self.request_error("listing models", self.list_timeout, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Url2TldrError::RuntimeUnreachable(error_message(status, &body)));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Url2TldrError::RuntimeUnreachable(format!("unexpected model list: {}", e)))?;

        let models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        debug!("Runtime lists {} models", models.len());
        Ok(models)
    }

    #[instrument(skip(self, prompt), fields(prompt_chars = prompt.chars().count()))]
    async fn run(&self, model: &str, prompt: &str) -> Result<String> {
        let start = Instant::now();

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(self.run_timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error("model run", self.run_timeout, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Url2TldrError::ModelNotFound(model.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Url2TldrError::RunFailed(error_message(status, &body)));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.request_error("model run", self.run_timeout, e))?;

        info!(
            response_chars = result.message.content.chars().count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(result.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "llama3.2",
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Summarize this".to_string(),
            }],
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3.2");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Summarize this");
    }

    #[test]
    fn test_tags_response_deserialization() {
        let json = r#"{"models":[{"name":"llama3.2:latest","size":2019393189},{"name":"mistral:7b"}]}"#;
        let tags: TagsResponse = serde_json::from_str(json).unwrap();
        let names: Vec<_> = tags.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["llama3.2:latest", "mistral:7b"]);

        let empty: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.models.is_empty());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error":"out of memory"}"#),
            "out of memory"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, ""),
            "runtime returned 502 Bad Gateway"
        );
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let settings = RuntimeSettings {
            base_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        };
        let runtime = OllamaRuntime::new(&settings).unwrap();
        assert_eq!(runtime.base_url(), "http://localhost:11434");
        assert_eq!(runtime.name(), "ollama");
    }

    #[tokio::test]
    async fn test_probe_closed_port_is_unreachable() {
        // Port 9 (discard) is essentially never served locally.
        let settings = RuntimeSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            probe_timeout_secs: 2,
            ..Default::default()
        };
        let runtime = OllamaRuntime::new(&settings).unwrap();
        let availability = runtime.probe().await.unwrap();
        assert!(!availability.is_reachable());
    }
}
