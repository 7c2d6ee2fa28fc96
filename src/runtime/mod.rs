//! Local model runtime client.
//!
//! The runtime is an external service that lists installed models and
//! generates a completion for a prompt. Calls block the caller until the full
//! text is available; no streaming is modeled here.

mod ollama;

pub use ollama::OllamaRuntime;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Outcome of an availability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Reachable { version: Option<String> },
    /// The runtime is not running, or something else answers on its address.
    Unreachable { reason: String },
}

impl Availability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Availability::Reachable { .. })
    }
}

/// Trait for model runtimes.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Short name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Check whether the runtime answers. "Not running" is a normal outcome,
    /// not an error.
    async fn probe(&self) -> Result<Availability>;

    /// Names of the installed models. An empty list is valid.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Run a prompt to completion on the named model.
    async fn run(&self, model: &str, prompt: &str) -> Result<String>;
}
