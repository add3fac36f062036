//! Remote collaborators: the file store and the generation API.
//!
//! The pipeline only talks to these two traits. [`gemini::GeminiClient`]
//! implements both against the Gemini REST API; tests substitute in-memory
//! fakes that script readiness sequences and record dispatched requests.

pub mod gemini;

use crate::config::GenerationConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Processing state of an uploaded blob.
///
/// `Processing` → {`Ready`, `Failed`}; both targets are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    Processing,
    Ready,
    Failed,
}

impl Readiness {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Readiness::Processing)
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Readiness::Processing => "PROCESSING",
            Readiness::Ready => "READY",
            Readiness::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// A file as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Opaque identifier, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    pub state: Readiness,
    /// Failure detail reported alongside `Failed`.
    pub error: Option<String>,
}

/// One element of the ordered content sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentPart {
    Text(String),
    /// Reference to an uploaded file.
    Media { uri: String, mime_type: String },
}

/// Raw output of a generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResponse {
    pub text: String,
    pub prompt_tokens: u32,
    pub output_tokens: u32,
}

/// Error reported by a remote collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", describe(.status, .message))]
pub struct ProviderError {
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    pub message: String,
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => message.to_string(),
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// Remote blob storage with asynchronous processing.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store `data` and return its initial record (often `Processing`).
    async fn upload(
        &self,
        data: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, ProviderError>;

    /// Re-fetch the current record of a stored file.
    async fn get(&self, name: &str) -> Result<RemoteFile, ProviderError>;

    /// Delete a stored file.
    async fn delete(&self, name: &str) -> Result<(), ProviderError>;
}

/// Remote text generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run one generation call over `contents` in the given order.
    ///
    /// `config: None` means provider defaults; `timeout: None` means the
    /// transport default.
    async fn generate(
        &self,
        model: &str,
        contents: &[ContentPart],
        config: Option<&GenerationConfig>,
        timeout: Option<Duration>,
    ) -> Result<GenerationResponse, ProviderError>;

    /// Count the input tokens `contents` would consume.
    async fn count_tokens(&self, model: &str, contents: &[ContentPart]) -> Result<u32, ProviderError>;
}
