//! Result types returned by the pipeline and the session.

use crate::config::MediaKind;
use serde::{Deserialize, Serialize};

/// Plain text extracted from a batch of documents.
///
/// Immutable once built; two documents with the same text are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub text: String,
}

impl ExtractedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// The model's answer to one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Generated text, verbatim.
    pub text: String,
    /// Model identifier that produced the answer.
    pub model: String,
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    pub duration_ms: u64,
}

/// Everything a front-end needs to show after answering a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The answer text, verbatim from the model.
    pub text: String,
    pub kind: MediaKind,
    pub model: String,
    /// Token count of the extracted document text (documents only).
    ///
    /// `None` when the kind is not a document or counting failed.
    pub document_tokens: Option<u32>,
    /// URI of the uploaded media, already deleted by the time this is returned.
    pub media_uri: Option<String>,
    pub stats: AnswerStats,
}

/// Timing and usage figures for one question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerStats {
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    /// Number of readiness re-fetches after upload.
    pub polls: u32,
    /// Extraction or upload + readiness wait.
    pub prepare_ms: u64,
    pub generation_ms: u64,
    pub total_ms: u64,
}
