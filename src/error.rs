//! Error types for the edgequake-mediachat library.
//!
//! Every failure is scoped to the single in-flight question: nothing here is
//! fatal to the process, and callers may simply resubmit. The variants map to
//! four families:
//!
//! * **Extraction** — a PDF could not be parsed into page text.
//! * **Media readiness** — the remote store marked an upload as failed, or
//!   it never left the processing state within the configured bound.
//! * **Generation** — the remote model call failed (quota, network, bad
//!   payload). Carries the provider's detail verbatim.
//! * **Configuration / input** — missing API key, invalid knobs, unreadable
//!   input files.
//!
//! The only failure that is *not* surfaced is deleting an uploaded file after
//! use: see [`crate::pipeline::upload::MediaGateway::release`].

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-mediachat library.
#[derive(Debug, Error)]
pub enum MediaChatError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input string is not a usable file path or URL, or the wrong number
    /// of inputs was supplied for the media kind.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// The question was empty or whitespace only.
    #[error("The prompt is empty; enter a question before submitting.")]
    EmptyPrompt,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// A document could not be parsed into pages of text.
    #[error("Could not extract text from document '{document}': {detail}")]
    Extraction { document: String, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs a pdfium shared library. You can:\n\
  • Install libpdfium system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Media readiness errors ────────────────────────────────────────────
    /// The upload request itself was rejected.
    #[error("Upload of '{name}' failed: {detail}")]
    Upload { name: String, detail: String },

    /// The remote service marked the uploaded file as FAILED.
    #[error("Media '{handle}' failed remote processing: {reason}")]
    MediaProcessing { handle: String, reason: String },

    /// The uploaded file was still PROCESSING when the readiness bound elapsed.
    #[error("Media '{handle}' was still processing after {waited_secs}s\nIncrease --ready-timeout for long videos.")]
    MediaTimeout { handle: String, waited_secs: u64 },

    /// A request referenced media that has not finished processing.
    #[error("Media '{handle}' is still processing and cannot be used yet")]
    MediaNotReady { handle: String },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The remote generation call failed. Not retried.
    #[error("Generation with model '{model}' failed: {detail}")]
    Generation { model: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The API key is not set.
    #[error("No API key configured.\nSet {var}=<your key> before starting.")]
    MissingApiKey { var: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Flow control ──────────────────────────────────────────────────────
    /// The caller cancelled the request; any uploaded media was released.
    #[error("Request cancelled")]
    Cancelled,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaChatError {
    /// True for errors raised by the remote readiness protocol.
    pub fn is_media_error(&self) -> bool {
        matches!(
            self,
            MediaChatError::MediaProcessing { .. }
                | MediaChatError::MediaTimeout { .. }
                | MediaChatError::MediaNotReady { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_processing_display_carries_reason() {
        let e = MediaChatError::MediaProcessing {
            handle: "files/abc123".into(),
            reason: "unsupported codec".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("files/abc123"), "got: {msg}");
        assert!(msg.contains("unsupported codec"), "got: {msg}");
    }

    #[test]
    fn media_timeout_display() {
        let e = MediaChatError::MediaTimeout {
            handle: "files/xyz".into(),
            waited_secs: 600,
        };
        assert!(e.to_string().contains("600s"));
    }

    #[test]
    fn generation_display_includes_provider_detail() {
        let e = MediaChatError::Generation {
            model: "gemini-1.5-flash".into(),
            detail: "HTTP 429: Resource has been exhausted".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini-1.5-flash"));
        assert!(msg.contains("429"));
    }

    #[test]
    fn missing_key_names_the_variable() {
        let e = MediaChatError::MissingApiKey {
            var: "GOOGLE_API_KEY".into(),
        };
        assert!(e.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn media_error_classification() {
        assert!(MediaChatError::MediaNotReady { handle: "f".into() }.is_media_error());
        assert!(!MediaChatError::EmptyPrompt.is_media_error());
        assert!(!MediaChatError::Cancelled.is_media_error());
    }
}
