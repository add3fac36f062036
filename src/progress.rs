//! Progress-callback trait for per-request events.
//!
//! Inject an [`Arc<dyn SessionProgressCallback>`] via
//! [`crate::session::Session::with_progress`] to receive events as a question
//! moves through extraction or upload, readiness polling, generation and
//! cleanup.
//!
//! Waiting for a video to finish remote processing can take minutes, so a
//! front-end needs something to show in the meantime. Callbacks keep the
//! library ignorant of how the host renders that (terminal spinner, web
//! socket, log line).
//!
//! # Example
//!
//! ```rust
//! use edgequake_mediachat::SessionProgressCallback;
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! struct PollCounter(AtomicU32);
//!
//! impl SessionProgressCallback for PollCounter {
//!     fn on_poll(&self, _remote_id: &str, attempt: u32, _readiness: &str) {
//!         self.0.store(attempt, Ordering::SeqCst);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by [`crate::session::Session`] as it processes a question.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait SessionProgressCallback: Send + Sync {
    /// Called after all documents were turned into text.
    ///
    /// # Arguments
    /// * `documents` — number of documents read
    /// * `chars`     — byte length of the concatenated text
    fn on_extraction_complete(&self, documents: usize, chars: usize) {
        let _ = (documents, chars);
    }

    /// Called once the remote store accepted an upload.
    fn on_upload_complete(&self, remote_id: &str, bytes: usize) {
        let _ = (remote_id, bytes);
    }

    /// Called after every readiness re-fetch.
    ///
    /// # Arguments
    /// * `attempt`   — 1-indexed poll number
    /// * `readiness` — the state observed by this poll
    fn on_poll(&self, remote_id: &str, attempt: u32, readiness: &str) {
        let _ = (remote_id, attempt, readiness);
    }

    /// Called when the upload is usable as generation input.
    fn on_ready(&self, remote_id: &str, polls: u32) {
        let _ = (remote_id, polls);
    }

    /// Called just before the generation request is sent.
    fn on_generation_start(&self, model: &str) {
        let _ = model;
    }

    /// Called when the model answered.
    fn on_generation_complete(&self, model: &str, output_chars: usize) {
        let _ = (model, output_chars);
    }

    /// Called after the remote file was deleted (or the delete was attempted).
    fn on_release(&self, remote_id: &str, deleted: bool) {
        let _ = (remote_id, deleted);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl SessionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type stored in [`crate::session::Session`].
pub type ProgressCallback = Arc<dyn SessionProgressCallback>;
