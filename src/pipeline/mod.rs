//! Pipeline stages for answering a question about media.
//!
//! Each submodule implements exactly one step, so each can be tested with
//! fakes for the remote collaborators.
//!
//! ## Data Flow
//!
//! ```text
//!          ┌──▶ extract ─────────────────────────┐
//! input ───┤                                     ├──▶ dispatch ──▶ (release)
//!          └──▶ upload ──▶ readiness (poll) ─────┘
//!  (path/URL)  (file store)                         (generateContent)
//! ```
//!
//! 1. [`input`]     — load a local path or URL into memory, detect its mime type
//! 2. [`extract`]   — documents only: per-page text via pdfium, concatenated
//! 3. [`upload`]    — other media: send to the remote file store
//! 4. [`readiness`] — fixed-interval, bounded wait until the upload is usable
//! 5. [`dispatch`]  — ordered content + generation config → model answer

pub mod dispatch;
pub mod extract;
pub mod input;
pub mod readiness;
pub mod upload;
