//! # edgequake-mediachat
//!
//! Ask a multimodal model questions about PDFs, images, video and audio.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input (path or URL)
//!  │
//!  ├─ Document ─▶ extract text (pdfium, spawn_blocking) ─▶ [prompt, text]
//!  │
//!  └─ Image / Video / Audio
//!        ─▶ upload to the remote file store
//!        ─▶ poll every 10 s until READY (bounded)
//!        ─▶ [media, prompt]
//!                    │
//!                    ▼
//!              generate ─▶ release uploaded file ─▶ Answer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_mediachat::{resolve_input, AskRequest, ClientConfig, MediaKind, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fails when GOOGLE_API_KEY is not set.
//!     let config = ClientConfig::from_env()?;
//!     let session = Session::gemini(&config)?;
//!
//!     let clip = resolve_input("clip.mp4", MediaKind::Video, config.download_timeout).await?;
//!     let answer = session
//!         .ask(AskRequest::new(MediaKind::Video, vec![clip], "What happens in this clip?"))
//!         .await?;
//!     println!("{}", answer.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mediachat` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-mediachat = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ClientConfig, ClientConfigBuilder, ExtractionPolicy, GenerationConfig, GenerationConfigBuilder,
    MediaKind, ModelTier, ResponseFormat, API_KEY_ENV,
};
pub use error::MediaChatError;
pub use output::{Answer, AnswerStats, ExtractedDocument, InferenceResult};
pub use pipeline::extract::{PageTextReader, PdfiumTextReader, ReadError};
pub use pipeline::input::{resolve_input, MediaInput};
pub use pipeline::readiness::MediaHandle;
pub use progress::{NoopProgressCallback, ProgressCallback, SessionProgressCallback};
pub use provider::gemini::GeminiClient;
pub use provider::{FileStore, GenerationBackend, Readiness};
pub use session::{AskRequest, Session};
