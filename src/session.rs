//! One question, end to end.
//!
//! Every media kind runs the same flow; only the payload step differs:
//!
//! ```text
//! Document:  extract ──▶ count tokens ──▶ generate([prompt, text])
//! Image/Video/Audio:
//!            upload ──▶ await_ready ──▶ generate([media, prompt]) ──▶ release
//! ```
//!
//! Uploaded media is released on every path once the upload succeeded:
//! after the answer, after a readiness failure, after a generation error and
//! after cancellation. A failed release never hides the answer.

use crate::config::{ClientConfig, ExtractionPolicy, GenerationConfig, MediaKind, ModelTier};
use crate::error::MediaChatError;
use crate::output::{Answer, AnswerStats, InferenceResult};
use crate::pipeline::dispatch::{Dispatcher, InferenceRequest, Payload};
use crate::pipeline::extract::{extract_documents, PageTextReader, PdfiumTextReader};
use crate::pipeline::input::MediaInput;
use crate::pipeline::upload::MediaGateway;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::provider::gemini::GeminiClient;
use crate::provider::{FileStore, GenerationBackend};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A question about one or more inputs.
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub kind: MediaKind,
    /// Several documents, or exactly one file for the other kinds.
    pub inputs: Vec<MediaInput>,
    pub prompt: String,
    pub model: ModelTier,
    pub generation: GenerationConfig,
    /// Send `generation` even for kinds that use provider defaults
    /// (see [`MediaKind::uses_generation_config`]).
    pub always_send_config: bool,
}

impl AskRequest {
    pub fn new(kind: MediaKind, inputs: Vec<MediaInput>, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            inputs,
            prompt: prompt.into(),
            model: ModelTier::default(),
            generation: GenerationConfig::default(),
            always_send_config: false,
        }
    }

    pub fn model(mut self, model: ModelTier) -> Self {
        self.model = model;
        self
    }

    pub fn generation(mut self, config: GenerationConfig) -> Self {
        self.generation = config;
        self
    }

    pub fn always_send_config(mut self, v: bool) -> Self {
        self.always_send_config = v;
        self
    }

    /// The config actually sent with the generation call.
    pub fn effective_config(&self) -> Option<GenerationConfig> {
        (self.always_send_config || self.kind.uses_generation_config()).then_some(self.generation)
    }

    fn validate(&self) -> Result<(), MediaChatError> {
        if self.prompt.trim().is_empty() {
            return Err(MediaChatError::EmptyPrompt);
        }
        if self.inputs.is_empty() {
            return Err(MediaChatError::InvalidInput {
                input: self.kind.to_string(),
                reason: "no input files were supplied".into(),
            });
        }
        if !self.kind.accepts_multiple() && self.inputs.len() > 1 {
            return Err(MediaChatError::InvalidInput {
                input: self.kind.to_string(),
                reason: format!("expected exactly one file, got {}", self.inputs.len()),
            });
        }
        Ok(())
    }
}

/// Answers questions using a file store, a generation backend and a
/// document reader.
///
/// Holds no per-question state; one `Session` can serve many questions, and
/// concurrent questions never share a media handle.
#[derive(Clone)]
pub struct Session {
    gateway: MediaGateway,
    dispatcher: Dispatcher,
    reader: Arc<dyn PageTextReader>,
    extraction_policy: ExtractionPolicy,
    progress: ProgressCallback,
}

impl Session {
    pub fn new(
        store: Arc<dyn FileStore>,
        backend: Arc<dyn GenerationBackend>,
        reader: Arc<dyn PageTextReader>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            gateway: MediaGateway::new(store, config),
            dispatcher: Dispatcher::new(backend, config),
            reader,
            extraction_policy: config.extraction_policy,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Session wired to the Gemini API and a pdfium reader
    /// (`PDFIUM_LIB_PATH` honoured).
    pub fn gemini(config: &ClientConfig) -> Result<Self, MediaChatError> {
        let client = Arc::new(GeminiClient::new(config)?);
        Ok(Self::new(
            client.clone(),
            client,
            Arc::new(PdfiumTextReader::from_env()),
            config,
        ))
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.gateway = self.gateway.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    /// Answer a question.
    ///
    /// # Errors
    /// Any [`MediaChatError`]; each is scoped to this question only.
    pub async fn ask(&self, request: AskRequest) -> Result<Answer, MediaChatError> {
        self.ask_with_cancel(request, futures::future::pending()).await
    }

    /// Answer a question, giving up as soon as `cancel` completes.
    ///
    /// Cancelling interrupts readiness polling and generation alike; media
    /// that was already uploaded is released before
    /// [`MediaChatError::Cancelled`] is returned.
    pub async fn ask_with_cancel<F>(&self, request: AskRequest, cancel: F) -> Result<Answer, MediaChatError>
    where
        F: Future<Output = ()>,
    {
        request.validate()?;
        tokio::pin!(cancel);

        info!(
            "Question about {} {} input(s) with {}",
            request.inputs.len(),
            request.kind,
            request.model
        );

        if request.kind.requires_upload() {
            self.answer_media(request, cancel).await
        } else {
            tokio::select! {
                answer = self.answer_document(request) => answer,
                _ = cancel.as_mut() => Err(MediaChatError::Cancelled),
            }
        }
    }

    /// Synchronous wrapper around [`Session::ask`].
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn ask_sync(&self, request: AskRequest) -> Result<Answer, MediaChatError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| MediaChatError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.ask(request))
    }

    async fn answer_document(&self, request: AskRequest) -> Result<Answer, MediaChatError> {
        let total_start = Instant::now();
        let config = request.effective_config();
        let AskRequest {
            kind,
            inputs,
            prompt,
            model,
            ..
        } = request;

        // ── Step 1: Extract text ─────────────────────────────────────────────
        let documents = inputs.len();
        let document = extract_documents(inputs, Arc::clone(&self.reader), self.extraction_policy).await?;
        self.progress
            .on_extraction_complete(documents, document.text.len());

        // ── Step 2: Token count (informational) ──────────────────────────────
        let document_tokens = match self.dispatcher.count_tokens(&model, &document).await {
            Ok(n) => {
                info!("Extracted text is {} tokens", n);
                Some(n)
            }
            Err(e) => {
                warn!("Token count unavailable: {}", e);
                None
            }
        };
        let prepare_ms = total_start.elapsed().as_millis() as u64;

        // ── Step 3: Generate ─────────────────────────────────────────────────
        let request = InferenceRequest {
            model,
            config,
            payload: Payload::Text(document),
            prompt,
        };
        let result = self.run_generation(&request).await?;

        Ok(build_answer(
            kind,
            result,
            document_tokens,
            None,
            0,
            prepare_ms,
            total_start,
        ))
    }

    async fn answer_media<F>(
        &self,
        request: AskRequest,
        mut cancel: Pin<&mut F>,
    ) -> Result<Answer, MediaChatError>
    where
        F: Future<Output = ()>,
    {
        let total_start = Instant::now();
        let config = request.effective_config();
        let AskRequest {
            kind,
            inputs,
            prompt,
            model,
            ..
        } = request;
        let input = inputs.into_iter().next().ok_or_else(|| {
            MediaChatError::Internal("validated media request has no input".into())
        })?;

        // ── Step 1: Upload ───────────────────────────────────────────────────
        let mut handle = tokio::select! {
            handle = self.gateway.upload(&input) => handle?,
            _ = cancel.as_mut() => return Err(MediaChatError::Cancelled),
        };
        let media_uri = handle.uri.clone();

        // ── Step 2: Wait until usable ────────────────────────────────────────
        let ready = tokio::select! {
            polls = self.gateway.await_ready(&mut handle) => polls,
            _ = cancel.as_mut() => Err(MediaChatError::Cancelled),
        };
        let polls = match ready {
            Ok(polls) => polls,
            Err(e) => {
                self.gateway.release(handle).await;
                return Err(e);
            }
        };
        let prepare_ms = total_start.elapsed().as_millis() as u64;

        // ── Step 3: Generate ─────────────────────────────────────────────────
        let request = InferenceRequest {
            model,
            config,
            payload: Payload::Media(handle),
            prompt,
        };
        let result = tokio::select! {
            result = self.run_generation(&request) => result,
            _ = cancel.as_mut() => Err(MediaChatError::Cancelled),
        };

        // ── Step 4: Release ──────────────────────────────────────────────────
        if let Payload::Media(handle) = request.payload {
            self.gateway.release(handle).await;
        }

        Ok(build_answer(
            kind,
            result?,
            None,
            Some(media_uri),
            polls,
            prepare_ms,
            total_start,
        ))
    }

    async fn run_generation(&self, request: &InferenceRequest) -> Result<InferenceResult, MediaChatError> {
        let model = request.model.model_name();
        self.progress.on_generation_start(model);
        let result = self.dispatcher.generate(request).await?;
        self.progress.on_generation_complete(model, result.text.len());
        Ok(result)
    }
}

fn build_answer(
    kind: MediaKind,
    result: InferenceResult,
    document_tokens: Option<u32>,
    media_uri: Option<String>,
    polls: u32,
    prepare_ms: u64,
    total_start: Instant,
) -> Answer {
    let stats = AnswerStats {
        prompt_tokens: result.prompt_tokens,
        output_tokens: result.output_tokens,
        polls,
        prepare_ms,
        generation_ms: result.duration_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Answered in {}ms ({} tokens in / {} out)",
        stats.total_ms, stats.prompt_tokens, stats.output_tokens
    );

    Answer {
        text: result.text,
        kind,
        model: result.model,
        document_tokens,
        media_uri,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: MediaKind) -> MediaInput {
        MediaInput::from_bytes(kind, "x.bin", vec![1, 2, 3])
    }

    #[test]
    fn video_and_audio_use_provider_defaults() {
        let r = AskRequest::new(MediaKind::Video, vec![input(MediaKind::Video)], "q");
        assert_eq!(r.effective_config(), None);
        let r = r.always_send_config(true);
        assert_eq!(r.effective_config(), Some(GenerationConfig::default()));

        let r = AskRequest::new(MediaKind::Image, vec![input(MediaKind::Image)], "q");
        assert!(r.effective_config().is_some());
    }

    #[test]
    fn empty_prompt_rejected() {
        let r = AskRequest::new(MediaKind::Image, vec![input(MediaKind::Image)], "   ");
        assert!(matches!(r.validate(), Err(MediaChatError::EmptyPrompt)));
    }

    #[test]
    fn single_file_kinds_reject_batches() {
        let r = AskRequest::new(
            MediaKind::Audio,
            vec![input(MediaKind::Audio), input(MediaKind::Audio)],
            "q",
        );
        assert!(matches!(r.validate(), Err(MediaChatError::InvalidInput { .. })));

        let r = AskRequest::new(
            MediaKind::Document,
            vec![input(MediaKind::Document), input(MediaKind::Document)],
            "q",
        );
        assert!(r.validate().is_ok());
    }

    #[test]
    fn no_inputs_rejected() {
        let r = AskRequest::new(MediaKind::Document, vec![], "q");
        assert!(matches!(r.validate(), Err(MediaChatError::InvalidInput { .. })));
    }
}
