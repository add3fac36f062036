//! Inference dispatch: build the ordered content and call the model.
//!
//! ## Content order
//!
//! | Payload | Parts sent |
//! |---------|-----------|
//! | document text | `[prompt, text]` |
//! | uploaded media | `[media, prompt]` |
//!
//! The two orders differ. Changing either one changes answers; treat it as a
//! behaviour change, not a cleanup.
//!
//! ## Guard rails
//!
//! A media payload is checked before any network call: `Failed` handles are
//! rejected with [`MediaChatError::MediaProcessing`], `Processing` handles
//! with [`MediaChatError::MediaNotReady`]. Remote failures surface as
//! [`MediaChatError::Generation`] and are not retried.

use crate::config::{ClientConfig, GenerationConfig, ModelTier, ResponseFormat};
use crate::error::MediaChatError;
use crate::output::{ExtractedDocument, InferenceResult};
use crate::pipeline::readiness::MediaHandle;
use crate::provider::{ContentPart, GenerationBackend, Readiness};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What the question is about.
#[derive(Debug)]
pub enum Payload {
    Text(ExtractedDocument),
    Media(MediaHandle),
}

/// One question, ready to send.
#[derive(Debug)]
pub struct InferenceRequest {
    pub model: ModelTier,
    /// `None` sends no generation config, leaving the provider defaults.
    pub config: Option<GenerationConfig>,
    pub payload: Payload,
    pub prompt: String,
}

/// Sends [`InferenceRequest`]s to a [`GenerationBackend`].
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn GenerationBackend>,
    media_timeout: Duration,
    text_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &ClientConfig) -> Self {
        Self {
            backend,
            media_timeout: config.media_request_timeout,
            text_timeout: config.text_request_timeout,
        }
    }

    /// Run the generation call and return the model's text verbatim.
    pub async fn generate(&self, request: &InferenceRequest) -> Result<InferenceResult, MediaChatError> {
        let contents = build_contents(&request.payload, &request.prompt)?;
        let model = request.model.model_name();

        let (config, timeout) = match request.payload {
            Payload::Text(_) => (
                request
                    .config
                    .map(|c| c.with_response_format(ResponseFormat::PlainText)),
                self.text_timeout,
            ),
            Payload::Media(_) => (request.config, Some(self.media_timeout)),
        };

        debug!(
            "Dispatching {} parts to {} (timeout {:?}, config {:?})",
            contents.len(),
            model,
            timeout,
            config
        );

        let start = Instant::now();
        let response = self
            .backend
            .generate(model, &contents, config.as_ref(), timeout)
            .await
            .map_err(|e| MediaChatError::Generation {
                model: model.to_string(),
                detail: e.to_string(),
            })?;
        let duration = start.elapsed();

        info!(
            "{}: {} input tokens, {} output tokens, {:?}",
            model, response.prompt_tokens, response.output_tokens, duration
        );

        Ok(InferenceResult {
            text: response.text,
            model: model.to_string(),
            prompt_tokens: response.prompt_tokens,
            output_tokens: response.output_tokens,
            duration_ms: duration.as_millis() as u64,
        })
    }

    /// Count the tokens of an extracted document.
    pub async fn count_tokens(
        &self,
        model: &ModelTier,
        document: &ExtractedDocument,
    ) -> Result<u32, MediaChatError> {
        let contents = [ContentPart::Text(document.text.clone())];
        self.backend
            .count_tokens(model.model_name(), &contents)
            .await
            .map_err(|e| MediaChatError::Generation {
                model: model.model_name().to_string(),
                detail: e.to_string(),
            })
    }
}

/// Build the ordered content parts for a payload.
pub fn build_contents(payload: &Payload, prompt: &str) -> Result<Vec<ContentPart>, MediaChatError> {
    match payload {
        Payload::Text(doc) => Ok(vec![
            ContentPart::Text(prompt.to_string()),
            ContentPart::Text(doc.text.clone()),
        ]),
        Payload::Media(handle) => match handle.readiness {
            Readiness::Failed => Err(MediaChatError::MediaProcessing {
                handle: handle.remote_id.clone(),
                reason: handle.failure_detail(),
            }),
            Readiness::Processing => Err(MediaChatError::MediaNotReady {
                handle: handle.remote_id.clone(),
            }),
            Readiness::Ready => Ok(vec![
                ContentPart::Media {
                    uri: handle.uri.clone(),
                    mime_type: handle.mime_type.clone(),
                },
                ContentPart::Text(prompt.to_string()),
            ]),
        },
    }
}
