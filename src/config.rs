//! Configuration types for media question answering.
//!
//! Two structs cover every knob:
//!
//! * [`GenerationConfig`] — the sampling/length bundle sent with one
//!   generation call. Immutable per request.
//! * [`ClientConfig`] — the API credential, endpoint and timing bounds for
//!   the remote file store and generation API. Built once at start-up and
//!   passed by reference into the gateway and dispatcher; there is no global
//!   state.
//!
//! Both follow the builder pattern: setters clamp into the valid range and
//! `build()` validates what clamping cannot fix.

use crate::error::MediaChatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Default REST endpoint of the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// ── Generation config ────────────────────────────────────────────────────

/// Sampling and length parameters for a single generation call.
///
/// Values are passed to the remote API unmodified.
///
/// # Example
/// ```rust
/// use edgequake_mediachat::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .temperature(0.5)
///     .top_p(0.8)
///     .max_output_tokens(1000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_output_tokens, 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature. Range: 0.0–2.0. Default: 1.0.
    ///
    /// 0 always picks the highest-probability token; higher values give more
    /// diverse answers.
    pub temperature: f32,

    /// Nucleus-sampling threshold. Range: 0.0–1.0. Default: 0.94.
    pub top_p: f32,

    /// Maximum tokens the model may generate. Default: 2000.
    pub max_output_tokens: u32,

    /// Response format hint. Default: [`ResponseFormat::Unspecified`].
    ///
    /// The dispatcher forces [`ResponseFormat::PlainText`] for document
    /// payloads regardless of this value.
    pub response_format: ResponseFormat,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.94,
            max_output_tokens: 2000,
            response_format: ResponseFormat::Unspecified,
        }
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Copy of this config with the response format replaced.
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = format;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, MediaChatError> {
        let c = &self.config;
        if !c.temperature.is_finite() || !c.top_p.is_finite() {
            return Err(MediaChatError::InvalidConfig(
                "temperature and top_p must be finite numbers".into(),
            ));
        }
        if c.max_output_tokens == 0 {
            return Err(MediaChatError::InvalidConfig(
                "max_output_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Response format hint sent with a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseFormat {
    /// `text/plain`.
    PlainText,
    /// Let the provider decide. (default)
    #[default]
    Unspecified,
}

impl ResponseFormat {
    /// Mime type sent to the provider, if any.
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            ResponseFormat::PlainText => Some("text/plain"),
            ResponseFormat::Unspecified => None,
        }
    }
}

// ── Model selection ──────────────────────────────────────────────────────

/// Which model tier answers the question.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelTier {
    /// `gemini-1.5-flash` (default)
    #[default]
    Fast,
    /// `gemini-1.5-pro`
    Pro,
    /// Any other model identifier accepted by the provider.
    Custom(String),
}

impl ModelTier {
    /// Model identifier sent to the provider.
    pub fn model_name(&self) -> &str {
        match self {
            ModelTier::Fast => "gemini-1.5-flash",
            ModelTier::Pro => "gemini-1.5-pro",
            ModelTier::Custom(name) => name,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_name())
    }
}

// ── Media kinds ──────────────────────────────────────────────────────────

/// The kind of media a question is about.
///
/// Every kind shares one flow; they differ only in how the payload is built
/// (local text extraction for documents, remote upload for everything else).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MediaKind {
    /// One or more PDF files. (default)
    #[default]
    Document,
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// True when the payload is built by uploading to the remote file store.
    pub fn requires_upload(&self) -> bool {
        !matches!(self, MediaKind::Document)
    }

    /// True when several inputs may be combined into one question.
    pub fn accepts_multiple(&self) -> bool {
        matches!(self, MediaKind::Document)
    }

    /// Whether the generation config is sent by default for this kind.
    ///
    /// Video and audio questions historically ran with provider defaults;
    /// [`crate::session::AskRequest::always_send_config`] overrides this.
    pub fn uses_generation_config(&self) -> bool {
        matches!(self, MediaKind::Document | MediaKind::Image)
    }

    /// Fallback mime type when the input cannot be identified more precisely.
    pub fn default_mime_type(&self) -> &'static str {
        match self {
            MediaKind::Document => "application/pdf",
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/mpeg",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Document => "document",
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        };
        f.write_str(s)
    }
}

/// What to do when one document of a batch cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionPolicy {
    /// Fail the whole batch on the first malformed document. (default)
    #[default]
    Abort,
    /// Log the malformed document and continue with the rest.
    Skip,
}

// ── Client config ────────────────────────────────────────────────────────

/// Credential, endpoint and timing bounds for the remote API.
///
/// The API key is the only secret and is never printed by `Debug`.
#[derive(Clone)]
pub struct ClientConfig {
    /// API key sent with every request.
    pub api_key: String,

    /// REST endpoint root. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Fixed delay between readiness checks. Default: 10 s.
    ///
    /// There is no backoff: every check waits exactly this long.
    pub poll_interval: Duration,

    /// Upper bound on waiting for an upload to leave PROCESSING. Default: 600 s.
    pub readiness_timeout: Duration,

    /// Network timeout for generation calls with media payloads. Default: 600 s.
    pub media_request_timeout: Duration,

    /// Network timeout for generation calls with text payloads.
    /// Default: `None` (HTTP client default).
    pub text_request_timeout: Option<Duration>,

    /// Network timeout for file-store status checks and deletes, and the
    /// bound on a best-effort release. Uploads use `media_request_timeout`.
    /// Default: 60 s.
    pub store_request_timeout: Duration,

    /// Timeout for downloading URL inputs. Default: 120 s.
    pub download_timeout: Duration,

    /// Policy for malformed documents in a batch. Default: [`ExtractionPolicy::Abort`].
    pub extraction_policy: ExtractionPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(10),
            readiness_timeout: Duration::from_secs(600),
            media_request_timeout: Duration::from_secs(600),
            text_request_timeout: None,
            store_request_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(120),
            extraction_policy: ExtractionPolicy::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("readiness_timeout", &self.readiness_timeout)
            .field("media_request_timeout", &self.media_request_timeout)
            .field("text_request_timeout", &self.text_request_timeout)
            .field("store_request_timeout", &self.store_request_timeout)
            .field("download_timeout", &self.download_timeout)
            .field("extraction_policy", &self.extraction_policy)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from `GOOGLE_API_KEY`, failing when it is absent or empty.
    pub fn from_env() -> Result<Self, MediaChatError> {
        Self::builder().api_key_from_env()?.build()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Read the API key from [`API_KEY_ENV`].
    pub fn api_key_from_env(self) -> Result<Self, MediaChatError> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(self.api_key(key.trim())),
            _ => Err(MediaChatError::MissingApiKey {
                var: API_KEY_ENV.to_string(),
            }),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.config.readiness_timeout = timeout;
        self
    }

    pub fn media_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.media_request_timeout = timeout;
        self
    }

    pub fn text_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.text_request_timeout = timeout;
        self
    }

    pub fn store_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_request_timeout = timeout;
        self
    }

    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.config.download_timeout = timeout;
        self
    }

    pub fn extraction_policy(mut self, policy: ExtractionPolicy) -> Self {
        self.config.extraction_policy = policy;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, MediaChatError> {
        let c = &self.config;
        if c.api_key.is_empty() {
            return Err(MediaChatError::MissingApiKey {
                var: API_KEY_ENV.to_string(),
            });
        }
        if c.store_request_timeout.is_zero() {
            return Err(MediaChatError::InvalidConfig(
                "store request timeout must be greater than zero".into(),
            ));
        }
        if c.poll_interval.is_zero() {
            return Err(MediaChatError::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(MediaChatError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_defaults_match_form_defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.temperature, 1.0);
        assert_eq!(c.top_p, 0.94);
        assert_eq!(c.max_output_tokens, 2000);
        assert_eq!(c.response_format, ResponseFormat::Unspecified);
    }

    #[test]
    fn builder_clamps_sampling_ranges() {
        let c = GenerationConfig::builder()
            .temperature(5.0)
            .top_p(-0.3)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.top_p, 0.0);
    }

    #[test]
    fn builder_rejects_zero_tokens() {
        let err = GenerationConfig::builder().max_output_tokens(0).build();
        assert!(matches!(err, Err(MediaChatError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_nan() {
        let err = GenerationConfig::builder().temperature(f32::NAN).build();
        assert!(err.is_err());
    }

    #[test]
    fn model_tier_names() {
        assert_eq!(ModelTier::Fast.model_name(), "gemini-1.5-flash");
        assert_eq!(ModelTier::Pro.model_name(), "gemini-1.5-pro");
        assert_eq!(ModelTier::Custom("gemini-2.0-flash".into()).to_string(), "gemini-2.0-flash");
    }

    #[test]
    fn media_kind_flags() {
        assert!(!MediaKind::Document.requires_upload());
        assert!(MediaKind::Video.requires_upload());
        assert!(MediaKind::Document.accepts_multiple());
        assert!(!MediaKind::Audio.accepts_multiple());
        assert!(MediaKind::Image.uses_generation_config());
        assert!(!MediaKind::Video.uses_generation_config());
    }

    #[test]
    fn client_config_requires_key() {
        let err = ClientConfig::builder().build();
        assert!(matches!(err, Err(MediaChatError::MissingApiKey { .. })));
    }

    #[test]
    fn client_config_defaults() {
        let c = ClientConfig::builder().api_key("k").build().unwrap();
        assert_eq!(c.poll_interval, Duration::from_secs(10));
        assert_eq!(c.media_request_timeout, Duration::from_secs(600));
        assert_eq!(c.text_request_timeout, None);
        assert_eq!(c.store_request_timeout, Duration::from_secs(60));
        assert_eq!(c.extraction_policy, ExtractionPolicy::Abort);
    }

    #[test]
    fn client_config_rejects_zero_interval() {
        let err = ClientConfig::builder()
            .api_key("k")
            .poll_interval(Duration::ZERO)
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = ClientConfig::builder()
            .api_key("k")
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://localhost:8080");
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ClientConfig::builder().api_key("super-secret").build().unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
