//! Gemini REST implementation of [`FileStore`] and [`GenerationBackend`].
//!
//! ## Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | upload    | `POST /upload/v1beta/files` (resumable: `start`, then `upload, finalize`) |
//! | get       | `GET /v1beta/{name}` |
//! | delete    | `DELETE /v1beta/{name}` |
//! | generate  | `POST /v1beta/models/{model}:generateContent` |
//! | count     | `POST /v1beta/models/{model}:countTokens` |
//!
//! The key travels in the `x-goog-api-key` header so it never appears in
//! URLs that might be logged.
//!
//! Upload requests are bounded by `ClientConfig::media_request_timeout`;
//! status checks and deletes by `ClientConfig::store_request_timeout`.
//!
//! Remote file states map as `PROCESSING` → [`Readiness::Processing`],
//! `ACTIVE` → [`Readiness::Ready`], `FAILED` → [`Readiness::Failed`]. Any
//! other value (`STATE_UNSPECIFIED`, or a state added later) is treated as
//! still processing; the readiness timeout bounds that case.

use super::{
    ContentPart, FileStore, GenerationBackend, GenerationResponse, ProviderError, Readiness,
    RemoteFile,
};
use crate::config::{ClientConfig, GenerationConfig};
use crate::error::MediaChatError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// HTTP client for the Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    upload_timeout: Duration,
    store_timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client from the shared config.
    pub fn new(config: &ClientConfig) -> Result<Self, MediaChatError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| MediaChatError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            upload_timeout: config.media_request_timeout,
            store_timeout: config.store_request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn start_upload(
        &self,
        len: usize,
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, ProviderError> {
        let body = UploadStart {
            file: UploadStartFile { display_name },
        };

        let response = self
            .http
            .post(self.url("upload/v1beta/files"))
            .timeout(self.upload_timeout)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", len.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::new("upload session started without an upload URL"))
    }
}

#[async_trait]
impl FileStore for GeminiClient {
    async fn upload(
        &self,
        data: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteFile, ProviderError> {
        let upload_url = self.start_upload(data.len(), mime_type, display_name).await?;
        debug!("Upload session opened for '{}' ({} bytes)", display_name, data.len());

        let response = self
            .http
            .post(upload_url)
            .timeout(self.upload_timeout)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data.to_vec())
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: UploadResponse = response.json().await.map_err(decode_error)?;
        Ok(body.file.into())
    }

    async fn get(&self, name: &str) -> Result<RemoteFile, ProviderError> {
        let response = self
            .http
            .get(self.url(&format!("v1beta/{}", name)))
            .timeout(self.store_timeout)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let file: WireFile = response.json().await.map_err(decode_error)?;
        Ok(file.into())
    }

    async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .delete(self.url(&format!("v1beta/{}", name)))
            .timeout(self.store_timeout)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        contents: &[ContentPart],
        config: Option<&GenerationConfig>,
        timeout: Option<Duration>,
    ) -> Result<GenerationResponse, ProviderError> {
        let body = build_generate_request(contents, config);

        let mut request = self
            .http
            .post(self.url(&format!("v1beta/models/{}:generateContent", model)))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: GenerateContentResponse = response.json().await.map_err(decode_error)?;
        into_generation_response(body)
    }

    async fn count_tokens(&self, model: &str, contents: &[ContentPart]) -> Result<u32, ProviderError> {
        let body = CountTokensRequest {
            contents: vec![user_content(contents)],
        };

        let response = self
            .http
            .post(self.url(&format!("v1beta/models/{}:countTokens", model)))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: CountTokensResponse = response.json().await.map_err(decode_error)?;
        Ok(body.total_tokens)
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct UploadStart<'a> {
    file: UploadStartFile<'a>,
}

#[derive(Debug, Serialize)]
struct UploadStartFile<'a> {
    display_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct CountTokensRequest<'a> {
    contents: Vec<WireContent<'a>>,
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: WireFileData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: WireFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    state: Option<String>,
    error: Option<WireStatus>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl From<WireFile> for RemoteFile {
    fn from(w: WireFile) -> Self {
        let state = parse_state(w.state.as_deref());
        let error = w.error.map(|s| {
            if s.message.is_empty() {
                format!("remote status code {}", s.code)
            } else {
                s.message
            }
        });
        RemoteFile {
            name: w.name,
            uri: w.uri,
            mime_type: w.mime_type,
            state,
            error,
        }
    }
}

fn parse_state(state: Option<&str>) -> Readiness {
    match state {
        Some("ACTIVE") => Readiness::Ready,
        Some("FAILED") => Readiness::Failed,
        _ => Readiness::Processing,
    }
}

fn user_content<'a>(contents: &'a [ContentPart]) -> WireContent<'a> {
    let parts = contents
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => WirePart::Text { text },
            ContentPart::Media { uri, mime_type } => WirePart::File {
                file_data: WireFileData {
                    mime_type,
                    file_uri: uri,
                },
            },
        })
        .collect();
    WireContent { role: "user", parts }
}

fn build_generate_request<'a>(
    contents: &'a [ContentPart],
    config: Option<&GenerationConfig>,
) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![user_content(contents)],
        generation_config: config.map(|c| WireGenerationConfig {
            temperature: c.temperature,
            top_p: c.top_p,
            max_output_tokens: c.max_output_tokens,
            response_mime_type: c.response_format.mime_type(),
        }),
    }
}

fn into_generation_response(body: GenerateContentResponse) -> Result<GenerationResponse, ProviderError> {
    let usage = body.usage_metadata;
    let Some(candidate) = body.candidates.into_iter().next() else {
        let reason = body
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no reason given".to_string());
        return Err(ProviderError::new(format!(
            "model returned no candidates (blocked: {})",
            reason
        )));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r != "STOP") {
            return Err(ProviderError::new(format!(
                "model returned no text (finish reason: {})",
                reason
            )));
        }
    }

    Ok(GenerationResponse {
        text,
        prompt_tokens: usage.as_ref().map(|u| u.prompt_token_count).unwrap_or(0),
        output_tokens: usage.as_ref().map(|u| u.candidates_token_count).unwrap_or(0),
    })
}

async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ProviderError::with_status(status, api_error_message(&body))
}

fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(env) if !env.error.status.is_empty() => {
            format!("{} ({})", env.error.message, env.error.status)
        }
        Ok(env) => env.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::new(format!("request timed out: {}", e))
    } else {
        ProviderError::new(e.to_string())
    }
}

fn decode_error(e: reqwest::Error) -> ProviderError {
    ProviderError::new(format!("could not decode response: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResponseFormat;
    use serde_json::json;

    #[test]
    fn state_mapping() {
        assert_eq!(parse_state(Some("PROCESSING")), Readiness::Processing);
        assert_eq!(parse_state(Some("ACTIVE")), Readiness::Ready);
        assert_eq!(parse_state(Some("FAILED")), Readiness::Failed);
        assert_eq!(parse_state(Some("STATE_UNSPECIFIED")), Readiness::Processing);
        assert_eq!(parse_state(None), Readiness::Processing);
    }

    #[test]
    fn remote_file_from_wire() {
        let wire: WireFile = serde_json::from_value(json!({
            "name": "files/abc",
            "uri": "https://generativelanguage.googleapis.com/v1beta/files/abc",
            "mimeType": "video/mp4",
            "state": "FAILED",
            "error": { "code": 3, "message": "unsupported codec" }
        }))
        .unwrap();
        let file = RemoteFile::from(wire);
        assert_eq!(file.name, "files/abc");
        assert_eq!(file.state, Readiness::Failed);
        assert_eq!(file.error.as_deref(), Some("unsupported codec"));
    }

    #[test]
    fn generate_body_preserves_order_and_config() {
        let contents = vec![
            ContentPart::Media {
                uri: "https://x/files/1".into(),
                mime_type: "image/png".into(),
            },
            ContentPart::Text("What is this?".into()),
        ];
        let config = GenerationConfig {
            temperature: 0.5,
            top_p: 0.8,
            max_output_tokens: 1000,
            response_format: ResponseFormat::Unspecified,
        };
        let body = serde_json::to_value(build_generate_request(&contents, Some(&config))).unwrap();

        assert_eq!(
            body["contents"][0]["parts"][0]["fileData"]["fileUri"],
            "https://x/files/1"
        );
        assert_eq!(body["contents"][0]["parts"][1]["text"], "What is this?");
        assert_eq!(body["generationConfig"]["temperature"].as_f64(), Some(0.5));
        assert_eq!(body["generationConfig"]["topP"].as_f64().map(|v| v as f32), Some(0.8));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1000);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn generate_body_plain_text_hint() {
        let contents = vec![ContentPart::Text("q".into()), ContentPart::Text("doc".into())];
        let config = GenerationConfig::default().with_response_format(ResponseFormat::PlainText);
        let body = serde_json::to_value(build_generate_request(&contents, Some(&config))).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], "text/plain");
    }

    #[test]
    fn generate_body_without_config() {
        let contents = vec![ContentPart::Text("q".into())];
        let body = serde_json::to_value(build_generate_request(&contents, None)).unwrap();
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn response_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "there" }], "role": "model" },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 3 }
        }))
        .unwrap();
        let r = into_generation_response(body).unwrap();
        assert_eq!(r.text, "Hello there");
        assert_eq!(r.prompt_tokens, 12);
        assert_eq!(r.output_tokens, 3);
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let body: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        let err = into_generation_response(body).unwrap_err();
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn api_error_message_parsing() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            api_error_message(body),
            "Resource has been exhausted (RESOURCE_EXHAUSTED)"
        );
        assert_eq!(api_error_message("upstream down"), "upstream down");
        assert_eq!(api_error_message(""), "empty response body");
    }

    // ── Local HTTP server ────────────────────────────────────────────────

    mod local {
        use std::collections::HashMap;
        use std::sync::{Arc, Mutex};
        use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
        use tokio::net::TcpListener;

        #[derive(Debug)]
        pub struct Seen {
            pub method: String,
            pub path: String,
            pub headers: HashMap<String, String>,
            pub body: Vec<u8>,
        }

        pub struct Reply {
            pub status: u16,
            pub headers: Vec<(String, String)>,
            pub body: String,
            /// Read the request, then never answer.
            pub stall: bool,
        }

        impl Reply {
            pub fn json(status: u16, body: serde_json::Value) -> Self {
                Self {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                    stall: false,
                }
            }

            pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
                self.headers.push((name.to_string(), value.into()));
                self
            }

            pub fn stalled() -> Self {
                Self {
                    status: 200,
                    headers: Vec::new(),
                    body: String::new(),
                    stall: true,
                }
            }
        }

        /// Answer one connection per reply, in order.
        ///
        /// `script` receives the server's base URL so replies can point back
        /// at it. Every reply closes its connection, so each request arrives
        /// on a fresh one.
        pub async fn serve(
            script: impl FnOnce(&str) -> Vec<Reply>,
        ) -> (String, Arc<Mutex<Vec<Seen>>>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let replies = script(&base);
            let seen = Arc::new(Mutex::new(Vec::new()));
            let log = seen.clone();

            tokio::spawn(async move {
                for reply in replies {
                    let (stream, _) = listener.accept().await.unwrap();
                    let mut reader = BufReader::new(stream);

                    let mut request_line = String::new();
                    reader.read_line(&mut request_line).await.unwrap();
                    let mut parts = request_line.split_whitespace();
                    let method = parts.next().unwrap_or_default().to_string();
                    let path = parts.next().unwrap_or_default().to_string();

                    let mut headers = HashMap::new();
                    loop {
                        let mut line = String::new();
                        reader.read_line(&mut line).await.unwrap();
                        let line = line.trim_end();
                        if line.is_empty() {
                            break;
                        }
                        if let Some((name, value)) = line.split_once(':') {
                            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
                        }
                    }

                    let len = headers
                        .get("content-length")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    let mut body = vec![0u8; len];
                    reader.read_exact(&mut body).await.unwrap();
                    log.lock().unwrap().push(Seen {
                        method,
                        path,
                        headers,
                        body,
                    });

                    if reply.stall {
                        // Keep the connection open without answering.
                        std::future::pending::<()>().await;
                    }

                    let mut response = format!(
                        "HTTP/1.1 {} OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
                        reply.status,
                        reply.body.len()
                    );
                    for (name, value) in &reply.headers {
                        response.push_str(&format!("{}: {}\r\n", name, value));
                    }
                    response.push_str("\r\n");
                    response.push_str(&reply.body);

                    let stream = reader.get_mut();
                    stream.write_all(response.as_bytes()).await.unwrap();
                    stream.shutdown().await.ok();
                }
            });

            (base, seen)
        }
    }

    fn local_client(base: &str) -> GeminiClient {
        let config = ClientConfig::builder()
            .api_key("local-key")
            .base_url(base)
            .store_request_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        GeminiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn upload_opens_a_session_then_sends_the_bytes() {
        let (base, seen) = local::serve(|base| {
            vec![
                local::Reply::json(200, json!({}))
                    .header("x-goog-upload-url", format!("{}/session/abc", base)),
                local::Reply::json(
                    200,
                    json!({ "file": {
                        "name": "files/cat",
                        "uri": format!("{}/v1beta/files/cat", base),
                        "mimeType": "image/webp",
                        "state": "PROCESSING"
                    }}),
                ),
            ]
        })
        .await;
        let client = local_client(&base);

        let file = client.upload(b"RIFF....WEBP", "image/webp", "cat.webp").await.unwrap();
        assert_eq!(file.name, "files/cat");
        assert_eq!(file.mime_type, "image/webp");
        assert_eq!(file.state, Readiness::Processing);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);

        let start = &seen[0];
        assert_eq!(start.method, "POST");
        assert_eq!(start.path, "/upload/v1beta/files");
        assert_eq!(start.headers["x-goog-api-key"], "local-key");
        assert_eq!(start.headers["x-goog-upload-protocol"], "resumable");
        assert_eq!(start.headers["x-goog-upload-command"], "start");
        assert_eq!(start.headers["x-goog-upload-header-content-length"], "12");
        assert_eq!(start.headers["x-goog-upload-header-content-type"], "image/webp");
        let opened: serde_json::Value = serde_json::from_slice(&start.body).unwrap();
        assert_eq!(opened["file"]["display_name"], "cat.webp");

        let finish = &seen[1];
        assert_eq!(finish.method, "POST");
        assert_eq!(finish.path, "/session/abc");
        assert_eq!(finish.headers["x-goog-upload-command"], "upload, finalize");
        assert_eq!(finish.headers["x-goog-upload-offset"], "0");
        assert_eq!(finish.body, b"RIFF....WEBP");
    }

    #[tokio::test]
    async fn upload_session_without_url_is_an_error() {
        let (base, seen) = local::serve(|_| vec![local::Reply::json(200, json!({}))]).await;
        let client = local_client(&base);

        let err = client.upload(b"abc", "audio/mpeg", "note.mp3").await.unwrap_err();
        assert!(err.message.contains("upload URL"), "got {err}");
        assert_eq!(err.status, None);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_reports_status_and_api_message() {
        let (base, seen) = local::serve(|_| {
            vec![local::Reply::json(
                404,
                json!({ "error": { "code": 404, "message": "File not found", "status": "NOT_FOUND" } }),
            )]
        })
        .await;
        let client = local_client(&base);

        let err = client.get("files/gone").await.unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "File not found (NOT_FOUND)");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, "GET");
        assert_eq!(seen[0].path, "/v1beta/files/gone");
    }

    #[tokio::test]
    async fn unanswered_status_check_times_out() {
        let (base, _seen) = local::serve(|_| vec![local::Reply::stalled()]).await;
        let client = local_client(&base);

        let err = tokio::time::timeout(Duration::from_secs(10), client.get("files/slow"))
            .await
            .expect("client request timeout should fire first")
            .unwrap_err();
        assert!(err.message.contains("timed out"), "got {err}");
    }

    #[tokio::test]
    async fn delete_sends_key_header() {
        let (base, seen) = local::serve(|_| vec![local::Reply::json(200, json!({}))]).await;
        let client = local_client(&base);

        client.delete("files/done").await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].method, "DELETE");
        assert_eq!(seen[0].path, "/v1beta/files/done");
        assert_eq!(seen[0].headers["x-goog-api-key"], "local-key");
    }
}
