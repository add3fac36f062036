//! Input resolution: turn a user-supplied path or URL into an in-memory blob.
//!
//! Every downstream stage works on bytes: pdfium parses documents straight
//! from a byte slice and the upload gateway streams the blob to the remote
//! store. Reading the whole file up front means a missing or unreadable path
//! fails before any remote call is made.

use crate::config::MediaKind;
use crate::error::MediaChatError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// One user-supplied file, loaded into memory.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaInput {
    /// Display name (file name or last URL segment).
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for MediaInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaInput")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl MediaInput {
    /// Wrap bytes already in memory, detecting the mime type for `kind`.
    pub fn from_bytes(kind: MediaKind, name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = detect_mime_type(kind, &name, &data);
        Self {
            name,
            mime_type,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory blob.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_input(
    input: &str,
    kind: MediaKind,
    download_timeout: Duration,
) -> Result<MediaInput, MediaChatError> {
    let (name, data) = if is_url(input) {
        download_url(input, download_timeout).await?
    } else {
        read_local(input).await?
    };

    if data.is_empty() {
        return Err(MediaChatError::InvalidInput {
            input: input.to_string(),
            reason: "file is empty".into(),
        });
    }

    Ok(MediaInput::from_bytes(kind, name, data))
}

async fn read_local(path_str: &str) -> Result<(String, Vec<u8>), MediaChatError> {
    let path = PathBuf::from(path_str);

    let data = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => MediaChatError::FileNotFound { path: path.clone() },
        _ => MediaChatError::InvalidInput {
            input: path_str.to_string(),
            reason: e.to_string(),
        },
    })?;

    debug!("Read local input: {} ({} bytes)", path.display(), data.len());
    Ok((file_name(&path), data))
}

async fn download_url(url: &str, timeout: Duration) -> Result<(String, Vec<u8>), MediaChatError> {
    info!("Downloading input from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MediaChatError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        let reason = if e.is_timeout() {
            format!("timed out after {}s", timeout.as_secs())
        } else {
            e.to_string()
        };
        MediaChatError::DownloadFailed {
            url: url.to_string(),
            reason,
        }
    })?;

    if !response.status().is_success() {
        return Err(MediaChatError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MediaChatError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok((url_file_name(url), bytes.to_vec()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract a reasonable file name from the URL path.
fn url_file_name(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "download".to_string()
}

/// Pick the mime type sent with an upload.
///
/// Images are sniffed from their magic bytes; everything else goes by file
/// extension, falling back to [`MediaKind::default_mime_type`].
pub fn detect_mime_type(kind: MediaKind, name: &str, data: &[u8]) -> String {
    if kind == MediaKind::Image {
        if let Ok(format) = image::guess_format(data) {
            return format.to_mime_type().to_string();
        }
    }

    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let by_ext = match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "mp4" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "webm" => Some("video/webm"),
        "mpeg" | "mpg" => Some("video/mpeg"),
        "avi" => Some("video/x-msvideo"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "aac" => Some("audio/aac"),
        "m4a" => Some("audio/mp4"),
        _ => None,
    };

    // An extension from another kind (e.g. `.mp4` passed as audio) is still
    // the most precise information available.
    by_ext.unwrap_or(kind.default_mime_type()).to_string()
}
