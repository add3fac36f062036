//! Document text extraction: PDFs → one concatenated string.
//!
//! Page texts are joined with no separator, document after document, in the
//! order the user supplied them. An empty batch yields an empty string.
//!
//! Parsing is delegated to a [`PageTextReader`]. The production reader is
//! pdfium, which is synchronous and uses thread-local state, so
//! [`extract_documents`] runs the whole batch inside `spawn_blocking`.
//!
//! A reader that cannot run at all ([`ReadError::ReaderUnavailable`]) fails
//! the question under every [`ExtractionPolicy`]; the policy only decides
//! what happens to individual malformed documents.

use crate::config::ExtractionPolicy;
use crate::error::MediaChatError;
use crate::output::ExtractedDocument;
use crate::pipeline::input::MediaInput;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable pointing at an existing libpdfium (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Why a [`PageTextReader`] produced no text for a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// This document could not be parsed.
    #[error("{0}")]
    Malformed(String),

    /// The reader itself is unusable (e.g. the pdfium library cannot be bound).
    #[error("{0}")]
    ReaderUnavailable(String),
}

/// Parses one document into the text of each of its pages.
pub trait PageTextReader: Send + Sync {
    /// Return page texts in page order.
    fn page_texts(&self, data: &[u8]) -> Result<Vec<String>, ReadError>;
}

/// [`PageTextReader`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextReader {
    library_path: Option<PathBuf>,
}

impl PdfiumTextReader {
    /// Bind to `PDFIUM_LIB_PATH` when set, else to the system library.
    pub fn from_env() -> Self {
        Self {
            library_path: std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from),
        }
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, ReadError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(library_file(path)),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ReadError::ReaderUnavailable(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(path))
    } else {
        path.to_path_buf()
    }
}

impl PageTextReader for PdfiumTextReader {
    fn page_texts(&self, data: &[u8]) -> Result<Vec<String>, ReadError> {
        if !data.starts_with(b"%PDF") {
            let magic: Vec<u8> = data.iter().take(4).copied().collect();
            return Err(ReadError::Malformed(format!(
                "not a PDF (first bytes: {:?})",
                magic
            )));
        }

        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| ReadError::Malformed(format!("{:?}", e)))?;

        let mut texts = Vec::with_capacity(document.pages().len() as usize);
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| ReadError::Malformed(format!("page {}: {:?}", idx + 1, e)))?;
            texts.push(text.all());
        }
        Ok(texts)
    }
}

/// Extract and concatenate the text of every document, off the async runtime.
pub async fn extract_documents(
    documents: Vec<MediaInput>,
    reader: Arc<dyn PageTextReader>,
    policy: ExtractionPolicy,
) -> Result<ExtractedDocument, MediaChatError> {
    tokio::task::spawn_blocking(move || extract_blocking(&documents, reader.as_ref(), policy))
        .await
        .map_err(|e| MediaChatError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of [`extract_documents`].
pub fn extract_blocking(
    documents: &[MediaInput],
    reader: &dyn PageTextReader,
    policy: ExtractionPolicy,
) -> Result<ExtractedDocument, MediaChatError> {
    let mut text = String::new();
    let mut pages = 0usize;

    for doc in documents {
        match reader.page_texts(&doc.data) {
            Ok(page_texts) => {
                debug!("Document '{}': {} pages", doc.name, page_texts.len());
                pages += page_texts.len();
                for page in page_texts {
                    text.push_str(&page);
                }
            }
            Err(ReadError::ReaderUnavailable(detail)) => {
                return Err(MediaChatError::PdfiumBindingFailed(detail));
            }
            Err(ReadError::Malformed(detail)) => match policy {
                ExtractionPolicy::Abort => {
                    return Err(MediaChatError::Extraction {
                        document: doc.name.clone(),
                        detail,
                    })
                }
                ExtractionPolicy::Skip => {
                    warn!("Skipping document '{}': {}", doc.name, detail);
                }
            },
        }
    }

    info!(
        "Extracted {} chars from {} pages across {} documents",
        text.len(),
        pages,
        documents.len()
    );
    Ok(ExtractedDocument { text })
}
