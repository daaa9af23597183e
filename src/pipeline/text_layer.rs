//! Local text-layer extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not run on a Tokio worker. Each call moves onto the blocking
//! pool, binds the library (cached on disk by `pdfium-auto` after the first
//! download) and walks every page's text layer.
//!
//! The [`TextLayer`] trait is the seam the extractor depends on, so tests can
//! substitute a canned text layer without shipping a PDF engine.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Where the PDF bytes live.
#[derive(Debug, Clone)]
pub enum PdfSource {
    /// Bytes already in memory (uploads that may also be sent to OCR).
    Memory(Arc<[u8]>),
    /// A file on disk, typically a request-scoped temporary file.
    File(PathBuf),
}

/// Failure to read a document's text layer.
#[derive(Debug, Error)]
pub enum TextLayerError {
    #[error("PDF engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("could not open PDF: {0}")]
    Open(String),

    #[error("text layer task failed: {0}")]
    Task(String),
}

/// Reads the embedded text of a PDF, page by page.
#[async_trait]
pub trait TextLayer: Send + Sync {
    /// Text of every page in order; `None` for a page whose text could not be read.
    async fn page_texts(&self, source: PdfSource) -> Result<Vec<Option<String>>, TextLayerError>;
}

/// Join page texts with newlines, unreadable pages contributing `""`.
pub fn join_pages(pages: &[Option<String>]) -> String {
    pages
        .iter()
        .map(|p| p.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// [`TextLayer`] backed by pdfium.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumTextLayer;

impl PdfiumTextLayer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextLayer for PdfiumTextLayer {
    async fn page_texts(&self, source: PdfSource) -> Result<Vec<Option<String>>, TextLayerError> {
        tokio::task::spawn_blocking(move || read_text_blocking(&source))
            .await
            .map_err(|e| TextLayerError::Task(e.to_string()))?
    }
}

/// Blocking implementation of text-layer extraction.
fn read_text_blocking(source: &PdfSource) -> Result<Vec<Option<String>>, TextLayerError> {
    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| TextLayerError::EngineUnavailable(e.to_string()))?;

    let document = match source {
        PdfSource::Memory(bytes) => pdfium.load_pdf_from_byte_slice(bytes, None),
        PdfSource::File(path) => pdfium.load_pdf_from_file(path, None),
    }
    .map_err(|e| TextLayerError::Open(format!("{:?}", e)))?;

    let pages = document.pages();
    let mut texts = Vec::with_capacity(pages.len() as usize);

    for (idx, page) in pages.iter().enumerate() {
        match page.text() {
            Ok(text) => texts.push(Some(text.all())),
            Err(e) => {
                debug!("Page {}: no text layer ({:?})", idx + 1, e);
                texts.push(None);
            }
        }
    }

    debug!("Read text layer of {} pages", texts.len());
    Ok(texts)
}
