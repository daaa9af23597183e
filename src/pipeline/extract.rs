//! Document text extraction: local text layer first, remote OCR as fallback.
//!
//! [`DocumentTextExtractor::extract`] never fails. Every internal failure
//! (unreadable PDF, missing engine, OCR error or timeout) collapses into an
//! empty [`ExtractedText`]; callers check [`ExtractedText::is_readable`] and
//! decide whether an unreadable result ends the request.
//!
//! OCR is strictly a fallback. It is never started speculatively and never
//! runs when the text layer produced any non-whitespace character.

use crate::pipeline::ocr::OcrService;
use crate::pipeline::text_layer::{join_pages, PdfSource, TextLayer};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which stage produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOrigin {
    TextLayer,
    Ocr,
    /// Both stages failed or found nothing.
    Nothing,
}

impl fmt::Display for TextOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TextOrigin::TextLayer => "text-layer",
            TextOrigin::Ocr => "ocr",
            TextOrigin::Nothing => "nothing",
        })
    }
}

/// Best-effort plain text of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    text: String,
    origin: TextOrigin,
}

impl ExtractedText {
    fn new(text: String, origin: TextOrigin) -> Self {
        Self { text, origin }
    }

    fn empty() -> Self {
        Self::new(String::new(), TextOrigin::Nothing)
    }

    /// `true` when the text contains any non-whitespace character.
    pub fn is_readable(&self) -> bool {
        has_content(&self.text)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> TextOrigin {
        self.origin
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

fn has_content(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace())
}

/// Text extractor combining a [`TextLayer`] and an [`OcrService`].
#[derive(Clone)]
pub struct DocumentTextExtractor {
    text_layer: Arc<dyn TextLayer>,
    ocr: Arc<dyn OcrService>,
}

impl fmt::Debug for DocumentTextExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentTextExtractor")
            .field("text_layer", &"<dyn TextLayer>")
            .field("ocr", &"<dyn OcrService>")
            .finish()
    }
}

impl DocumentTextExtractor {
    pub fn new(text_layer: Arc<dyn TextLayer>, ocr: Arc<dyn OcrService>) -> Self {
        Self { text_layer, ocr }
    }

    /// Extract text from in-memory PDF bytes, falling back to OCR.
    pub async fn extract(&self, pdf: Arc<[u8]>) -> ExtractedText {
        let local = self.local_text(PdfSource::Memory(Arc::clone(&pdf))).await;
        if local.is_readable() {
            return local;
        }

        info!("Text layer empty; falling back to OCR ({} bytes)", pdf.len());
        match self.ocr.recognize(pdf).await {
            Ok(text) if has_content(&text) => ExtractedText::new(text, TextOrigin::Ocr),
            Ok(text) => {
                debug!("OCR returned no text");
                ExtractedText::new(text, TextOrigin::Nothing)
            }
            Err(e) => {
                warn!("OCR fallback failed: {}", e);
                ExtractedText::empty()
            }
        }
    }

    /// Text-layer extraction only, no OCR. Never fails.
    pub async fn local_text(&self, source: PdfSource) -> ExtractedText {
        match self.text_layer.page_texts(source).await {
            Ok(pages) => {
                let text = join_pages(&pages);
                let origin = if has_content(&text) {
                    TextOrigin::TextLayer
                } else {
                    TextOrigin::Nothing
                };
                debug!("Text layer: {} pages, {} chars", pages.len(), text.len());
                ExtractedText::new(text, origin)
            }
            Err(e) => {
                warn!("Local text extraction failed: {}", e);
                ExtractedText::empty()
            }
        }
    }
}
