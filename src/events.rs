//! Event extraction: uploaded PDF → event fields.
//!
//! Stages run strictly in sequence and the first terminal failure stops the
//! rest: no readable text means the model is never called, and an upstream
//! failure means recovery never runs.

use crate::error::PortalError;
use crate::pipeline::extract::DocumentTextExtractor;
use crate::pipeline::llm::{GenerationOptions, LanguageModel};
use crate::pipeline::recover::{recover, RecoveredFields};
use crate::prompts::{event_extraction_prompt, EVENT_FIELDS};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Response body of a successful extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventExtraction {
    pub success: bool,
    /// Always holds every key in [`EVENT_FIELDS`].
    pub event: RecoveredFields,
}

/// Ask the model for event details in `text` and recover them.
pub async fn generate_event_details(
    llm: &dyn LanguageModel,
    text: &str,
) -> Result<RecoveredFields, PortalError> {
    let prompt = event_extraction_prompt(text);
    let raw = llm
        .complete(None, &prompt, GenerationOptions::temperature(0.0))
        .await?;
    debug!("Event completion: {} chars", raw.len());
    Ok(recover(&raw, &EVENT_FIELDS)?)
}

/// Run the full pipeline over PDF bytes.
pub async fn extract_event(
    extractor: &DocumentTextExtractor,
    llm: &dyn LanguageModel,
    pdf: Arc<[u8]>,
) -> Result<EventExtraction, PortalError> {
    let start = Instant::now();

    let text = extractor.extract(pdf).await;
    if !text.is_readable() {
        return Err(PortalError::NoReadableText);
    }
    info!(
        "Extracted {} chars via {} in {:?}",
        text.as_str().len(),
        text.origin(),
        start.elapsed()
    );

    let event = generate_event_details(llm, text.as_str()).await?;
    info!("Event extracted in {:?}", start.elapsed());

    Ok(EventExtraction {
        success: true,
        event,
    })
}
