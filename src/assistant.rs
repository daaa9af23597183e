//! Free-text assistant flows: campus chat bot, study Q&A and PDF summaries.
//!
//! These are thin variants of the event pipeline: validate, call the model
//! once, return its text. Upstream failures propagate like everywhere else.

use crate::error::PortalError;
use crate::pipeline::extract::DocumentTextExtractor;
use crate::pipeline::llm::{GenerationOptions, LanguageModel};
use crate::pipeline::text_layer::PdfSource;
use crate::prompts::{summary_prompt, STUDY_ASSISTANT_SYSTEM_PROMPT, TUT_CHAT_SYSTEM_PROMPT};
use tracing::info;

/// Token cap for chat-bot answers.
pub const CHAT_MAX_TOKENS: u32 = 300;
/// Token cap for study-assistant answers and summaries.
pub const STUDY_MAX_TOKENS: u32 = 400;

/// Answer a question about the university.
pub async fn campus_chat(llm: &dyn LanguageModel, question: &str) -> Result<String, PortalError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PortalError::InvalidInput("Question is required.".into()));
    }
    llm.complete(
        Some(TUT_CHAT_SYSTEM_PROMPT),
        question,
        GenerationOptions::max_tokens(CHAT_MAX_TOKENS),
    )
    .await
}

/// General academic Q&A.
pub async fn ask_study_assistant(
    llm: &dyn LanguageModel,
    prompt: &str,
) -> Result<String, PortalError> {
    if prompt.is_empty() {
        return Err(PortalError::InvalidInput("Prompt is required.".into()));
    }
    llm.complete(
        Some(STUDY_ASSISTANT_SYSTEM_PROMPT),
        prompt,
        GenerationOptions::max_tokens(STUDY_MAX_TOKENS),
    )
    .await
}

/// Summarise the text layer of a PDF. No OCR fallback.
pub async fn summarize_pdf(
    extractor: &DocumentTextExtractor,
    llm: &dyn LanguageModel,
    source: PdfSource,
    max_chars: usize,
) -> Result<String, PortalError> {
    let text = extractor.local_text(source).await;
    let text = text.as_str().trim();
    if text.is_empty() {
        return Err(PortalError::NoReadableText);
    }

    let material = truncate_chars(text, max_chars);
    info!(
        "Summarising {} of {} chars",
        material.chars().count(),
        text.chars().count()
    );

    llm.complete(
        Some(STUDY_ASSISTANT_SYSTEM_PROMPT),
        &summary_prompt(material),
        GenerationOptions::max_tokens(STUDY_MAX_TOKENS),
    )
    .await
}

/// First `max_chars` characters of `s`, on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
