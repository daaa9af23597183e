//! Error types for the tut-portal library.
//!
//! Two error types reflect two distinct failure modes:
//!
//! * [`PortalError`]: **fatal for the request.** Validation failed, no text
//!   could be extracted, a delegated service failed, or the model output
//!   could not be recovered. Every variant maps to exactly one HTTP status via
//!   [`PortalError::status_code`]; the server module is the only place that
//!   performs that translation.
//!
//! * [`RecoveryError`]: **structured-output recovery exhausted.** Every parse
//!   strategy was tried and each one's failure is recorded, so the message
//!   returned to the caller names what was attempted rather than only the last
//!   exception.
//!
//! Document text extraction is absent from this taxonomy: the
//! extractor collapses its internal failures into empty text and the caller
//! turns that into [`PortalError::NoReadableText`].

use crate::pipeline::recover::ParseStrategy;
use thiserror::Error;

/// All request-terminating errors returned by the tut-portal library.
#[derive(Debug, Error)]
pub enum PortalError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request was rejected before any downstream call was made.
    #[error("{0}")]
    InvalidInput(String),

    /// Neither the text layer nor OCR produced non-whitespace text.
    #[error("No readable text found in PDF")]
    NoReadableText,

    // ── Delegation errors ─────────────────────────────────────────────────
    /// A remote service answered with a non-success status or an unusable
    /// body. `detail` carries the upstream body verbatim where available.
    #[error("{service} request failed: {detail}")]
    Upstream { service: &'static str, detail: String },

    /// A remote service did not answer within the fixed per-call timeout.
    #[error("{service} request timed out after {secs}s")]
    UpstreamTimeout { service: &'static str, secs: u64 },

    // ── Recovery errors ───────────────────────────────────────────────────
    /// The completion could not be turned into a mapping.
    #[error("Failed to parse LLM output: {0}")]
    Recovery(#[from] RecoveryError),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (temp file I/O, task join failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PortalError {
    /// HTTP status this error is surfaced as.
    pub fn status_code(&self) -> u16 {
        match self {
            PortalError::InvalidInput(_) | PortalError::NoReadableText => 400,
            PortalError::UpstreamTimeout { .. } => 504,
            PortalError::Upstream { .. }
            | PortalError::Recovery(_)
            | PortalError::InvalidConfig(_)
            | PortalError::Internal(_) => 500,
        }
    }

    /// Map a transport-level `reqwest` failure for `service`.
    pub(crate) fn from_transport(service: &'static str, timeout_secs: u64, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PortalError::UpstreamTimeout {
                service,
                secs: timeout_secs,
            }
        } else {
            PortalError::Upstream {
                service,
                detail: e.to_string(),
            }
        }
    }
}

/// One failed parse attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    pub strategy: ParseStrategy,
    pub detail: String,
}

/// Every parse strategy failed on the candidate text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_attempts(.attempts))]
pub struct RecoveryError {
    /// Attempts in the order they were made.
    pub attempts: Vec<StrategyFailure>,
}

fn render_attempts(attempts: &[StrategyFailure]) -> String {
    if attempts.is_empty() {
        return "no parse strategy was attempted".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.strategy, a.detail))
        .collect::<Vec<_>>()
        .join("; ")
}
