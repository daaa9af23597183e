//! # tut-portal
//!
//! Backend for a university resource portal: turn uploaded PDF notices into
//! structured event records, and answer student questions through a hosted
//! chat-completion model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Text layer  pdfium, page by page (spawn_blocking)
//!  ├─ 2. OCR         remote fallback, only when step 1 is blank
//!  ├─ 3. Prompt      fixed event-extraction template
//!  ├─ 4. LLM         one chat-completion call, temperature 0
//!  └─ 5. Recover     brace span → strict JSON → permissive literal → defaults
//! ```
//!
//! The first terminal failure ends the request: no readable text never
//! reaches the model, and a failed model call never reaches recovery.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tut_portal::{router, AppState, PortalConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GROQ_API_KEY / OCRSPACE_API_KEY are read from the environment.
//!     let state = AppState::from_config(PortalConfig::from_env())?;
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, router(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tut-portal` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assistant;
pub mod config;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assistant::{ask_study_assistant, campus_chat, summarize_pdf};
pub use config::{PortalConfig, PortalConfigBuilder};
pub use error::{PortalError, RecoveryError, StrategyFailure};
pub use events::{extract_event, generate_event_details, EventExtraction};
pub use pipeline::extract::{DocumentTextExtractor, ExtractedText, TextOrigin};
pub use pipeline::llm::{ChatCompletionClient, CompletionRequest, GenerationOptions, LanguageModel};
pub use pipeline::ocr::{OcrService, OcrSpaceClient};
pub use pipeline::recover::{recover, ParseStrategy, RecoveredFields};
pub use pipeline::text_layer::{PdfSource, PdfiumTextLayer, TextLayer, TextLayerError};
pub use server::{router, run_server, AppState};
