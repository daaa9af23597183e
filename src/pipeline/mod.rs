//! Pipeline stages for document → structured data.
//!
//! Each submodule implements exactly one step so each can be tested on its
//! own, and remote services sit behind traits so tests can swap them out.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ text_layer ──(empty?)──▶ ocr ──▶ prompt ──▶ llm ──▶ recover
//!            (pdfium)                (HTTP)            (HTTP)   (literal)
//! ```
//!
//! 1. [`text_layer`]: page-by-page text via pdfium on the blocking pool
//! 2. [`ocr`]: remote OCR, reached only when the text layer is blank
//! 3. [`extract`]: combines the two; never fails, returns empty text instead
//! 4. [`llm`]: one chat-completion call, no retry
//! 5. [`recover`]: span narrowing + ordered parse strategies + default keys,
//!    using the permissive parser in [`literal`]

pub mod extract;
pub mod literal;
pub mod llm;
pub mod ocr;
pub mod recover;
pub mod text_layer;
