//! HTTP surface.
//!
//! | Method | Path                   | Body                 | Response              |
//! |--------|------------------------|----------------------|-----------------------|
//! | GET    | `/`                    |                      | `{message}`           |
//! | GET    | `/health`              |                      | `{status, version}`   |
//! | POST   | `/extract-event`       | multipart `file`     | `{success, event}`    |
//! | POST   | `/tut-chat/`           | `{question}`         | `{answer}`            |
//! | POST   | `/llama/ask`           | `{prompt}`           | `{answer}`            |
//! | POST   | `/llama/summarize-pdf` | multipart `file`     | `{summary}`           |
//!
//! Every failure is `{"detail": "<message>"}` with the status from
//! [`PortalError::status_code`]. Uploads must be declared `application/pdf`;
//! anything else is refused before any downstream call.

use crate::assistant::{ask_study_assistant, campus_chat, summarize_pdf};
use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::events::{extract_event, EventExtraction};
use crate::pipeline::extract::DocumentTextExtractor;
use crate::pipeline::llm::{ChatCompletionClient, LanguageModel};
use crate::pipeline::ocr::OcrSpaceClient;
use crate::pipeline::text_layer::{PdfSource, PdfiumTextLayer};
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub extractor: DocumentTextExtractor,
    pub llm: Arc<dyn LanguageModel>,
    pub config: Arc<PortalConfig>,
}

impl AppState {
    pub fn new(
        extractor: DocumentTextExtractor,
        llm: Arc<dyn LanguageModel>,
        config: PortalConfig,
    ) -> Self {
        Self {
            extractor,
            llm,
            config: Arc::new(config),
        }
    }

    /// Wire the production collaborators: pdfium, OCR.space and the
    /// chat-completion endpoint.
    pub fn from_config(config: PortalConfig) -> Result<Self, PortalError> {
        let extractor = DocumentTextExtractor::new(
            Arc::new(PdfiumTextLayer::new()),
            Arc::new(OcrSpaceClient::new(&config)?),
        );
        let llm = Arc::new(ChatCompletionClient::new(&config)?);
        Ok(Self::new(extractor, llm, config))
    }
}

/// Error response: `(status, {"detail": ...})`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    detail: String,
}

impl AppError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<PortalError> for AppError {
    fn from(e: PortalError) -> Self {
        Self {
            status: StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            detail: e.to_string(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            detail: e.body_text(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        Self {
            status: e.status(),
            detail: e.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = %self.detail, "Request failed");
        } else {
            warn!(status = %self.status, detail = %self.detail, "Request rejected");
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/extract-event", post(extract_event_handler))
        .route("/tut-chat/", post(chat_handler))
        .route("/tut-chat", post(chat_handler))
        .route("/llama/ask", post(ask_handler))
        .route("/llama/summarize-pdf", post(summarize_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind `host:port` and serve until Ctrl+C / SIGTERM.
pub async fn run_server(
    state: AppState,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Server listening on http://{}", listener.local_addr()?);
    info!("  POST /extract-event       - PDF event extraction");
    info!("  POST /tut-chat/           - campus chat bot");
    info!("  POST /llama/ask           - study assistant");
    info!("  POST /llama/summarize-pdf - PDF summary");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": "TUT Resources API is running" }))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn extract_event_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<EventExtraction>, AppError> {
    let request_id = uuid::Uuid::new_v4().to_string();
    let start = Instant::now();

    let pdf = read_pdf_upload(&mut multipart).await?;
    info!(request_id = %request_id, bytes = pdf.len(), "Processing event extraction");

    let result = extract_event(&state.extractor, state.llm.as_ref(), pdf)
        .await
        .inspect_err(|e| error!(request_id = %request_id, error = %e, "Event extraction failed"))?;

    info!(
        request_id = %request_id,
        total_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Event extracted"
    );
    Ok(Json(result))
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let Json(request) = payload?;
    let request_id = uuid::Uuid::new_v4().to_string();
    info!(request_id = %request_id, chars = request.question.len(), "Chat question");

    let answer = campus_chat(state.llm.as_ref(), &request.question).await?;
    Ok(Json(AnswerResponse { answer }))
}

async fn ask_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let Json(request) = payload?;
    let request_id = uuid::Uuid::new_v4().to_string();
    info!(request_id = %request_id, chars = request.prompt.len(), "Study question");

    let answer = ask_study_assistant(state.llm.as_ref(), &request.prompt).await?;
    Ok(Json(AnswerResponse { answer }))
}

async fn summarize_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>, AppError> {
    let request_id = uuid::Uuid::new_v4().to_string();

    // Removed when `spool` drops, on every path.
    let spool = spool_pdf_upload(&mut multipart).await?;
    info!(request_id = %request_id, path = %spool.path().display(), "Summarising upload");

    let summary = summarize_pdf(
        &state.extractor,
        state.llm.as_ref(),
        PdfSource::File(spool.path().to_path_buf()),
        state.config.summary_input_chars,
    )
    .await?;

    Ok(Json(SummaryResponse { summary }))
}

/// `true` for `application/pdf`, ignoring parameters and case.
pub fn is_pdf_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/pdf"))
}

fn check_pdf_field(field: &Field<'_>) -> Result<(), AppError> {
    if is_pdf_content_type(field.content_type()) {
        Ok(())
    } else {
        Err(AppError::bad_request("Only PDF files are accepted"))
    }
}

/// Buffer the `file` part in memory.
async fn read_pdf_upload(multipart: &mut Multipart) -> Result<Arc<[u8]>, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        check_pdf_field(&field)?;
        let bytes = field.bytes().await?;
        return Ok(Arc::from(bytes.as_ref()));
    }
    Err(AppError::bad_request("No file provided"))
}

/// Stream the `file` part into a temporary file.
async fn spool_pdf_upload(multipart: &mut Multipart) -> Result<NamedTempFile, AppError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        check_pdf_field(&field)?;

        let mut spool = tempfile::Builder::new()
            .prefix("tut-upload-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| PortalError::Internal(format!("temp file: {e}")))?;
        while let Some(chunk) = field.chunk().await? {
            spool
                .write_all(&chunk)
                .map_err(|e| PortalError::Internal(format!("temp file write: {e}")))?;
        }
        spool
            .flush()
            .map_err(|e| PortalError::Internal(format!("temp file flush: {e}")))?;
        return Ok(spool);
    }
    Err(AppError::bad_request("No file provided"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}
