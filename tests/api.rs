//! Router tests with in-process fakes for the text layer, OCR and model.
//!
//! Each request goes through the real router (`tower::ServiceExt::oneshot`),
//! so routing, multipart parsing and error mapping are all exercised.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tut_portal::pipeline::llm::CompletionRequest;
use tut_portal::{
    router, AppState, DocumentTextExtractor, LanguageModel, OcrService, PdfSource, PortalConfig,
    PortalError, TextLayer, TextLayerError,
};

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Text layer returning the same pages for every document.
#[derive(Default)]
struct FakeLayer {
    pages: Vec<Option<String>>,
    calls: AtomicUsize,
    /// Bytes read back from `PdfSource::File` inputs.
    spooled: Mutex<Vec<Vec<u8>>>,
    /// Paths of `PdfSource::File` inputs.
    paths: Mutex<Vec<PathBuf>>,
}

impl FakeLayer {
    fn last_path(&self) -> PathBuf {
        self.paths.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl TextLayer for FakeLayer {
    async fn page_texts(&self, source: PdfSource) -> Result<Vec<Option<String>>, TextLayerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let PdfSource::File(path) = source {
            let bytes = std::fs::read(&path).map_err(|e| TextLayerError::Open(e.to_string()))?;
            self.spooled.lock().unwrap().push(bytes);
            self.paths.lock().unwrap().push(path);
        }
        Ok(self.pages.clone())
    }
}

#[derive(Default)]
struct FakeOcr {
    text: String,
    calls: AtomicUsize,
}

#[async_trait]
impl OcrService for FakeOcr {
    async fn recognize(&self, _: Arc<[u8]>) -> Result<String, PortalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Model that replays one canned reply and records every request.
struct ScriptedModel {
    reply: Result<String, String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    fn ok(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn failing(body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(body.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last(&self) -> CompletionRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, PortalError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone().map_err(|body| PortalError::Upstream {
            service: "LLM",
            detail: body,
        })
    }
}

struct Harness {
    app: Router,
    layer: Arc<FakeLayer>,
    ocr: Arc<FakeOcr>,
    llm: Arc<ScriptedModel>,
}

fn harness(pages: &[&str], ocr_text: &str, llm: Arc<ScriptedModel>) -> Harness {
    let layer = Arc::new(FakeLayer {
        pages: pages.iter().map(|p| Some(p.to_string())).collect(),
        ..FakeLayer::default()
    });
    let ocr = Arc::new(FakeOcr {
        text: ocr_text.to_string(),
        ..FakeOcr::default()
    });
    let extractor = DocumentTextExtractor::new(layer.clone(), ocr.clone());
    let state = AppState::new(extractor, llm.clone(), PortalConfig::default());
    Harness {
        app: router(state),
        layer,
        ocr,
        llm,
    }
}

// ── Request helpers ──────────────────────────────────────────────────────────

const BOUNDARY: &str = "X-TUT-BOUNDARY";

fn upload(uri: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"notice.pdf\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

const PDF: &[u8] = b"%PDF-1.7\nnotice";

// ── /extract-event ───────────────────────────────────────────────────────────

#[tokio::test]
async fn extract_event_returns_recovered_fields() {
    let h = harness(
        &["Open Day 2025-05-01"],
        "",
        ScriptedModel::ok(r#"Sure! {"title": "Open Day", "date": "2025-05-01"}"#),
    );

    let (status, body) = send(&h.app, upload("/extract-event", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "event": {
                "title": "Open Day",
                "description": "",
                "date": "2025-05-01",
                "time": "",
                "department": ""
            }
        })
    );
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);

    let request = h.llm.last();
    assert_eq!(request.temperature, Some(0.0));
    assert_eq!(request.messages.len(), 1);
    assert!(request.messages[0].content.contains("Open Day 2025-05-01"));
}

#[tokio::test]
async fn extract_event_accepts_single_quoted_output() {
    let h = harness(
        &["Exam timetable"],
        "",
        ScriptedModel::ok("{'title': 'Exam', 'time': '09:00'}"),
    );

    let (status, body) = send(&h.app, upload("/extract-event", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["title"], "Exam");
    assert_eq!(body["event"]["time"], "09:00");
    assert_eq!(body["event"]["department"], "");
}

#[tokio::test]
async fn scanned_pdf_falls_back_to_ocr() {
    let h = harness(
        &["  ", "\n"],
        "Graduation 12 May",
        ScriptedModel::ok(r#"{"title": "Graduation"}"#),
    );

    let (status, _) = send(&h.app, upload("/extract-event", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 1);
    assert!(h.llm.last().messages[0].content.contains("Graduation 12 May"));
}

#[tokio::test]
async fn non_pdf_upload_is_rejected_before_any_call() {
    let h = harness(&["text"], "ocr", ScriptedModel::ok("{}"));

    let (status, body) = send(&h.app, upload("/extract-event", "image/png", PDF)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"detail": "Only PDF files are accepted"}));
    assert_eq!(h.layer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn pdf_content_type_parameters_are_ignored() {
    let h = harness(&["Open Day"], "", ScriptedModel::ok(r#"{"title": "Open Day"}"#));

    let (status, _) = send(
        &h.app,
        upload("/extract-event", "application/pdf; name=notice.pdf", PDF),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_file_part_is_rejected() {
    let h = harness(&["text"], "", ScriptedModel::ok("{}"));
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/extract-event")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&h.app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No file provided");
}

#[tokio::test]
async fn unreadable_pdf_never_reaches_the_model() {
    let h = harness(&[" "], "", ScriptedModel::ok("{}"));

    let (status, body) = send(&h.app, upload("/extract-event", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"detail": "No readable text found in PDF"}));
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn model_failure_surfaces_upstream_body() {
    let upstream = r#"{"error":"model_decommissioned"}"#;
    let h = harness(&["Open Day"], "", ScriptedModel::failing(upstream));

    let (status, body) = send(&h.app, upload("/extract-event", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], format!("LLM request failed: {upstream}"));
    assert_eq!(h.llm.calls(), 1);
}

#[tokio::test]
async fn unparseable_completion_is_a_server_error() {
    let h = harness(
        &["Open Day"],
        "",
        ScriptedModel::ok("I could not find an event in this document."),
    );

    let (status, body) = send(&h.app, upload("/extract-event", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Failed to parse LLM output"), "got: {detail}");
    assert!(detail.contains("strict-json"));
    assert!(detail.contains("permissive-literal"));
}

// ── Assistant routes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_answers_with_campus_prompt() {
    let h = harness(&[], "", ScriptedModel::ok("Registration closes in February."));

    for uri in ["/tut-chat/", "/tut-chat"] {
        let (status, body) = send(
            &h.app,
            post_json(uri, json!({"question": "  When does registration close? "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"answer": "Registration closes in February."}));
    }

    let request = h.llm.last();
    assert_eq!(request.max_tokens, Some(300));
    assert!(request.messages[0].content.contains("Tshwane University of Technology"));
    assert_eq!(request.messages[1].content, "When does registration close?");
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let h = harness(&[], "", ScriptedModel::ok("unused"));

    let (status, body) = send(&h.app, post_json("/tut-chat/", json!({"question": "   "}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Question is required.");
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn ask_uses_study_prompt() {
    let h = harness(&[], "", ScriptedModel::ok("Osmosis is diffusion of water."));

    let (status, body) = send(&h.app, post_json("/llama/ask", json!({"prompt": "Explain osmosis"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Osmosis is diffusion of water.");
    assert_eq!(h.llm.last().max_tokens, Some(400));

    let (status, body) = send(&h.app, post_json("/llama/ask", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Prompt is required.");
}

#[tokio::test]
async fn summarize_spools_upload_and_truncates_material() {
    let long = "a".repeat(5000);
    let h = harness(&[long.as_str()], "unused", ScriptedModel::ok("A summary."));

    let (status, body) = send(&h.app, upload("/llama/summarize-pdf", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"summary": "A summary."}));
    assert_eq!(h.layer.spooled.lock().unwrap().as_slice(), &[PDF.to_vec()]);
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);

    let request = h.llm.last();
    let user = &request.messages[1].content;
    assert!(user.ends_with(&"a".repeat(3000)));
    assert!(!user.contains(&"a".repeat(3001)));
}

#[tokio::test]
async fn summarize_without_text_layer_skips_ocr() {
    let h = harness(&[""], "would have worked", ScriptedModel::ok("unused"));

    let (status, body) = send(&h.app, upload("/llama/summarize-pdf", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No readable text found in PDF");
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.llm.calls(), 0);
}

#[tokio::test]
async fn summarize_removes_spooled_upload_on_success() {
    let h = harness(&["Photosynthesis notes"], "", ScriptedModel::ok("A summary."));

    let (status, _) = send(&h.app, upload("/llama/summarize-pdf", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::OK);
    let path = h.layer.last_path();
    assert!(!path.exists(), "{} was left behind", path.display());
}

#[tokio::test]
async fn summarize_removes_spooled_upload_on_model_failure() {
    let h = harness(
        &["Photosynthesis notes"],
        "",
        ScriptedModel::failing(r#"{"error":"overloaded"}"#),
    );

    let (status, _) = send(&h.app, upload("/llama/summarize-pdf", "application/pdf", PDF)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let path = h.layer.last_path();
    assert!(!path.exists(), "{} was left behind", path.display());
}

#[tokio::test]
async fn malformed_json_body_gets_detail_shape() {
    let h = harness(&[], "", ScriptedModel::ok("unused"));

    for uri in ["/tut-chat/", "/llama/ask"] {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{\"question\": "))
            .unwrap();

        let (status, body) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string(), "got: {body}");
    }
    assert_eq!(h.llm.calls(), 0);
}

// ── Meta ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn root_and_health() {
    let h = harness(&[], "", ScriptedModel::ok("unused"));
    let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let (status, body) = send(&h.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "TUT Resources API is running");

    let (status, body) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
