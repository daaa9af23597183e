//! Remote OCR fallback (OCR.space-compatible API).
//!
//! Only reached when the local text layer is empty or unreadable. One
//! multipart POST per document, no retries: a failed attempt is final.

use crate::config::PortalConfig;
use crate::error::PortalError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE: &str = "OCR";

/// Recognises text in a whole document.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Text of the document; `Ok("")` when the service found nothing.
    async fn recognize(&self, pdf: Arc<[u8]>) -> Result<String, PortalError>;
}

/// Response body of the OCR service. Only the fields we read are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OcrResponse {
    #[serde(rename = "IsErroredOnProcessing", default)]
    pub is_errored: bool,

    #[serde(rename = "ParsedResults", default)]
    pub parsed_results: Option<Vec<ParsedResult>>,

    /// String or list of strings, depending on the failure.
    #[serde(rename = "ErrorMessage", default)]
    pub error_message: Option<serde_json::Value>,
}

/// One recognised page (or document).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    pub parsed_text: Option<String>,
}

impl OcrResponse {
    /// Text of the first parsed result, `""` on an error flag or no results.
    pub fn first_text(&self) -> String {
        if self.is_errored {
            return String::new();
        }
        self.parsed_results
            .as_deref()
            .and_then(|results| results.first())
            .and_then(|r| r.parsed_text.clone())
            .unwrap_or_default()
    }

    fn error_summary(&self) -> String {
        match &self.error_message {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; "),
            Some(other) => other.to_string(),
            None => "no error message".to_string(),
        }
    }
}

/// [`OcrService`] speaking the OCR.space multipart protocol.
#[derive(Debug, Clone)]
pub struct OcrSpaceClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: String,
    timeout_secs: u64,
}

impl OcrSpaceClient {
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()
            .map_err(|e| PortalError::Internal(format!("OCR client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.ocr_endpoint.clone(),
            api_key: config.ocr_api_key.clone().unwrap_or_default(),
            language: config.ocr_language.clone(),
            timeout_secs: config.ocr_timeout_secs,
        })
    }
}

#[async_trait]
impl OcrService for OcrSpaceClient {
    async fn recognize(&self, pdf: Arc<[u8]>) -> Result<String, PortalError> {
        let file = Part::bytes(pdf.to_vec())
            .file_name("upload.pdf")
            .mime_str("application/pdf")
            .map_err(|e| PortalError::Internal(format!("OCR form: {e}")))?;

        let form = Form::new()
            .text("apikey", self.api_key.clone())
            .text("language", self.language.clone())
            .part("file", file);

        debug!("Submitting {} bytes to OCR", pdf.len());

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortalError::from_transport(SERVICE, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<body unreadable: {e}>"));
            return Err(PortalError::Upstream {
                service: SERVICE,
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: OcrResponse = response
            .json()
            .await
            .map_err(|e| PortalError::from_transport(SERVICE, self.timeout_secs, e))?;

        if parsed.is_errored {
            warn!("OCR reported a processing error: {}", parsed.error_summary());
        }
        Ok(parsed.first_text())
    }
}
