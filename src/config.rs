//! Configuration for the portal's delegated services.
//!
//! Every knob lives in [`PortalConfig`], resolved once at process start and
//! handed to each client's constructor. Nothing below reads the environment
//! at call time, so tests can point clients at a mock server with fake keys.
//!
//! Secrets are never validated eagerly: a missing `GROQ_API_KEY` produces a
//! config with `llm_api_key: None`, and every LLM call then fails at the
//! upstream authentication stage.

use crate::error::PortalError;
use std::fmt;

/// Default chat-completions endpoint (OpenAI-compatible).
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
/// Default OCR endpoint.
pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";

/// Environment variable holding the LLM bearer token.
pub const ENV_LLM_API_KEY: &str = "GROQ_API_KEY";
/// Environment variable holding the OCR service key.
pub const ENV_OCR_API_KEY: &str = "OCRSPACE_API_KEY";
/// Environment variable holding the optional database connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Configuration for the portal.
///
/// Built via [`PortalConfig::builder()`], [`PortalConfig::from_env()`] or
/// [`PortalConfig::default()`].
///
/// # Example
/// ```rust
/// use tut_portal::PortalConfig;
///
/// let config = PortalConfig::builder()
///     .llm_api_key("gsk-test")
///     .llm_timeout_secs(20)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "llama-3.1-8b-instant");
/// ```
#[derive(Clone)]
pub struct PortalConfig {
    /// Bearer token for the completion service. `None` is sent as an empty token.
    pub llm_api_key: Option<String>,

    /// Chat-completions URL. Default: [`DEFAULT_LLM_ENDPOINT`].
    pub llm_endpoint: String,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Per-call LLM timeout in seconds. Default: 30.
    pub llm_timeout_secs: u64,

    /// API key for the OCR service.
    pub ocr_api_key: Option<String>,

    /// OCR upload URL. Default: [`DEFAULT_OCR_ENDPOINT`].
    pub ocr_endpoint: String,

    /// Language hint sent to OCR. Default: `eng`.
    pub ocr_language: String,

    /// Per-call OCR timeout in seconds. Default: 60.
    ///
    /// Scanned multi-page PDFs take noticeably longer than a chat completion.
    pub ocr_timeout_secs: u64,

    /// Database connection string. Carried for the wider application; this
    /// crate never opens a connection.
    pub database_url: Option<String>,

    /// Maximum accepted upload size in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Characters of extracted text sent for summarisation. Default: 3000.
    pub summary_input_chars: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            llm_api_key: None,
            llm_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            llm_timeout_secs: 30,
            ocr_api_key: None,
            ocr_endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            ocr_language: "eng".to_string(),
            ocr_timeout_secs: 60,
            database_url: None,
            max_upload_bytes: 20 * 1024 * 1024,
            summary_input_chars: 3000,
        }
    }
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("llm_endpoint", &self.llm_endpoint)
            .field("model", &self.model)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("ocr_api_key", &redact(&self.ocr_api_key))
            .field("ocr_endpoint", &self.ocr_endpoint)
            .field("ocr_language", &self.ocr_language)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("summary_input_chars", &self.summary_input_chars)
            .finish()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

impl PortalConfig {
    /// Create a new builder for `PortalConfig`.
    pub fn builder() -> PortalConfigBuilder {
        PortalConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve secrets and the database URL from the process environment.
    ///
    /// Everything else keeps its default; chain [`PortalConfig::to_builder`]
    /// to override further.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PortalConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            llm_api_key: non_empty(ENV_LLM_API_KEY),
            ocr_api_key: non_empty(ENV_OCR_API_KEY),
            database_url: non_empty(ENV_DATABASE_URL),
            ..Self::default()
        }
    }

    /// Turn an existing config back into a builder.
    pub fn to_builder(self) -> PortalConfigBuilder {
        PortalConfigBuilder { config: self }
    }
}

/// Builder for [`PortalConfig`].
#[derive(Debug)]
pub struct PortalConfigBuilder {
    config: PortalConfig,
}

impl PortalConfigBuilder {
    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.llm_api_key = Some(key.into());
        self
    }

    pub fn llm_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.llm_endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn llm_timeout_secs(mut self, secs: u64) -> Self {
        self.config.llm_timeout_secs = secs;
        self
    }

    pub fn ocr_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ocr_api_key = Some(key.into());
        self
    }

    pub fn ocr_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_endpoint = url.into();
        self
    }

    pub fn ocr_language(mut self, language: impl Into<String>) -> Self {
        self.config.ocr_language = language.into();
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn summary_input_chars(mut self, n: usize) -> Self {
        self.config.summary_input_chars = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PortalConfig, PortalError> {
        let c = &self.config;
        if c.llm_timeout_secs == 0 || c.ocr_timeout_secs == 0 {
            return Err(PortalError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        for (name, url) in [("LLM", &c.llm_endpoint), ("OCR", &c.ocr_endpoint)] {
            reqwest::Url::parse(url).map_err(|e| {
                PortalError::InvalidConfig(format!("{name} endpoint '{url}' is not a URL: {e}"))
            })?;
        }
        if c.model.trim().is_empty() {
            return Err(PortalError::InvalidConfig("Model must not be empty".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(PortalError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}
