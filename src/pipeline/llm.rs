//! Remote language-model client (OpenAI-compatible chat completions).
//!
//! One request per call: no streaming, no retry, no backoff. A non-success
//! status becomes [`PortalError::Upstream`] carrying the response body
//! verbatim so operators can see exactly what the provider said.
//!
//! The [`LanguageModel`] trait is the seam handlers depend on; prompt text
//! lives in [`crate::prompts`].

use crate::config::PortalConfig;
use crate::error::PortalError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

const SERVICE: &str = "LLM";

/// Chat role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Generation parameters. Unset fields are omitted from the request body.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn temperature(t: f32) -> Self {
        Self {
            temperature: Some(t),
            max_tokens: None,
        }
    }

    pub fn max_tokens(n: u32) -> Self {
        Self {
            temperature: None,
            max_tokens: Some(n),
        }
    }
}

/// Wire body of a chat-completion request. Built fresh for every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Build a system+user (or user-only) request.
    pub fn new(
        model: impl Into<String>,
        system_prompt: Option<&str>,
        user_prompt: &str,
        options: GenerationOptions,
    ) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(user_prompt));

        Self {
            model: model.into(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull `choices[0].message.content`, trimmed, out of a completion body.
pub fn first_choice_content(body: &str) -> Result<String, PortalError> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| PortalError::Upstream {
            service: SERVICE,
            detail: format!("malformed completion response: {e}"),
        })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| PortalError::Upstream {
            service: SERVICE,
            detail: "malformed completion response: no choices[0].message.content".into(),
        })
}

/// A remote completion service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier placed in each request.
    fn model(&self) -> &str;

    /// Send one request and return the raw (trimmed) completion text.
    async fn send(&self, request: &CompletionRequest) -> Result<String, PortalError>;

    /// Build a request from prompts and send it.
    async fn complete(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
        options: GenerationOptions,
    ) -> Result<String, PortalError> {
        let request = CompletionRequest::new(self.model(), system_prompt, user_prompt, options);
        self.send(&request).await
    }
}

/// [`LanguageModel`] over HTTP with bearer-token auth.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl ChatCompletionClient {
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm_timeout_secs))
            .build()
            .map_err(|e| PortalError::Internal(format!("LLM client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.llm_endpoint.clone(),
            api_key: config.llm_api_key.clone().unwrap_or_default(),
            model: config.model.clone(),
            timeout_secs: config.llm_timeout_secs,
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, PortalError> {
        let start = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PortalError::from_transport(SERVICE, self.timeout_secs, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortalError::from_transport(SERVICE, self.timeout_secs, e))?;

        if !status.is_success() {
            debug!("LLM returned HTTP {} after {:?}", status, start.elapsed());
            return Err(PortalError::Upstream {
                service: SERVICE,
                detail: body,
            });
        }

        let content = first_choice_content(&body)?;
        debug!(
            "LLM completion: {} chars in {:?}",
            content.len(),
            start.elapsed()
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_with_system_prompt_has_two_turns() {
        let req = CompletionRequest::new(
            "llama-3.1-8b-instant",
            Some("be brief"),
            "hi",
            GenerationOptions::max_tokens(300),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 300);
        assert!(json.get("temperature").is_none(), "unset params are omitted");
    }

    #[test]
    fn user_only_request_with_zero_temperature() {
        let req = CompletionRequest::new("m", None, "extract", GenerationOptions::temperature(0.0));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["temperature"], 0.0);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn first_choice_is_trimmed() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello \n"}},
                       {"message":{"content":"second"}}]}"#;
        assert_eq!(first_choice_content(body).unwrap(), "Hello");
    }

    #[test]
    fn missing_choices_is_upstream_failure() {
        let err = first_choice_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, PortalError::Upstream { service: "LLM", .. }));
        assert!(first_choice_content("<html>").is_err());
    }
}
