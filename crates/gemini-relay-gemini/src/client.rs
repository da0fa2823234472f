//! Gemini streaming completion client.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use gemini_relay_core::{ChunkStream, CompletionProvider, ProviderError};

use crate::{
    sse::{api_error, decode_stream},
    types::{ApiError, ErrorResponse, GenerateContentRequest},
};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Settings for [`GeminiProvider`].
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// Model name, e.g. `gemini-pro`.
    pub model: String,
    /// Scheme and host of the API, without a trailing path.
    pub base_url: String,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Longest allowed gap between streamed events.
    pub idle_timeout: Duration,
}

impl GeminiConfig {
    /// Create a config with default model, endpoint and timeouts.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(120),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// URL of the streaming endpoint for the configured model.
    #[must_use]
    pub fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("connect_timeout", &self.connect_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

/// Streaming provider backed by the Gemini REST API.
///
/// Built once at startup and shared read-only by all connections.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a provider.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ProviderError::Request(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn stream(&self, prompt: &str) -> Result<ChunkStream, ProviderError> {
        tracing::debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Opening Gemini stream"
        );

        let request = self
            .http
            .post(self.config.stream_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&GenerateContentRequest::user_text(prompt))
            .send();

        // Response headers get the same budget as each SSE event.
        let response = tokio::time::timeout(self.config.idle_timeout, request)
            .await
            .map_err(|_| {
                tracing::warn!(model = %self.config.model, "Gemini sent no response headers in time");
                ProviderError::IdleTimeout(self.config.idle_timeout)
            })?
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = tokio::time::timeout(self.config.idle_timeout, response.text())
                .await
                .ok()
                .and_then(Result::ok)
                .unwrap_or_default();
            let error = error_from_body(status.as_u16(), &body, status.canonical_reason());
            tracing::warn!(status = status.as_u16(), "Gemini request rejected: {error}");
            return Err(error);
        }

        Ok(decode_stream(
            response.bytes_stream(),
            self.config.idle_timeout,
        ))
    }
}

/// Build an error from a non-2xx response body.
fn error_from_body(status: u16, body: &str, reason: Option<&str>) -> ProviderError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => api_error(status, &parsed.error),
        Err(_) => {
            let message = if body.trim().is_empty() {
                reason.unwrap_or("unknown error").to_string()
            } else {
                body.trim().to_string()
            };
            api_error(
                status,
                &ApiError {
                    code: Some(status),
                    message,
                    status: None,
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_url() {
        let config = GeminiConfig::new("k")
            .with_model("gemini-1.5-flash")
            .with_base_url("http://localhost:9000/");
        assert_eq!(
            config.stream_url(),
            "http://localhost:9000/v1beta/models/gemini-1.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", GeminiConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("gemini-pro"));
    }

    #[test]
    fn test_error_from_json_body() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        let error = error_from_body(400, body, Some("Bad Request"));
        assert_eq!(
            error.to_string(),
            "API error (400): INVALID_ARGUMENT: API key not valid."
        );
    }

    #[test]
    fn test_error_from_plain_body() {
        let error = error_from_body(502, "", Some("Bad Gateway"));
        assert_eq!(error.to_string(), "API error (502): Bad Gateway");
    }
}
