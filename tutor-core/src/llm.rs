//! Chat-completion client for assistant replies.
//!
//! Provides an `LlmBackend` trait with a Gemini `generateContent`
//! implementation. The system instruction built by the composer travels in
//! `systemInstruction`; the student's message is the single user turn.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::config::LlmConfig;

// ============================================================================
// LlmBackend trait
// ============================================================================

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub message: String,
    /// 0.0..=1.0
    pub temperature: f32,
}

impl GenerationRequest {
    /// Map an assistant creativity level (0..=100) onto sampling temperature.
    pub fn temperature_for_level(level: u8) -> f32 {
        (level.min(100) as f32) / 100.0
    }
}

/// Abstraction over LLM providers.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate the assistant's raw reply text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Response contained no candidate text")]
    EmptyResponse,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("All {attempts} attempts failed: {last_error}")]
    RetryExhausted { attempts: usize, last_error: String },

    #[error("Unsupported LLM backend '{0}'")]
    UnsupportedBackend(String),
}

// ============================================================================
// Config types
// ============================================================================

/// Gemini chat client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_output_tokens: u32,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl GeminiConfig {
    /// Build from the `[llm]` section. Falls back to `GEMINI_API_KEY`, then
    /// `GOOGLE_API_KEY`, when no key is passed.
    pub fn from_llm_config(config: &LlmConfig, api_key: Option<String>) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
            max_output_tokens: config.max_output_tokens,
            max_retries: config.max_retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

/// Create the configured backend.
pub fn create_backend(config: &LlmConfig) -> Result<Box<dyn LlmBackend>, LlmError> {
    match config.backend.as_str() {
        "gemini" => Ok(Box::new(GeminiChatClient::new(GeminiConfig::from_llm_config(
            config, None,
        ))?)),
        other => Err(LlmError::UnsupportedBackend(other.to_string())),
    }
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiChatClient
// ============================================================================

/// Gemini chat client: calls the `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiChatClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiChatClient {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { client, config })
    }

    /// Create a client with a custom base URL (for testing / proxies)
    pub fn with_base_url(mut config: GeminiConfig, base_url: String) -> Result<Self, LlmError> {
        config.base_url = base_url.trim_end_matches('/').to_string();
        Self::new(config)
    }

    async fn generate_once(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system_instruction.clone(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.message.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::error!(code = code, message = %message, "Gemini API error");

            return Err(LlmError::Api { code, message });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl LlmBackend for GeminiChatClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        if self.config.max_retries == 0 {
            return self.generate_once(request).await;
        }

        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let attempts = self.config.max_retries + 1;

        match Retry::start(retry_strategy, || self.generate_once(request)).await {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::error!(
                    attempts = attempts,
                    error = %e,
                    "All generation attempts failed"
                );
                Err(LlmError::RetryExhausted {
                    attempts,
                    last_error: e.to_string(),
                })
            }
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str, max_retries: usize) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "http://unused".to_string(),
            request_timeout: Duration::from_secs(5),
            max_output_tokens: 256,
            max_retries,
            retry_delay_ms: 10,
        }
    }

    fn reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] }
            }]
        })
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_instruction: "Você é Prof. Ana.".to_string(),
            message: "O que é uma célula?".to_string(),
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn test_generate_sends_instruction_and_returns_text() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiChatClient::with_base_url(test_config("test-key", 0), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "systemInstruction": { "parts": [{ "text": "Você é Prof. Ana." }] },
                "contents": [{ "role": "user", "parts": [{ "text": "O que é uma célula?" }] }],
                "generationConfig": { "maxOutputTokens": 256 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("A unidade básica da vida.")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let text = client.generate(&request()).await.unwrap();
        assert_eq!(text, "A unidade básica da vida.");
    }

    #[tokio::test]
    async fn test_generate_joins_multiple_parts() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiChatClient::with_base_url(test_config("test-key", 0), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Parte 1. " }, { "text": "Parte 2." }] }
                }]
            })))
            .mount(&mock_server)
            .await;

        assert_eq!(client.generate(&request()).await.unwrap(), "Parte 1. Parte 2.");
    }

    #[tokio::test]
    async fn test_api_error_is_not_retried_by_default() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiChatClient::with_base_url(test_config("test-key", 0), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": { "code": 500, "message": "Internal server error" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.generate(&request()).await {
            Err(LlmError::Api { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "Internal server error");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retries_when_configured() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiChatClient::with_base_url(test_config("test-key", 2), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Rate limit exceeded" }
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
            .mount(&mock_server)
            .await;

        assert_eq!(client.generate(&request()).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_retry_exhausted_reports_attempts() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiChatClient::with_base_url(test_config("test-key", 2), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(3)
            .mount(&mock_server)
            .await;

        match client.generate(&request()).await {
            Err(LlmError::RetryExhausted { attempts, last_error }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("503"));
            }
            other => panic!("Expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_is_an_error() {
        let mock_server = MockServer::start().await;
        let client =
            GeminiChatClient::with_base_url(test_config("test-key", 0), mock_server.uri()).unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })))
            .mount(&mock_server)
            .await;

        assert!(matches!(client.generate(&request()).await, Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_missing_api_key() {
        assert!(matches!(
            GeminiChatClient::new(test_config("", 0)),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[test]
    fn test_unsupported_backend() {
        let config = LlmConfig {
            backend: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_backend(&config),
            Err(LlmError::UnsupportedBackend(_))
        ));
    }

    #[test]
    fn test_temperature_for_level() {
        assert_eq!(GenerationRequest::temperature_for_level(0), 0.0);
        assert_eq!(GenerationRequest::temperature_for_level(50), 0.5);
        assert_eq!(GenerationRequest::temperature_for_level(200), 1.0);
    }
}
