//! LLM client abstraction.

use async_trait::async_trait;
use thiserror::Error;

/// Per-call timeout applied by every adapter unless overridden.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Missing API key for provider: {0}")]
    MissingApiKey(String),
}

pub type LlmResult<T> = Result<T, LlmError>;

/// One LLM call: system prompt, user content, and attribution metadata that
/// flows through to the cost tracker.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub user_content: String,
    /// Ask the provider for JSON-mode output where supported.
    pub response_json: bool,
    /// Source file being processed, for cost attribution.
    pub file_name: String,
    /// Document type (or stage name) being processed, for cost attribution.
    pub doc_type: String,
    pub temperature: f32,
}

impl LlmRequest {
    pub fn new(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_content: user_content.into(),
            response_json: true,
            file_name: String::new(),
            doc_type: String::new(),
            temperature: 0.0,
        }
    }

    pub fn with_attribution(mut self, file_name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self.doc_type = doc_type.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn plain_text(mut self) -> Self {
        self.response_json = false;
        self
    }
}

/// Raw provider response plus token accounting.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub duration_ms: u64,
    pub provider: String,
    pub model: String,
}

/// Narrow provider interface: exactly one operation.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider identifier (e.g. "google", "anthropic").
    fn provider_id(&self) -> &str;

    /// Model identifier (e.g. "gemini-2.5-flash").
    fn model_id(&self) -> &str;

    /// Execute one call.
    async fn call(&self, request: LlmRequest) -> LlmResult<LlmResponse>;

    /// Full identifier (provider/model).
    fn full_id(&self) -> String {
        format!("{}/{}", self.provider_id(), self.model_id())
    }
}

/// Map a transport failure onto the error taxonomy, surfacing timeouts.
pub(crate) fn transport_error(err: reqwest::Error, timeout_ms: u64) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout { timeout_ms }
    } else {
        LlmError::Http(err)
    }
}
