//! Shared LLM call plumbing: client construction, retries, cost billing,
//! and JSON parsing. Every agent drives its provider through an
//! [`LlmExecutor`].

use crate::config::Settings;
use crate::error::{AgentError, AgentResult};
use goldrec_core::strip_code_fences;
use goldrec_llm::{
    AnthropicClient, CostTracker, GeminiClient, LlmClient, LlmError, LlmRequest, LlmResponse,
    TokenRecord,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Build a provider client from settings.
///
/// Clients are created once per orchestrator and shared; a missing API key
/// for the requested provider is a configuration error.
pub fn build_client(
    settings: &Settings,
    provider: &str,
    model: &str,
) -> AgentResult<Arc<dyn LlmClient>> {
    match provider {
        "google" => {
            if settings.gemini_api_key.is_empty() {
                return Err(AgentError::Config("GEMINI_API_KEY is not set".into()));
            }
            Ok(Arc::new(GeminiClient::new(settings.gemini_api_key.clone(), model)))
        }
        "anthropic" => {
            if !settings.vertex_project_id.is_empty() {
                if settings.vertex_access_token.is_empty() {
                    return Err(AgentError::Config(
                        "VERTEX_ACCESS_TOKEN is required for Claude via Vertex AI".into(),
                    ));
                }
                Ok(Arc::new(AnthropicClient::vertex(
                    settings.vertex_project_id.clone(),
                    settings.vertex_location.clone(),
                    settings.vertex_access_token.clone(),
                    model,
                )))
            } else {
                if settings.anthropic_api_key.is_empty() {
                    return Err(AgentError::Config("ANTHROPIC_API_KEY is not set".into()));
                }
                Ok(Arc::new(AnthropicClient::new(
                    settings.anthropic_api_key.clone(),
                    model,
                )))
            }
        }
        other => Err(AgentError::Config(format!("unsupported provider: {other}"))),
    }
}

fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::RateLimited { .. } | LlmError::Timeout { .. } | LlmError::Http(_) => true,
        LlmError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Parse an LLM response body as JSON, stripping code fences first.
pub fn parse_json_response(raw: &str) -> AgentResult<Value> {
    Ok(serde_json::from_str(&strip_code_fences(raw))?)
}

/// Truncate to a number of chars without splitting a codepoint.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// One provider client plus the retry policy and cost tracker it bills to.
#[derive(Clone)]
pub struct LlmExecutor {
    client: Arc<dyn LlmClient>,
    tracker: Arc<CostTracker>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl LlmExecutor {
    pub fn new(client: Arc<dyn LlmClient>, tracker: Arc<CostTracker>) -> Self {
        Self {
            client,
            tracker,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn provider_id(&self) -> &str {
        self.client.provider_id()
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    pub fn full_id(&self) -> String {
        self.client.full_id()
    }

    async fn call_with_retry(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut attempt = 0u32;
        loop {
            match self.client.call(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(error) if attempt < self.max_retries && is_retryable(&error) => {
                    attempt += 1;
                    warn!(
                        provider = self.client.provider_id(),
                        file = %request.file_name,
                        attempt,
                        max = self.max_retries,
                        error = %error,
                        "provider error, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(
                        self.retry_delay_ms * attempt as u64,
                    ))
                    .await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Call the provider, bill the usage, parse the JSON payload.
    pub async fn call_json(&self, request: LlmRequest) -> AgentResult<Value> {
        let file_name = request.file_name.clone();
        let doc_type = request.doc_type.clone();
        let response = self.call_with_retry(request).await?;
        self.record(&response, &file_name, &doc_type, false);
        parse_json_response(&response.content)
    }

    /// Call without billing; cascade callers tag winner and loser after the
    /// decision and record both sides themselves.
    pub async fn call_unbilled(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.call_with_retry(request).await
    }

    pub fn record(&self, response: &LlmResponse, file_name: &str, doc_type: &str, cascade: bool) {
        self.tracker.record(
            TokenRecord::from_response(response)
                .with_attribution(file_name, doc_type)
                .cascade(cascade),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldrec_llm::MockClient;

    fn executor(client: MockClient) -> (LlmExecutor, Arc<CostTracker>) {
        let tracker = Arc::new(CostTracker::new());
        (
            LlmExecutor::new(Arc::new(client), tracker.clone()).with_retries(2, 1),
            tracker,
        )
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let client = MockClient::new("mock-model")
            .then_fail("upstream 500")
            .with_responses([r#"{"ok": true}"#]);
        let (exec, tracker) = executor(client);
        let value = exec.call_json(LlmRequest::new("s", "u")).await.unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(tracker.records().len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let client = MockClient::new("mock-model")
            .then_fail("one")
            .then_fail("two")
            .then_fail("three");
        let (exec, tracker) = executor(client);
        let err = exec.call_json(LlmRequest::new("s", "u")).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
        assert!(tracker.records().is_empty());
    }

    #[tokio::test]
    async fn fenced_json_is_parsed() {
        let client =
            MockClient::new("mock-model").with_responses(["```json\n{\"a\": 1}\n```"]);
        let (exec, _) = executor(client);
        let value = exec.call_json(LlmRequest::new("s", "u")).await.unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let settings = Settings::default();
        assert!(build_client(&settings, "google", "gemini-2.5-flash").is_err());
        assert!(build_client(&settings, "banana", "x").is_err());
    }
}
