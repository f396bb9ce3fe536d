//! Google Gemini adapter.
//!
//! The system prompt rides as a `system_instruction`; JSON mode is requested
//! via `responseMimeType`. Explicit context caching is only worthwhile above
//! roughly 32k prompt tokens, which extraction prompts never reach, so the
//! adapter relies on the provider's implicit caching and reports
//! `cachedContentTokenCount` as cache reads.

use crate::client::{
    transport_error, LlmClient, LlmError, LlmRequest, LlmResponse, LlmResult, DEFAULT_TIMEOUT_SECS,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::info;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_ms: u64,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client"),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        self
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider_id(&self) -> &str {
        "google"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn call(&self, request: LlmRequest) -> LlmResult<LlmResponse> {
        let start = Instant::now();

        let mut generation_config = json!({ "temperature": request.temperature });
        if request.response_json {
            generation_config["responseMimeType"] = json!("application/json");
        }

        let body = json!({
            "system_instruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.user_content }] }],
            "generationConfig": generation_config,
        });

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if status == 429 {
            return Err(LlmError::RateLimited { retry_after_ms: 1000 });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.timeout_ms))?;

        let content = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing candidate text".into()))?
            .to_string();

        let usage = &json["usageMetadata"];
        let input_tokens = usage["promptTokenCount"].as_u64().unwrap_or(0);
        let output_tokens = usage["candidatesTokenCount"].as_u64().unwrap_or(0);
        let cache_read_tokens = usage["cachedContentTokenCount"].as_u64().unwrap_or(0);

        info!(
            model = %self.model,
            file = %request.file_name,
            input_tokens,
            output_tokens,
            duration_ms,
            "Gemini call"
        );

        Ok(LlmResponse {
            content,
            input_tokens,
            output_tokens,
            cache_creation_tokens: 0,
            cache_read_tokens,
            duration_ms,
            provider: "google".into(),
            model: self.model.clone(),
        })
    }
}
