//! Anthropic Claude adapter, direct API or Vertex AI.
//!
//! On the direct API the system prompt block carries an ephemeral
//! `cache_control` directive so repeated extractor prompts hit the prompt
//! cache; Vertex does not accept the block form, so the system prompt is
//! passed as a plain string there.

use crate::client::{
    transport_error, LlmClient, LlmError, LlmRequest, LlmResponse, LlmResult, DEFAULT_TIMEOUT_SECS,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::info;

const DIRECT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const VERTEX_API_VERSION: &str = "vertex-2023-10-16";
const MAX_TOKENS: u32 = 8192;

enum Auth {
    Direct { api_key: String },
    Vertex {
        project_id: String,
        region: String,
        access_token: String,
    },
}

pub struct AnthropicClient {
    client: reqwest::Client,
    model: String,
    auth: Auth,
    base_url: String,
    timeout_ms: u64,
}

impl AnthropicClient {
    /// Direct Anthropic API client.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client"),
            model: model.into(),
            auth: Auth::Direct { api_key: api_key.into() },
            base_url: DIRECT_BASE_URL.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Claude via Google Cloud Vertex AI. The caller supplies a short-lived
    /// OAuth access token minted from the service-account credentials.
    pub fn vertex(
        project_id: impl Into<String>,
        region: impl Into<String>,
        access_token: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
        let region = region.into();
        let base_url = format!("https://{region}-aiplatform.googleapis.com/v1");
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client"),
            model: model.into(),
            auth: Auth::Vertex {
                project_id: project_id.into(),
                region,
                access_token: access_token.into(),
            },
            base_url,
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

    fn endpoint(&self) -> String {
        match &self.auth {
            Auth::Direct { .. } => format!("{}/messages", self.base_url),
            Auth::Vertex { project_id, region, .. } => format!(
                "{}/projects/{}/locations/{}/publishers/anthropic/models/{}:rawPredict",
                self.base_url, project_id, region, self.model
            ),
        }
    }

    fn body(&self, request: &LlmRequest) -> Value {
        match &self.auth {
            Auth::Direct { .. } => json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "temperature": request.temperature,
                "system": [{
                    "type": "text",
                    "text": request.system_prompt,
                    "cache_control": { "type": "ephemeral" },
                }],
                "messages": [{ "role": "user", "content": request.user_content }],
            }),
            Auth::Vertex { .. } => json!({
                "anthropic_version": VERTEX_API_VERSION,
                "max_tokens": MAX_TOKENS,
                "temperature": request.temperature,
                "system": request.system_prompt,
                "messages": [{ "role": "user", "content": request.user_content }],
            }),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn call(&self, request: LlmRequest) -> LlmResult<LlmResponse> {
        let start = Instant::now();
        let body = self.body(&request);

        let mut builder = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json");
        builder = match &self.auth {
            Auth::Direct { api_key } => builder
                .header("x-api-key", api_key)
                .header("anthropic-version", API_VERSION),
            Auth::Vertex { access_token, .. } => {
                builder.header("Authorization", format!("Bearer {access_token}"))
            }
        };

        let response = builder
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

        let content = json["content"][0]["text"]
            .as_str()
            .ok_or_else(|| LlmError::InvalidResponse("missing content block".into()))?
            .to_string();

        let usage = &json["usage"];
        let input_tokens = usage["input_tokens"].as_u64().unwrap_or(0);
        let output_tokens = usage["output_tokens"].as_u64().unwrap_or(0);
        let cache_creation_tokens = usage["cache_creation_input_tokens"].as_u64().unwrap_or(0);
        let cache_read_tokens = usage["cache_read_input_tokens"].as_u64().unwrap_or(0);

        info!(
            model = %self.model,
            file = %request.file_name,
            input_tokens,
            output_tokens,
            cache_created = cache_creation_tokens,
            cache_read = cache_read_tokens,
            duration_ms,
            "Anthropic call"
        );

        Ok(LlmResponse {
            content,
            input_tokens,
            output_tokens,
            cache_creation_tokens,
            cache_read_tokens,
            duration_ms,
            provider: "anthropic".into(),
            model: self.model.clone(),
        })
    }
}
