//! Scripted provider for tests; no network I/O.

use crate::client::{LlmClient, LlmError, LlmRequest, LlmResponse, LlmResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Scripted {
    Respond(String),
    Fail(String),
}

/// Mock provider that pops scripted responses in order. When the script is
/// exhausted it returns an empty JSON object, so open-ended pipelines keep
/// running. Token counts are estimated at four characters per token.
pub struct MockClient {
    model: String,
    script: Mutex<VecDeque<Scripted>>,
    latency_ms: u64,
}

impl MockClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Mutex::new(VecDeque::new()),
            latency_ms: 1,
        }
    }

    pub fn with_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut script = self.script.lock().unwrap();
            for response in responses {
                script.push_back(Scripted::Respond(response.into()));
            }
        }
        self
    }

    /// Queue a failure; the next call errors instead of responding.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Fail(message.into()));
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

#[async_trait]
impl LlmClient for MockClient {
    fn provider_id(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn call(&self, request: LlmRequest) -> LlmResult<LlmResponse> {
        tokio::time::sleep(tokio::time::Duration::from_millis(self.latency_ms)).await;

        let next = self.script.lock().unwrap().pop_front();
        let content = match next {
            Some(Scripted::Respond(text)) => text,
            Some(Scripted::Fail(message)) => {
                return Err(LlmError::Api { status: 500, message });
            }
            None => "{}".to_string(),
        };

        let input_tokens =
            ((request.system_prompt.len() + request.user_content.len()) / 4) as u64;
        let output_tokens = (content.len() / 4) as u64;

        Ok(LlmResponse {
            content,
            input_tokens,
            output_tokens,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
            duration_ms: self.latency_ms,
            provider: "mock".into(),
            model: self.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pops_scripted_responses_in_order() {
        let client = MockClient::new("mock-model").with_responses(["first", "second"]);
        let req = LlmRequest::new("system", "user");
        assert_eq!(client.call(req.clone()).await.unwrap().content, "first");
        assert_eq!(client.call(req.clone()).await.unwrap().content, "second");
        assert_eq!(client.call(req).await.unwrap().content, "{}");
    }

    #[tokio::test]
    async fn scripted_failure_errors() {
        let client = MockClient::new("mock-model").then_fail("boom");
        let err = client.call(LlmRequest::new("s", "u")).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 500, .. }));
    }
}
