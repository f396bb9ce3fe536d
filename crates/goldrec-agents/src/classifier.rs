//! Document classifier: LLM doc-type + brand detection.
//!
//! Replaces the keyword heuristics as the authoritative classification; the
//! heuristics remain only as the parser's cheap guess. A single compact call
//! over the first ~2 pages plus the filename.

use crate::executor::{truncate_chars, LlmExecutor};
use crate::prompts::PromptRegistry;
use goldrec_core::ClassificationResult;
use goldrec_llm::LlmRequest;
use tracing::{error, info};

/// Chars of markdown sent to the classifier, roughly the first two pages.
const MAX_CONTENT_CHARS: usize = 4000;

pub struct Classifier {
    executor: LlmExecutor,
    system_prompt: String,
}

impl Classifier {
    pub fn new(executor: LlmExecutor, prompts: &PromptRegistry) -> Self {
        Self {
            executor,
            system_prompt: prompts.classifier().to_string(),
        }
    }

    /// Classify a document by type and brand.
    ///
    /// Never fails: any error degrades to `doc_type: unknown` with zero
    /// confidence, and the pipeline carries on.
    pub async fn classify(&self, markdown: &str, file_name: &str) -> ClassificationResult {
        let content_sample = truncate_chars(markdown, MAX_CONTENT_CHARS);
        let user_content = format!(
            "Filename: {file_name}\n\n--- Document Content (first 2 pages) ---\n\n{content_sample}"
        );

        let request = LlmRequest::new(&self.system_prompt, user_content)
            .with_attribution(file_name, "classification");

        match self.call(request).await {
            Ok(classification) => {
                info!(
                    file = file_name,
                    doc_type = %classification.doc_type,
                    brand = classification.brand.as_deref().unwrap_or("-"),
                    confidence = classification.confidence,
                    "document classified"
                );
                classification
            }
            Err(e) => {
                error!(file = file_name, error = %e, "classification failed, falling back to unknown");
                ClassificationResult::unknown(format!("Classification error: {e}"))
            }
        }
    }

    async fn call(&self, request: LlmRequest) -> crate::error::AgentResult<ClassificationResult> {
        let value = self.executor.call_json(request).await?;
        Ok(serde_json::from_value(value)?)
    }
}
