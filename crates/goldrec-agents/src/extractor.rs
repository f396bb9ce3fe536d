//! Doc-type-specific extractor pool.
//!
//! Five focused extractors share one executor implementation and differ only
//! in prompt content: a tagged [`ExtractorKind`] selects the template, not a
//! class hierarchy. Unknown documents take the TDS prompt, the most generic
//! of the five.
//!
//! With a cascade configured, the cheap primary provider runs first and the
//! quality fallback only fires when the primary misses more attributes than
//! the threshold. Both calls are billed; the losing side is tagged
//! `cascade_triggered` on its token record.

use crate::error::{AgentError, AgentResult};
use crate::executor::{parse_json_response, LlmExecutor};
use crate::prompts::PromptRegistry;
use goldrec_core::{sanitize_extraction_json, DocType, ExtractionResult, PartialExtraction};
use goldrec_llm::{LlmError, LlmRequest, LlmResponse};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorKind {
    Tds,
    Sds,
    Rpi,
    CoA,
    Brochure,
}

impl ExtractorKind {
    pub const ALL: [ExtractorKind; 5] = [
        ExtractorKind::Tds,
        ExtractorKind::Sds,
        ExtractorKind::Rpi,
        ExtractorKind::CoA,
        ExtractorKind::Brochure,
    ];

    /// Select the extractor for a classified document. Unknown falls back
    /// to the TDS extractor.
    pub fn for_doc_type(doc_type: DocType) -> ExtractorKind {
        match doc_type {
            DocType::Sds => ExtractorKind::Sds,
            DocType::Rpi => ExtractorKind::Rpi,
            DocType::CoA => ExtractorKind::CoA,
            DocType::Brochure => ExtractorKind::Brochure,
            DocType::Tds | DocType::Unknown => ExtractorKind::Tds,
        }
    }

    pub fn agent_name(self) -> &'static str {
        match self {
            ExtractorKind::Tds => "TDS-Extractor",
            ExtractorKind::Sds => "SDS-Extractor",
            ExtractorKind::Rpi => "RPI-Extractor",
            ExtractorKind::CoA => "CoA-Extractor",
            ExtractorKind::Brochure => "Brochure-Extractor",
        }
    }
}

pub struct DocExtractor {
    kind: ExtractorKind,
    system_prompt: String,
    primary: LlmExecutor,
    fallback: Option<(LlmExecutor, usize)>,
}

impl DocExtractor {
    pub fn new(kind: ExtractorKind, prompts: &PromptRegistry, primary: LlmExecutor) -> Self {
        Self {
            kind,
            system_prompt: prompts.extractor_system_prompt(kind),
            primary,
            fallback: None,
        }
    }

    /// Enable the cascade: `fallback` runs when the primary's missing
    /// attribute count exceeds `threshold`.
    pub fn with_cascade(mut self, fallback: LlmExecutor, threshold: usize) -> Self {
        self.fallback = Some((fallback, threshold));
        self
    }

    /// Extract structured data from a document.
    ///
    /// Never raises: provider and schema failures produce a failed
    /// [`PartialExtraction`] with all 33 attributes missing and an
    /// explanatory warning.
    pub async fn extract(
        &self,
        markdown: &str,
        doc_type: DocType,
        file_name: &str,
    ) -> PartialExtraction {
        let user_content = format!(
            "Extract all chemical product data from this {doc_type} document.\n\n---\n\n{markdown}"
        );
        let request = LlmRequest::new(&self.system_prompt, user_content)
            .with_attribution(file_name, doc_type.as_str());

        let (outcome, response) = match self.attempt(&self.primary, request.clone()).await {
            Ok(pair) => pair,
            Err(e) => {
                error!(agent = self.kind.agent_name(), file = file_name, error = %e, "extraction failed");
                return PartialExtraction::failed(file_name, doc_type, format!("Extraction error: {e}"));
            }
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                // The call itself succeeded, so the tokens are billed even
                // though the payload did not survive validation.
                self.primary.record(&response, file_name, doc_type.as_str(), false);
                error!(agent = self.kind.agent_name(), file = file_name, error = %e, "extraction failed");
                return PartialExtraction::failed(file_name, doc_type, format!("Extraction error: {e}"));
            }
        };

        let primary_missing = result.missing_attributes.len();
        if let Some((fallback, threshold)) = &self.fallback {
            if primary_missing > *threshold {
                info!(
                    file = file_name,
                    primary_missing,
                    threshold,
                    fallback = %fallback.full_id(),
                    "cascade: fallback triggered"
                );
                return self
                    .run_fallback(fallback, request, result, response, doc_type, file_name)
                    .await;
            }
        }

        self.primary.record(&response, file_name, doc_type.as_str(), false);
        self.finish(file_name, doc_type, result)
    }

    async fn run_fallback(
        &self,
        fallback: &LlmExecutor,
        request: LlmRequest,
        primary_result: ExtractionResult,
        primary_response: LlmResponse,
        doc_type: DocType,
        file_name: &str,
    ) -> PartialExtraction {
        let doc_code = doc_type.as_str();
        let primary_missing = primary_result.missing_attributes.len();

        match self.attempt(fallback, request).await {
            Ok((Ok(fallback_result), fallback_response)) => {
                let fallback_missing = fallback_result.missing_attributes.len();
                // Strictly fewer missing attributes wins; ties keep the
                // primary result.
                if fallback_missing < primary_missing {
                    info!(file = file_name, primary_missing, fallback_missing, "cascade: fallback result wins");
                    self.primary.record(&primary_response, file_name, doc_code, true);
                    fallback.record(&fallback_response, file_name, doc_code, false);
                    self.finish(file_name, doc_type, fallback_result)
                } else {
                    info!(file = file_name, primary_missing, fallback_missing, "cascade: fallback did not improve, keeping primary");
                    fallback.record(&fallback_response, file_name, doc_code, true);
                    self.primary.record(&primary_response, file_name, doc_code, false);
                    self.finish(file_name, doc_type, primary_result)
                }
            }
            Ok((Err(e), fallback_response)) => {
                warn!(file = file_name, error = %e, "cascade: fallback result invalid, keeping primary");
                fallback.record(&fallback_response, file_name, doc_code, true);
                self.primary.record(&primary_response, file_name, doc_code, false);
                let mut partial = self.finish(file_name, doc_type, primary_result);
                partial
                    .warnings
                    .push(format!("Cascade fallback to {} failed: {e}", fallback.provider_id()));
                partial
            }
            Err(e) => {
                warn!(file = file_name, error = %e, "cascade: fallback call failed, keeping primary");
                self.primary.record(&primary_response, file_name, doc_code, false);
                let mut partial = self.finish(file_name, doc_type, primary_result);
                partial
                    .warnings
                    .push(format!("Cascade fallback to {} failed: {e}", fallback.provider_id()));
                partial
            }
        }
    }

    /// One provider round: the outer error means the call itself failed (no
    /// usage to bill); the inner result carries sanitisation + validation.
    async fn attempt(
        &self,
        executor: &LlmExecutor,
        request: LlmRequest,
    ) -> Result<(AgentResult<ExtractionResult>, LlmResponse), LlmError> {
        let response = executor.call_unbilled(request).await?;
        let outcome = parse_json_response(&response.content)
            .map(sanitize_extraction_json)
            .and_then(|value| ExtractionResult::from_json(value).map_err(AgentError::from));
        Ok((outcome, response))
    }

    fn finish(&self, file_name: &str, doc_type: DocType, result: ExtractionResult) -> PartialExtraction {
        let partial = PartialExtraction::new(file_name, doc_type, result);
        info!(
            agent = self.kind.agent_name(),
            file = file_name,
            doc_type = %doc_type,
            extracted = partial.extracted_fields.len(),
            missing = partial.missing_fields.len(),
            "extraction complete"
        );
        partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldrec_core::ATTRIBUTE_NAMES;
    use goldrec_llm::{CostTracker, MockClient};
    use serde_json::json;
    use std::sync::Arc;

    /// A valid full-schema response with the given number of attributes
    /// reported missing.
    fn extraction_json(missing_count: usize) -> String {
        let missing: Vec<&str> = ATTRIBUTE_NAMES.iter().copied().take(missing_count).collect();
        json!({
            "document_info": {"document_type": "TDS", "language": "en", "manufacturer": null, "brand": "ELASTOSIL", "revision_date": null, "page_count": 3},
            "identity": {"product_name": "RT-601", "product_line": null, "wacker_sku": null, "material_numbers": [], "product_url": null, "grade": null},
            "chemical": {"cas_numbers": {"value": "68083-19-2", "unit": null, "source_section": "Section 3", "raw_string": "68083-19-2", "confidence": "high", "is_specification": true, "test_method": null}, "chemical_components": [], "chemical_synonyms": [], "purity": null},
            "physical": {"physical_form": null, "density": null, "flash_point": null, "temperature_range": null, "shelf_life": null, "cure_system": null},
            "application": {"main_application": null, "usage_restrictions": [], "packaging_options": []},
            "safety": {"ghs_statements": [], "un_number": null, "certifications": [], "global_inventories": [], "blocked_countries": [], "blocked_industries": []},
            "compliance": {"wiaw_status": null, "sales_advisory": null},
            "missing_attributes": missing,
            "extraction_warnings": []
        })
        .to_string()
    }

    fn executor(client: MockClient, tracker: &Arc<CostTracker>) -> LlmExecutor {
        LlmExecutor::new(Arc::new(client), tracker.clone()).with_retries(0, 1)
    }

    #[tokio::test]
    async fn successful_extraction_builds_partial() {
        let tracker = Arc::new(CostTracker::new());
        let primary = executor(
            MockClient::new("primary-model").with_responses([extraction_json(2)]),
            &tracker,
        );
        let extractor = DocExtractor::new(ExtractorKind::Tds, &PromptRegistry::embedded(), primary);

        let partial = extractor.extract("## Page 1\n\nRT-601", DocType::Tds, "rt601-tds.pdf").await;
        assert!(partial.is_success());
        assert_eq!(partial.missing_fields.len(), 2);
        assert_eq!(partial.extracted_fields.len(), 31);
        let records = tracker.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].cascade_triggered);
    }

    #[tokio::test]
    async fn invalid_payload_is_a_failed_partial_with_billing() {
        let tracker = Arc::new(CostTracker::new());
        let primary = executor(
            MockClient::new("primary-model").with_responses([r#"{"not": "the schema"}"#]),
            &tracker,
        );
        let extractor = DocExtractor::new(ExtractorKind::Sds, &PromptRegistry::embedded(), primary);

        let partial = extractor.extract("text", DocType::Sds, "x.pdf").await;
        assert!(!partial.is_success());
        assert_eq!(partial.missing_fields.len(), 33);
        assert!(partial.warnings[0].starts_with("Extraction error:"));
        assert_eq!(tracker.records().len(), 1);
    }

    #[tokio::test]
    async fn provider_failure_is_a_failed_partial_without_billing() {
        let tracker = Arc::new(CostTracker::new());
        let primary = executor(MockClient::new("primary-model").then_fail("boom"), &tracker);
        let extractor = DocExtractor::new(ExtractorKind::Tds, &PromptRegistry::embedded(), primary);

        let partial = extractor.extract("text", DocType::Tds, "x.pdf").await;
        assert!(!partial.is_success());
        assert!(tracker.records().is_empty());
    }

    #[tokio::test]
    async fn cascade_emits_fallback_when_it_misses_less() {
        let tracker = Arc::new(CostTracker::new());
        let primary = executor(
            MockClient::new("primary-model").with_responses([extraction_json(15)]),
            &tracker,
        );
        let fallback = executor(
            MockClient::new("fallback-model").with_responses([extraction_json(6)]),
            &tracker,
        );
        let extractor = DocExtractor::new(ExtractorKind::Tds, &PromptRegistry::embedded(), primary)
            .with_cascade(fallback, 10);

        let partial = extractor.extract("text", DocType::Tds, "x.pdf").await;
        assert_eq!(partial.missing_fields.len(), 6);

        let records = tracker.records();
        assert_eq!(records.len(), 2);
        let primary_rec = records.iter().find(|r| r.model == "primary-model").unwrap();
        let fallback_rec = records.iter().find(|r| r.model == "fallback-model").unwrap();
        assert!(primary_rec.cascade_triggered);
        assert!(!fallback_rec.cascade_triggered);
    }

    #[tokio::test]
    async fn cascade_keeps_primary_on_tie() {
        let tracker = Arc::new(CostTracker::new());
        let primary = executor(
            MockClient::new("primary-model").with_responses([extraction_json(12)]),
            &tracker,
        );
        let fallback = executor(
            MockClient::new("fallback-model").with_responses([extraction_json(12)]),
            &tracker,
        );
        let extractor = DocExtractor::new(ExtractorKind::Tds, &PromptRegistry::embedded(), primary)
            .with_cascade(fallback, 10);

        let partial = extractor.extract("text", DocType::Tds, "x.pdf").await;
        assert_eq!(partial.missing_fields.len(), 12);

        let records = tracker.records();
        let primary_rec = records.iter().find(|r| r.model == "primary-model").unwrap();
        let fallback_rec = records.iter().find(|r| r.model == "fallback-model").unwrap();
        assert!(!primary_rec.cascade_triggered);
        assert!(fallback_rec.cascade_triggered);
    }

    #[tokio::test]
    async fn cascade_below_threshold_never_calls_fallback() {
        let tracker = Arc::new(CostTracker::new());
        let primary = executor(
            MockClient::new("primary-model").with_responses([extraction_json(3)]),
            &tracker,
        );
        let fallback = executor(MockClient::new("fallback-model"), &tracker);
        let extractor = DocExtractor::new(ExtractorKind::Tds, &PromptRegistry::embedded(), primary)
            .with_cascade(fallback, 10);

        let partial = extractor.extract("text", DocType::Tds, "x.pdf").await;
        assert_eq!(partial.missing_fields.len(), 3);
        assert_eq!(tracker.records().len(), 1);
    }

    #[tokio::test]
    async fn fallback_failure_keeps_primary_with_warning() {
        let tracker = Arc::new(CostTracker::new());
        let primary = executor(
            MockClient::new("primary-model").with_responses([extraction_json(15)]),
            &tracker,
        );
        let fallback = executor(MockClient::new("fallback-model").then_fail("quota"), &tracker);
        let extractor = DocExtractor::new(ExtractorKind::Tds, &PromptRegistry::embedded(), primary)
            .with_cascade(fallback, 10);

        let partial = extractor.extract("text", DocType::Tds, "x.pdf").await;
        assert!(partial.is_success());
        assert_eq!(partial.missing_fields.len(), 15);
        assert!(partial.warnings.iter().any(|w| w.starts_with("Cascade fallback to")));
        assert_eq!(tracker.records().len(), 1);
    }

    #[test]
    fn unknown_doc_type_uses_the_tds_extractor() {
        assert_eq!(ExtractorKind::for_doc_type(DocType::Unknown), ExtractorKind::Tds);
    }
}
