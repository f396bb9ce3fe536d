//! Inter-agent contracts.
//!
//! The data structures that flow between pipeline stages:
//!
//! - Classifier → Orchestrator: [`ClassificationResult`]
//! - Extractor → Orchestrator: [`PartialExtraction`]
//! - Orchestrator → Merger: [`ProductGroup`]
//! - Auditor → Orchestrator: [`AuditResult`]

use crate::doc_type::DocType;
use crate::schema::{ExtractionResult, ATTRIBUTE_NAMES};
use serde::{Deserialize, Serialize};

/// Output of the classifier: doc-type + brand detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub doc_type: DocType,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    /// 0.0 - 1.0.
    pub confidence: f64,
    pub reasoning: String,
}

impl ClassificationResult {
    /// The resilient fallback: classification never fails the pipeline.
    pub fn unknown(reasoning: impl Into<String>) -> Self {
        Self {
            doc_type: DocType::Unknown,
            brand: None,
            product_name: None,
            confidence: 0.0,
            reasoning: reasoning.into(),
        }
    }
}

/// Output of a single doc-type-specific extraction: the full 33-attribute
/// result (when extraction succeeded) plus processing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialExtraction {
    /// Path or filename of the source PDF.
    pub source_file: String,
    pub doc_type: DocType,
    #[serde(default)]
    pub extraction_result: Option<ExtractionResult>,
    /// Attribute names that were actually populated.
    #[serde(default)]
    pub extracted_fields: Vec<String>,
    /// Attribute names that could not be extracted.
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub audit_result: Option<AuditResult>,
}

impl PartialExtraction {
    pub fn new(source_file: impl Into<String>, doc_type: DocType, result: ExtractionResult) -> Self {
        let missing = result.missing_attributes.clone();
        let extracted = result.extracted_attributes();
        let warnings = result.extraction_warnings.clone();
        Self {
            source_file: source_file.into(),
            doc_type,
            extraction_result: Some(result),
            extracted_fields: extracted,
            missing_fields: missing,
            warnings,
            audit_result: None,
        }
    }

    /// A failed extraction: no result, every attribute missing, and a warning
    /// explaining what went wrong. The batch continues past these.
    pub fn failed(source_file: impl Into<String>, doc_type: DocType, warning: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            doc_type,
            extraction_result: None,
            extracted_fields: vec![],
            missing_fields: ATTRIBUTE_NAMES.iter().map(|s| s.to_string()).collect(),
            warnings: vec![warning.into()],
            audit_result: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.extraction_result.is_some()
    }
}

/// A group of partial extractions for the same product folder, merged by the
/// Truth Hierarchy into one golden record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductGroup {
    pub product_name: String,
    pub product_folder: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub partial_extractions: Vec<PartialExtraction>,
}

/// A single correction proposed by the auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCorrection {
    /// Dotted path, e.g. `safety.un_number`.
    pub field_name: String,
    #[serde(default)]
    pub original_value: Option<String>,
    #[serde(default)]
    pub corrected_value: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub source_quote: Option<String>,
}

/// Output of the quality auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    #[serde(default)]
    pub corrections: Vec<AuditCorrection>,
    /// 0.0 - 1.0 overall quality score.
    pub overall_confidence: f64,
    #[serde(default)]
    pub flagged_issues: Vec<String>,
    pub pass_audit: bool,
}

impl AuditResult {
    /// Audit failures never block the pipeline: the fallback result passes
    /// with an explanatory flagged issue.
    pub fn pass_through(issue: impl Into<String>) -> Self {
        Self {
            corrections: vec![],
            overall_confidence: 0.5,
            flagged_issues: vec![issue.into()],
            pass_audit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_partial_lists_all_attributes_missing() {
        let partial = PartialExtraction::failed("a.pdf", DocType::Unknown, "PDF parse error: bad xref");
        assert!(!partial.is_success());
        assert_eq!(partial.missing_fields.len(), 33);
        assert!(partial.extracted_fields.is_empty());
        assert_eq!(partial.warnings.len(), 1);
    }

    #[test]
    fn unknown_classification_has_zero_confidence() {
        let cls = ClassificationResult::unknown("Classification error: timeout");
        assert_eq!(cls.doc_type, DocType::Unknown);
        assert_eq!(cls.confidence, 0.0);
    }

    #[test]
    fn audit_pass_through_never_blocks() {
        let audit = AuditResult::pass_through("Audit error: provider 500");
        assert!(audit.pass_audit);
        assert!(audit.corrections.is_empty());
    }
}
