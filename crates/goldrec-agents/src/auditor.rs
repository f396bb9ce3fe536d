//! Conditional quality audit.
//!
//! Not every PDF gets audited. The trigger looks for weak extractions:
//! several low-confidence facts, missing doc-type-critical fields, piles of
//! warnings, or values whose format smells hallucinated. Only then is the
//! auditor LLM invoked with the extraction and a truncated copy of the
//! source to cross-check against.
//!
//! The heuristic only decides whether to invoke the auditor; the audit
//! prompt is the sole arbiter of whether anything gets corrected. Audit
//! failures never block the pipeline.

use crate::error::AgentResult;
use crate::executor::{truncate_chars, LlmExecutor};
use crate::prompts::PromptRegistry;
use goldrec_core::{
    AuditCorrection, AuditResult, Confidence, DocType, ExtractionResult, PartialExtraction,
};
use goldrec_llm::LlmRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{error, info};

/// Max source chars sent to the auditor, to control token cost.
const MAX_SOURCE_CHARS: usize = 8000;

static CAS_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2,7}-\d{2}-\d$").unwrap());
static UN_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(UN\s?)?\d{4}$").unwrap());
static GHS_FORMAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[HPE]\d{3}").unwrap());

/// Fields whose absence triggers an audit, per document type.
fn critical_fields(doc_type: DocType) -> &'static [&'static str] {
    match doc_type {
        DocType::Sds => &["cas_numbers", "ghs_statements", "un_number", "flash_point"],
        DocType::Rpi => &["cas_numbers", "global_inventories", "certifications"],
        DocType::Tds => &["density", "grade", "physical_form"],
        DocType::CoA => &["cas_numbers", "purity"],
        DocType::Brochure | DocType::Unknown => &[],
    }
}

/// Decide whether a partial extraction needs auditing, with the reasons.
pub fn should_audit(partial: &PartialExtraction, doc_type: DocType) -> (bool, Vec<String>) {
    let Some(result) = partial.extraction_result.as_ref() else {
        // Nothing to audit when the extraction failed outright.
        return (false, vec![]);
    };

    let mut reasons: Vec<String> = Vec::new();

    let low_confidence = result
        .fact_fields()
        .iter()
        .filter(|(_, fact)| fact.confidence == Confidence::Low)
        .count();
    if low_confidence >= 3 {
        reasons.push(format!("{low_confidence} low-confidence fields"));
    }

    let missing_critical: Vec<&str> = critical_fields(doc_type)
        .iter()
        .copied()
        .filter(|field| partial.missing_fields.iter().any(|m| m == field))
        .collect();
    if !missing_critical.is_empty() {
        reasons.push(format!(
            "missing critical fields: {}",
            missing_critical.join(", ")
        ));
    }

    if partial.warnings.len() >= 3 {
        reasons.push(format!("{} extraction warnings", partial.warnings.len()));
    }

    reasons.extend(hallucination_flags(result));

    (!reasons.is_empty(), reasons)
}

/// Format checks for values LLMs are known to invent.
fn hallucination_flags(result: &ExtractionResult) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();

    let cas = result.chemical.cas_numbers.value_string();
    if !cas.is_empty() {
        for part in cas.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if !CAS_FORMAT.is_match(part) {
                flags.push(format!("suspicious CAS format: '{part}'"));
            }
        }
    }

    if let Some(un) = result.safety.un_number.as_ref() {
        let un_val = un.value_string().trim().to_uppercase();
        if !un_val.is_empty() && !UN_FORMAT.is_match(&un_val) {
            flags.push(format!("suspicious UN number: '{un_val}'"));
        }
    }

    for stmt in result.safety.ghs_statements.iter().take(5) {
        let s = stmt.trim();
        if !s.is_empty() && !GHS_FORMAT.is_match(s) {
            flags.push(format!("suspicious GHS format: '{s}'"));
            break;
        }
    }

    flags
}

pub struct Auditor {
    executor: LlmExecutor,
    system_prompt: String,
}

impl Auditor {
    pub fn new(executor: LlmExecutor, prompts: &PromptRegistry) -> Self {
        Self {
            executor,
            system_prompt: prompts.auditor().to_string(),
        }
    }

    /// Audit an extraction against its source document.
    ///
    /// Any failure returns a passing no-op result so the pipeline never
    /// blocks on the audit stage.
    pub async fn audit(
        &self,
        markdown: &str,
        partial: &PartialExtraction,
        doc_type: DocType,
        file_name: &str,
    ) -> AuditResult {
        let mut source_text = truncate_chars(markdown, MAX_SOURCE_CHARS).to_string();
        if markdown.chars().count() > MAX_SOURCE_CHARS {
            source_text.push_str(&format!(
                "\n\n[... truncated, {} total chars ...]",
                markdown.chars().count()
            ));
        }

        let extraction_json = partial
            .extraction_result
            .as_ref()
            .and_then(|r| serde_json::to_string_pretty(r).ok())
            .unwrap_or_else(|| "{}".into());

        let user_content = format!(
            "## Document Type: {doc_type}\n## File: {file_name}\n\n\
             ## Extracted Data\n```json\n{extraction_json}\n```\n\n\
             ## Source Document\n---\n{source_text}\n---\n\n\
             Cross-check the extracted data against the source document. \
             Report any errors, mismatches, or hallucinated values."
        );

        let request = LlmRequest::new(&self.system_prompt, user_content)
            .with_attribution(file_name, doc_type.as_str());

        match self.call(request).await {
            Ok(audit) => {
                info!(
                    file = file_name,
                    doc_type = %doc_type,
                    corrections = audit.corrections.len(),
                    confidence = audit.overall_confidence,
                    pass_audit = audit.pass_audit,
                    flagged = audit.flagged_issues.len(),
                    "audit complete"
                );
                audit
            }
            Err(e) => {
                error!(file = file_name, doc_type = %doc_type, error = %e, "audit failed");
                AuditResult::pass_through(format!("Audit error: {e}"))
            }
        }
    }

    async fn call(&self, request: LlmRequest) -> AgentResult<AuditResult> {
        let raw = self.executor.call_json(request).await?;
        Ok(parse_audit_response(&raw))
    }
}

/// Lenient parse of the auditor's JSON: models occasionally wrap values in
/// fact objects or drop optional keys.
fn parse_audit_response(raw: &Value) -> AuditResult {
    let corrections = raw["corrections"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|c| AuditCorrection {
                    field_name: c["field_name"].as_str().unwrap_or("unknown").to_string(),
                    original_value: lenient_string(&c["original_value"]),
                    corrected_value: lenient_string(&c["corrected_value"]),
                    reason: c["reason"].as_str().unwrap_or_default().to_string(),
                    source_quote: c["source_quote"].as_str().map(String::from),
                })
                .collect()
        })
        .unwrap_or_default();

    AuditResult {
        corrections,
        overall_confidence: raw["overall_confidence"].as_f64().unwrap_or(0.5),
        flagged_issues: raw["flagged_issues"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        pass_audit: raw["pass_audit"].as_bool().unwrap_or(true),
    }
}

fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => match map.get("value") {
            Some(Value::Null) | None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        },
        other => Some(other.to_string()),
    }
}

const SECTION_SEARCH_ORDER: [&str; 7] = [
    "identity",
    "chemical",
    "physical",
    "application",
    "safety",
    "compliance",
    "document_info",
];

fn find_section_for_field(tree: &Value, field: &str) -> Option<String> {
    SECTION_SEARCH_ORDER
        .iter()
        .find(|section| {
            tree.get(**section)
                .and_then(Value::as_object)
                .is_some_and(|map| map.contains_key(field))
        })
        .map(|s| s.to_string())
}

/// Apply audit corrections to a partial extraction.
///
/// A correction is applied only when its dotted path resolves to an existing
/// field and the corrected value is non-null; Fact fields keep their
/// provenance but have `value` replaced and confidence downgraded to medium.
/// Null corrections become review warnings instead of silent removals.
pub fn apply_corrections(mut partial: PartialExtraction, audit: &AuditResult) -> PartialExtraction {
    if audit.corrections.is_empty() {
        return partial;
    }
    let Some(result) = partial.extraction_result.as_ref() else {
        return partial;
    };
    let Ok(mut tree) = serde_json::to_value(result) else {
        return partial;
    };

    let mut applied = 0usize;
    for correction in &audit.corrections {
        let (section_key, field_key) = match correction.field_name.split_once('.') {
            Some((section, field)) => (section.to_string(), field.to_string()),
            None => {
                let field = correction.field_name.clone();
                match find_section_for_field(&tree, &field) {
                    Some(section) => (section, field),
                    None => continue,
                }
            }
        };

        let Some(section) = tree.get_mut(&section_key).and_then(Value::as_object_mut) else {
            continue;
        };
        if !section.contains_key(&field_key) {
            continue;
        }

        let Some(new_value) = correction.corrected_value.clone() else {
            partial.warnings.push(format!(
                "{} may be incorrect: {}",
                correction.field_name, correction.reason
            ));
            continue;
        };

        match section.get_mut(&field_key) {
            Some(Value::Object(fact)) if fact.contains_key("value") => {
                fact.insert("value".into(), Value::String(new_value));
                fact.insert("confidence".into(), Value::String("medium".into()));
                applied += 1;
            }
            Some(Value::String(_)) => {
                section.insert(field_key.clone(), Value::String(new_value));
                applied += 1;
            }
            _ => {}
        }
    }

    if applied > 0 {
        match ExtractionResult::from_json(tree) {
            Ok(updated) => {
                partial.extraction_result = Some(updated);
                partial.warnings.push(format!("Audit: {applied} corrections applied"));
            }
            Err(e) => {
                partial
                    .warnings
                    .push(format!("Audit corrections rejected: {e}"));
            }
        }
    }

    partial
}
