//! End-to-end pipeline tests over mock providers: no network, no database.

use goldrec_agents::{LlmExecutor, Orchestrator, PromptRegistry};
use goldrec_core::{Confidence, DocType, GoldenRecordDraft, Region, ATTRIBUTE_NAMES};
use goldrec_llm::{CostTracker, MockClient};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;

fn extraction_value() -> Value {
    json!({
        "document_info": {
            "document_type": "TDS",
            "language": "en",
            "manufacturer": "Wacker Chemie AG",
            "brand": "ELASTOSIL",
            "revision_date": "2024-03-11",
            "page_count": 3
        },
        "identity": {
            "product_name": "RT-601",
            "product_line": "ELASTOSIL",
            "wacker_sku": null,
            "material_numbers": [],
            "product_url": null,
            "grade": null
        },
        "chemical": {
            "cas_numbers": {
                "value": "68083-19-2",
                "unit": null,
                "source_section": "Section 3",
                "raw_string": "CAS 68083-19-2",
                "confidence": "high",
                "is_specification": true,
                "test_method": null
            },
            "chemical_components": [],
            "chemical_synonyms": [],
            "purity": null
        },
        "physical": {
            "physical_form": null,
            "density": null,
            "flash_point": null,
            "temperature_range": null,
            "shelf_life": null,
            "cure_system": null
        },
        "application": {
            "main_application": null,
            "usage_restrictions": [],
            "packaging_options": []
        },
        "safety": {
            "ghs_statements": [],
            "un_number": null,
            "certifications": [],
            "global_inventories": [],
            "blocked_countries": [],
            "blocked_industries": []
        },
        "compliance": {"wiaw_status": null, "sales_advisory": null},
        "missing_attributes": [],
        "extraction_warnings": []
    })
}

fn fact(value: &str, section: &str, confidence: &str) -> Value {
    json!({
        "value": value,
        "unit": null,
        "source_section": section,
        "raw_string": value,
        "confidence": confidence,
        "is_specification": false,
        "test_method": null
    })
}

fn orchestrator(responses: Vec<String>) -> (Orchestrator, Arc<CostTracker>) {
    let tracker = Arc::new(CostTracker::new());
    let client = MockClient::new("mock-model").with_responses(responses);
    let executor = LlmExecutor::new(Arc::new(client), tracker.clone()).with_retries(0, 1);
    let orchestrator = Orchestrator::with_executors(
        executor,
        None,
        10,
        4,
        &PromptRegistry::embedded(),
        tracker.clone(),
    );
    (orchestrator, tracker)
}

#[tokio::test]
async fn single_tds_without_audit_yields_global_golden_record() {
    // A clean TDS: two low-confidence fields, no critical field missing.
    let mut extraction = extraction_value();
    extraction["physical"]["density"] = fact("1.02", "TDS Spec Table", "high");
    extraction["physical"]["physical_form"] = fact("liquid", "Typical Properties", "low");
    extraction["physical"]["shelf_life"] = fact("12 months", "Storage", "low");
    extraction["identity"]["grade"] = fact("Technical", "Header", "high");
    extraction["missing_attributes"] = json!(["purity", "un_number"]);

    let classification = json!({
        "doc_type": "TDS",
        "brand": "ELASTOSIL",
        "product_name": "RT-601",
        "confidence": 0.95,
        "reasoning": "specification table present"
    });

    let (orchestrator, tracker) =
        orchestrator(vec![classification.to_string(), extraction.to_string()]);

    let mut partial = orchestrator
        .process_document("## Page 1\n\nELASTOSIL RT-601", "rt601-tds.pdf")
        .await;
    partial.source_file = "/data/ELASTOSIL/RT-601/rt601-tds.pdf".into();

    assert_eq!(partial.doc_type, DocType::Tds);
    assert!(partial.audit_result.is_none(), "audit must not fire");
    assert_eq!(partial.missing_fields.len(), 2);
    // Exactly two LLM calls: classification and extraction.
    assert_eq!(tracker.records().len(), 2);

    let groups = Orchestrator::group_by_product(&[partial]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].product_name, "RT-601");

    let outcomes = Orchestrator::merge_to_golden(&groups);
    let golden = outcomes[0].golden_record.clone().expect("merge succeeds");

    let draft = GoldenRecordDraft::from_merged(
        groups[0].product_name.clone(),
        Some(groups[0].brand.clone()),
        golden,
        vec!["/data/ELASTOSIL/RT-601/rt601-tds.pdf".into()],
    );
    assert_eq!(draft.region, Region::Global);
    assert_eq!(draft.missing_count, 2);
    assert!((draft.completeness - (31.0 / 33.0 * 100.0)).abs() < 1e-9);
}

#[tokio::test]
async fn audit_corrects_hallucinated_un_number() {
    // SDS missing a critical field (flash_point) so the audit fires; the
    // auditor corrects the UN number against the source.
    let mut extraction = extraction_value();
    extraction["document_info"]["document_type"] = json!("SDS");
    extraction["safety"]["un_number"] = fact("UN1203", "Section 14", "high");
    extraction["missing_attributes"] = json!(["flash_point"]);

    let classification = json!({
        "doc_type": "SDS",
        "brand": "ELASTOSIL",
        "product_name": "RT-601",
        "confidence": 0.9,
        "reasoning": "GHS sections"
    });
    let audit = json!({
        "corrections": [{
            "field_name": "safety.un_number",
            "original_value": "UN1203",
            "corrected_value": "UN1863",
            "reason": "Section 14 quotes UN 1863",
            "source_quote": "UN 1863"
        }],
        "overall_confidence": 0.85,
        "flagged_issues": [],
        "pass_audit": true
    });

    let (orchestrator, tracker) = orchestrator(vec![
        classification.to_string(),
        extraction.to_string(),
        audit.to_string(),
    ]);

    let partial = orchestrator
        .process_document("## Page 1\n\nSECTION 14: UN 1863", "rt601-sds.pdf")
        .await;

    assert!(partial.audit_result.is_some());
    let un = partial
        .extraction_result
        .as_ref()
        .unwrap()
        .safety
        .un_number
        .clone()
        .unwrap();
    assert_eq!(un.value_string(), "UN1863");
    assert_eq!(un.confidence, Confidence::Medium);
    assert!(partial
        .warnings
        .contains(&"Audit: 1 corrections applied".to_string()));
    // Classification, extraction, audit.
    assert_eq!(tracker.records().len(), 3);
}

#[tokio::test]
async fn classifier_failure_still_extracts_via_tds_prompt() {
    // Classification returns garbage; the pipeline degrades to unknown and
    // extracts with the generic prompt.
    let mut extraction = extraction_value();
    extraction["document_info"]["document_type"] = json!("unknown");
    extraction["missing_attributes"] =
        json!(ATTRIBUTE_NAMES.iter().take(4).collect::<Vec<_>>());

    let (orchestrator, _) =
        orchestrator(vec!["not json at all".into(), extraction.to_string()]);

    let partial = orchestrator.process_document("text", "mystery.pdf").await;
    assert_eq!(partial.doc_type, DocType::Unknown);
    assert!(partial.is_success());
}

#[tokio::test]
async fn batch_keeps_input_order_and_encodes_failures() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for name in ["b-first.pdf", "a-second.pdf", "c-third.pdf"] {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not a pdf").unwrap();
        paths.push(path);
    }

    let (orchestrator, tracker) = orchestrator(vec![]);
    let partials = orchestrator.process_batch(&paths).await;

    assert_eq!(partials.len(), 3);
    for (partial, path) in partials.iter().zip(&paths) {
        assert_eq!(partial.source_file, path.display().to_string());
        assert!(!partial.is_success());
        assert_eq!(partial.missing_fields.len(), 33);
        assert!(partial.warnings[0].starts_with("PDF parse error:"));
    }
    // Corrupt PDFs never reach an LLM.
    assert!(tracker.records().is_empty());
}

#[tokio::test]
async fn cancelled_batch_stops_dispatching() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late.pdf");
    std::fs::write(&path, b"not a pdf").unwrap();

    let (orchestrator, _) = orchestrator(vec![]);
    orchestrator.cancel();
    let partials = orchestrator.process_batch(&[path]).await;

    assert_eq!(partials.len(), 1);
    assert!(partials[0].warnings[0].contains("cancelled"));
}

#[tokio::test]
async fn full_pipeline_summary_counts_are_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for name in ["one.pdf", "two.pdf"] {
        let path = dir.path().join(name);
        std::fs::write(&path, b"garbage").unwrap();
        paths.push(path);
    }

    let (orchestrator, _) = orchestrator(vec![]);
    let output = orchestrator.run_full_pipeline(&paths).await;

    assert_eq!(output.pipeline_summary.total_pdfs, 2);
    assert_eq!(output.pipeline_summary.failed_extractions, 2);
    assert_eq!(output.pipeline_summary.successful_extractions, 0);
    assert_eq!(output.partials.len(), 2);
    // Failed partials still group by folder; merging an all-failed group
    // yields an error outcome, not a golden record.
    assert_eq!(output.pipeline_summary.golden_records, 0);
    for outcome in &output.golden_records {
        assert!(outcome.golden_record.is_none());
        assert!(outcome.error.is_some());
    }
}
