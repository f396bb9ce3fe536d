//! Truth-Hierarchy merge of partial extractions into one golden record.
//!
//! Purely programmatic, no LLM calls. Strategy:
//!
//! - Scalar fields: value from the highest-priority source wins.
//! - Union fields (certifications, inventories, ...): combined from all
//!   sources by set-union.
//! - Conflicting Fact values: keep the higher-priority value and record a
//!   warning naming both.
//! - `missing_attributes`: an attribute is missing from the golden record
//!   only when every contributing source missed it.

use crate::contracts::{PartialExtraction, ProductGroup};
use crate::doc_type::DocType;
use crate::error::CoreError;
use crate::fields::{is_plain_string, is_plain_string_list, is_single_fact, is_union_merge};
use crate::schema::{ExtractionResult, SECTION_NAMES};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Merge a product group into a single golden record.
///
/// A group with a single partial short-circuits: its extraction result is
/// returned unchanged.
pub fn merge_group(group: &ProductGroup) -> Result<ExtractionResult, CoreError> {
    let partials = &group.partial_extractions;

    if partials.is_empty() {
        return Err(CoreError::EmptyGroup(group.product_name.clone()));
    }

    if partials.len() == 1 {
        debug!(product = %group.product_name, doc_type = %partials[0].doc_type, "single partial, no merge needed");
        return partials[0].extraction_result.clone().ok_or_else(|| CoreError::InvalidMerge {
            product: group.product_name.clone(),
            message: "the only partial extraction carries no result".into(),
        });
    }

    // Descending priority; stable sort keeps input order within a level.
    let mut sorted: Vec<&PartialExtraction> = partials.iter().collect();
    sorted.sort_by_key(|p| std::cmp::Reverse(p.doc_type.priority()));

    let mut merged = match sorted[0].extraction_result.as_ref() {
        Some(result) => serde_json::to_value(result)?,
        None => Value::Object(Map::new()),
    };
    let mut merge_warnings: Vec<String> = Vec::new();

    for partial in &sorted[1..] {
        let Some(source) = partial.extraction_result.as_ref() else {
            continue;
        };
        let source_value = serde_json::to_value(source)?;
        for section in SECTION_NAMES {
            merge_section(&mut merged, &source_value, section, partial.doc_type, &mut merge_warnings);
        }
    }

    // Missing only when missing from every source.
    let mut missing: BTreeSet<String> = sorted[0].missing_fields.iter().cloned().collect();
    for partial in &sorted[1..] {
        let other: HashSet<&String> = partial.missing_fields.iter().collect();
        missing.retain(|field| other.contains(field));
    }

    // Warnings from every source plus merge conflicts, deduplicated.
    let mut warnings: BTreeSet<String> = BTreeSet::new();
    for partial in &sorted {
        warnings.extend(partial.warnings.iter().cloned());
    }
    warnings.extend(merge_warnings);

    if let Some(obj) = merged.as_object_mut() {
        obj.insert(
            "missing_attributes".into(),
            Value::Array(missing.iter().map(|s| Value::String(s.clone())).collect()),
        );
        obj.insert(
            "extraction_warnings".into(),
            Value::Array(warnings.iter().map(|s| Value::String(s.clone())).collect()),
        );
    }

    info!(
        product = %group.product_name,
        sources = sorted.len(),
        missing = missing.len(),
        warnings = warnings.len(),
        "golden record merged"
    );

    ExtractionResult::from_json(merged).map_err(|e| CoreError::InvalidMerge {
        product: group.product_name.clone(),
        message: e.to_string(),
    })
}

enum FactAction {
    Fill,
    Conflict(String, String),
    Keep,
}

fn merge_section(
    target: &mut Value,
    source: &Value,
    section: &str,
    source_type: DocType,
    warnings: &mut Vec<String>,
) {
    let Some(source_section) = source.get(section).and_then(Value::as_object) else {
        return;
    };
    let Some(target_obj) = target.as_object_mut() else {
        return;
    };
    let target_section = target_obj
        .entry(section.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(target_map) = target_section.as_object_mut() else {
        return;
    };

    for (key, source_val) in source_section {
        if source_val.is_null() {
            continue;
        }

        // Union-merge fields: combine lists from all sources.
        if is_union_merge(key) {
            if let Value::Array(source_items) = source_val {
                match target_map.get_mut(key) {
                    Some(Value::Array(target_items)) => {
                        let mut existing: HashSet<String> =
                            target_items.iter().map(value_key).collect();
                        for item in source_items {
                            let k = value_key(item);
                            if !existing.contains(&k) {
                                target_items.push(item.clone());
                                existing.insert(k);
                            }
                        }
                    }
                    Some(Value::Null) | None => {
                        target_map.insert(key.clone(), source_val.clone());
                    }
                    _ => {}
                }
            }
            continue;
        }

        // Plain strings: fill only when the base is empty.
        if is_plain_string(key) {
            let empty = match target_map.get(key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                _ => false,
            };
            if empty {
                target_map.insert(key.clone(), source_val.clone());
            }
            continue;
        }

        // Plain string lists: replace only when the base is empty.
        if is_plain_string_list(key) {
            let empty = match target_map.get(key) {
                None | Some(Value::Null) => true,
                Some(Value::Array(items)) => items.is_empty(),
                _ => false,
            };
            let source_populated = source_val.as_array().is_some_and(|a| !a.is_empty());
            if empty && source_populated {
                target_map.insert(key.clone(), source_val.clone());
            }
            continue;
        }

        // Single Facts and cas_numbers: fill nulls, flag value conflicts.
        if is_single_fact(key) || key == "cas_numbers" {
            let action = match target_map.get(key) {
                None | Some(Value::Null) => FactAction::Fill,
                Some(Value::Object(target_fact)) => match source_val.as_object() {
                    Some(source_fact) => {
                        match (fact_value_string(target_fact), fact_value_string(source_fact)) {
                            (Some(t), Some(s)) if t != s => FactAction::Conflict(t, s),
                            _ => FactAction::Keep,
                        }
                    }
                    None => FactAction::Keep,
                },
                _ => FactAction::Keep,
            };
            match action {
                FactAction::Fill => {
                    target_map.insert(key.clone(), source_val.clone());
                }
                FactAction::Conflict(kept, discarded) => {
                    warnings.push(format!(
                        "Conflict in {section}.{key}: keeping '{kept}' (higher priority), discarding '{discarded}' from {source_type}"
                    ));
                }
                FactAction::Keep => {}
            }
            continue;
        }

        // Anything else: fill nulls only.
        if matches!(target_map.get(key), None | Some(Value::Null)) {
            target_map.insert(key.clone(), source_val.clone());
        }
    }
}

/// String identity used for set-union membership.
fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The populated value of a Fact object, `None` when null or empty.
fn fact_value_string(fact: &Map<String, Value>) -> Option<String> {
    match fact.get("value") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ATTRIBUTE_NAMES;
    use serde_json::json;

    fn result_json(doc_type: &str, product: &str) -> Value {
        json!({
            "document_info": {
                "document_type": doc_type,
                "language": "en",
                "manufacturer": null,
                "brand": null,
                "revision_date": null,
                "page_count": 2
            },
            "identity": {
                "product_name": product,
                "product_line": null,
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
                    "raw_string": "68083-19-2",
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

    fn partial(doc_type: DocType, mut value: Value, missing: &[&str]) -> PartialExtraction {
        value["missing_attributes"] = json!(missing);
        let result = ExtractionResult::from_json(value).unwrap();
        let mut partial = PartialExtraction::new(format!("{}.pdf", doc_type), doc_type, result);
        partial.missing_fields = missing.iter().map(|s| s.to_string()).collect();
        partial
    }

    fn group(partials: Vec<PartialExtraction>) -> ProductGroup {
        ProductGroup {
            product_name: "RT-601".into(),
            product_folder: "/data/ELASTOSIL/RT-601".into(),
            brand: "ELASTOSIL".into(),
            partial_extractions: partials,
        }
    }

    fn density(value: &str, section: &str) -> Value {
        json!({
            "value": value,
            "unit": "g/cm³",
            "source_section": section,
            "raw_string": format!("{value} g/cm³"),
            "confidence": "high",
            "is_specification": true,
            "test_method": null
        })
    }

    #[test]
    fn empty_group_is_an_error() {
        assert!(merge_group(&group(vec![])).is_err());
    }

    #[test]
    fn single_partial_short_circuits() {
        let p = partial(DocType::Tds, result_json("TDS", "RT-601"), &["density"]);
        let expected = p.extraction_result.clone().unwrap();
        let merged = merge_group(&group(vec![p])).unwrap();
        assert_eq!(merged, expected);
    }

    #[test]
    fn conflicting_fact_keeps_higher_priority_and_warns() {
        let mut tds = result_json("TDS", "RT-601");
        tds["physical"]["density"] = density("1.02", "TDS Spec Table");
        let mut sds = result_json("SDS", "RT-601");
        sds["physical"]["density"] = density("1.05", "SDS Sec 9");

        let merged = merge_group(&group(vec![
            partial(DocType::Tds, tds, &[]),
            partial(DocType::Sds, sds, &[]),
        ]))
        .unwrap();

        assert_eq!(merged.physical.density.as_ref().unwrap().value_string(), "1.02");
        assert!(merged.extraction_warnings.iter().any(|w| w
            == "Conflict in physical.density: keeping '1.02' (higher priority), discarding '1.05' from SDS"));
    }

    #[test]
    fn union_fields_combine_all_sources() {
        let mut sds = result_json("SDS", "RT-601");
        sds["safety"]["ghs_statements"] = json!(["H319", "H315"]);
        let mut rpi = result_json("RPI", "RT-601");
        rpi["safety"]["ghs_statements"] = json!(["H315", "P264"]);
        rpi["safety"]["global_inventories"] = json!(["TSCA listed", "REACH registered"]);

        let merged = merge_group(&group(vec![
            partial(DocType::Sds, sds, &[]),
            partial(DocType::Rpi, rpi, &[]),
        ]))
        .unwrap();

        assert_eq!(merged.safety.ghs_statements, vec!["H319", "H315", "P264"]);
        assert_eq!(
            merged.safety.global_inventories,
            vec!["TSCA listed", "REACH registered"]
        );
    }

    #[test]
    fn missing_is_intersection_of_all_sources() {
        let tds = partial(DocType::Tds, result_json("TDS", "RT-601"), &["un_number", "purity"]);
        let sds = partial(DocType::Sds, result_json("SDS", "RT-601"), &["purity", "shelf_life"]);
        let merged = merge_group(&group(vec![tds, sds])).unwrap();
        assert_eq!(merged.missing_attributes, vec!["purity"]);
    }

    #[test]
    fn lower_priority_fills_empty_base_fields() {
        let tds = result_json("TDS", "RT-601");
        let mut brochure = result_json("Brochure", "RT-601");
        brochure["application"]["main_application"] = json!("Mold making");
        brochure["application"]["packaging_options"] = json!(["20 kg pail"]);

        let merged = merge_group(&group(vec![
            partial(DocType::Tds, tds, &[]),
            partial(DocType::Brochure, brochure, &[]),
        ]))
        .unwrap();

        assert_eq!(merged.application.main_application.as_deref(), Some("Mold making"));
        assert_eq!(merged.application.packaging_options, vec!["20 kg pail"]);
    }

    #[test]
    fn merge_is_invariant_under_input_reordering() {
        let mut tds = result_json("TDS", "RT-601");
        tds["physical"]["density"] = density("1.02", "TDS Spec Table");
        let mut sds = result_json("SDS", "RT-601");
        sds["physical"]["density"] = density("1.05", "SDS Sec 9");
        sds["safety"]["ghs_statements"] = json!(["H319"]);
        let mut rpi = result_json("RPI", "RT-601");
        rpi["safety"]["certifications"] = json!(["NSF", "FDA"]);

        let a = partial(DocType::Tds, tds, &["purity"]);
        let b = partial(DocType::Sds, sds, &["purity", "grade"]);
        let c = partial(DocType::Rpi, rpi, &["purity"]);

        let forward = merge_group(&group(vec![a.clone(), b.clone(), c.clone()])).unwrap();
        let backward = merge_group(&group(vec![c, b, a])).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn failed_partial_contributes_nothing() {
        let tds = partial(DocType::Tds, result_json("TDS", "RT-601"), &[]);
        let failed = PartialExtraction::failed("bad.pdf", DocType::Unknown, "PDF parse error");
        let merged = merge_group(&group(vec![tds.clone(), failed])).unwrap();
        assert_eq!(merged.identity.product_name, "RT-601");
        // All 33 attributes missing on the failed side leaves the
        // intersection empty.
        assert!(merged.missing_attributes.is_empty());
        assert_eq!(merged.missing_attributes.len() + merged.extracted_attributes().len(), ATTRIBUTE_NAMES.len());
    }
}
