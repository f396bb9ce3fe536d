//! Shared test fixtures for the agent crates' unit tests.

use goldrec_core::ExtractionResult;
use serde_json::{json, Value};

/// A fully valid 33-attribute extraction tree for a TDS document.
pub(crate) fn extraction_value() -> Value {
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

/// Build a typed result after mutating the fixture tree.
pub(crate) fn result_with(mutate: impl FnOnce(&mut Value)) -> ExtractionResult {
    let mut value = extraction_value();
    mutate(&mut value);
    ExtractionResult::from_json(value).expect("test fixture must validate")
}
