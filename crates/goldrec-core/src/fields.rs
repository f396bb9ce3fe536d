//! Field-shape classification shared by the sanitizer and the merger.
//!
//! Every one of the 33 attributes falls into exactly one shape class; the
//! sanitizer uses the classes to repair misshapen LLM output and the merger
//! uses them to pick the right combination rule.

/// Fields that are plain strings, not Fact objects.
pub const PLAIN_STRING_FIELDS: &[&str] = &[
    // identity
    "product_name",
    "product_line",
    "wacker_sku",
    "product_url",
    // document_info
    "language",
    "manufacturer",
    "brand",
    "revision_date",
    // application
    "main_application",
    // compliance
    "wiaw_status",
    "sales_advisory",
];

/// Fields that are a single Fact, never a list of Facts.
pub const SINGLE_FACT_FIELDS: &[&str] = &[
    "grade",
    "purity",
    "physical_form",
    "density",
    "flash_point",
    "temperature_range",
    "shelf_life",
    "cure_system",
    "un_number",
];

/// Fields that are lists of plain strings.
pub const PLAIN_STRING_LIST_FIELDS: &[&str] = &[
    "material_numbers",
    "chemical_components",
    "chemical_synonyms",
    "usage_restrictions",
    "packaging_options",
    "ghs_statements",
    "certifications",
    "global_inventories",
    "blocked_countries",
    "blocked_industries",
    "missing_attributes",
    "extraction_warnings",
];

/// Fields merged by set-union across all sources instead of
/// higher-priority-wins.
pub const UNION_MERGE_FIELDS: &[&str] = &[
    "certifications",
    "global_inventories",
    "ghs_statements",
    "blocked_countries",
    "blocked_industries",
    "chemical_synonyms",
    "material_numbers",
    "extraction_warnings",
];

pub fn is_plain_string(field: &str) -> bool {
    PLAIN_STRING_FIELDS.contains(&field)
}

pub fn is_single_fact(field: &str) -> bool {
    SINGLE_FACT_FIELDS.contains(&field)
}

pub fn is_plain_string_list(field: &str) -> bool {
    PLAIN_STRING_LIST_FIELDS.contains(&field)
}

pub fn is_union_merge(field: &str) -> bool {
    UNION_MERGE_FIELDS.contains(&field)
}

/// Map a spelled-out document type to its short code.
pub fn map_doc_type_name(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "technical data sheet" => Some("TDS"),
        "safety data sheet" => Some("SDS"),
        "raw product information" => Some("RPI"),
        "regulatory product information" => Some("RPI"),
        "certificate of analysis" => Some("CoA"),
        "brochure" => Some("Brochure"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ATTRIBUTE_NAMES;

    #[test]
    fn union_fields_are_list_fields() {
        for field in UNION_MERGE_FIELDS {
            assert!(is_plain_string_list(field), "{field} must be a list field");
        }
    }

    #[test]
    fn shape_classes_are_disjoint() {
        for field in ATTRIBUTE_NAMES {
            let classes = [is_plain_string(field), is_single_fact(field), is_plain_string_list(field)];
            let count = classes.iter().filter(|c| **c).count();
            assert!(count <= 1, "{field} is in more than one shape class");
        }
    }

    #[test]
    fn doc_type_names_map_to_codes() {
        assert_eq!(map_doc_type_name("Technical Data Sheet"), Some("TDS"));
        assert_eq!(map_doc_type_name("  certificate of analysis "), Some("CoA"));
        assert_eq!(map_doc_type_name("invoice"), None);
    }
}
