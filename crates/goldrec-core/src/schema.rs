//! The 33-attribute extraction schema.
//!
//! One [`ExtractionResult`] is the unit exchanged across every boundary of
//! the pipeline: LLM output (after sanitisation), merge input/output, store
//! payload, export payload. All 33 attributes are always serialised, with
//! explicit nulls for absent values, so that downstream consumers never have
//! to distinguish null from missing keys.

use crate::doc_type::DocType;
use crate::error::CoreError;
use crate::fact::Fact;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names of all 33 canonical attributes, in schema order.
pub const ATTRIBUTE_NAMES: [&str; 33] = [
    // document_info
    "document_type",
    "language",
    "manufacturer",
    "brand",
    "revision_date",
    "page_count",
    // identity
    "product_name",
    "product_line",
    "wacker_sku",
    "material_numbers",
    "product_url",
    "grade",
    // chemical
    "cas_numbers",
    "chemical_components",
    "chemical_synonyms",
    "purity",
    // physical
    "physical_form",
    "density",
    "flash_point",
    "temperature_range",
    "shelf_life",
    "cure_system",
    // application
    "main_application",
    "usage_restrictions",
    "packaging_options",
    // safety
    "ghs_statements",
    "un_number",
    "certifications",
    "global_inventories",
    "blocked_countries",
    "blocked_industries",
    // compliance
    "wiaw_status",
    "sales_advisory",
];

pub const ATTRIBUTE_COUNT: usize = ATTRIBUTE_NAMES.len();

/// The seven section keys, in merge order.
pub const SECTION_NAMES: [&str; 7] = [
    "document_info",
    "identity",
    "chemical",
    "physical",
    "application",
    "safety",
    "compliance",
];

fn default_language() -> String {
    "en".into()
}

/// Metadata about the parsed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub document_type: DocType,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub revision_date: Option<String>,
    #[serde(default)]
    pub page_count: u32,
}

/// Product identity and classification attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityData {
    pub product_name: String,
    #[serde(default)]
    pub product_line: Option<String>,
    /// ERP/SAP material ID.
    #[serde(default)]
    pub wacker_sku: Option<String>,
    #[serde(default)]
    pub material_numbers: Vec<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    /// Tech / Food / Pharma / Cosmetic + EP/USP.
    #[serde(default)]
    pub grade: Option<Fact>,
}

/// Chemical identity and composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChemicalData {
    /// Primary key. Comma-separated when the source lists multiple numbers.
    pub cas_numbers: Fact,
    #[serde(default)]
    pub chemical_components: Vec<String>,
    #[serde(default)]
    pub chemical_synonyms: Vec<String>,
    #[serde(default)]
    pub purity: Option<Fact>,
}

/// Physical and technical specifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalData {
    #[serde(default)]
    pub physical_form: Option<Fact>,
    /// N/A for powders and solids.
    #[serde(default)]
    pub density: Option<Fact>,
    #[serde(default)]
    pub flash_point: Option<Fact>,
    #[serde(default)]
    pub temperature_range: Option<Fact>,
    #[serde(default)]
    pub shelf_life: Option<Fact>,
    /// Acetoxy / Oxime / Alkoxy / Addition / Moisture / Amine.
    #[serde(default)]
    pub cure_system: Option<Fact>,
}

/// Application context and packaging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    #[serde(default)]
    pub main_application: Option<String>,
    #[serde(default)]
    pub usage_restrictions: Vec<String>,
    #[serde(default)]
    pub packaging_options: Vec<String>,
}

/// Safety, regulatory, and compliance data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyData {
    /// H319, H315, P264, ...
    #[serde(default)]
    pub ghs_statements: Vec<String>,
    /// Accepted exclusively from SDS Section 14.
    #[serde(default)]
    pub un_number: Option<Fact>,
    #[serde(default)]
    pub certifications: Vec<String>,
    /// TSCA, REACH, IECSC, K-REACH, DSL, ENCS, ...
    #[serde(default)]
    pub global_inventories: Vec<String>,
    #[serde(default)]
    pub blocked_countries: Vec<String>,
    #[serde(default)]
    pub blocked_industries: Vec<String>,
}

/// Compliance verdict, derived from safety data rather than quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WiawStatus {
    #[serde(rename = "GREEN LIGHT")]
    GreenLight,
    #[serde(rename = "ATTENTION")]
    Attention,
    #[serde(rename = "RED FLAG")]
    RedFlag,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceData {
    #[serde(default)]
    pub wiaw_status: Option<WiawStatus>,
    /// GO / CHECK / STOP.
    #[serde(default)]
    pub sales_advisory: Option<String>,
}

/// Complete extraction output matching the 33-attribute schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_info: DocumentInfo,
    pub identity: IdentityData,
    pub chemical: ChemicalData,
    pub physical: PhysicalData,
    pub application: ApplicationData,
    pub safety: SafetyData,
    pub compliance: ComplianceData,
    /// Names of the 33 attributes not found in the document.
    pub missing_attributes: Vec<String>,
    #[serde(default)]
    pub extraction_warnings: Vec<String>,
}

impl ExtractionResult {
    /// Validate a sanitised JSON tree into a typed result.
    pub fn from_json(value: Value) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Attribute names that were populated: the complement of
    /// `missing_attributes` within the canonical 33.
    pub fn extracted_attributes(&self) -> Vec<String> {
        ATTRIBUTE_NAMES
            .iter()
            .filter(|name| !self.missing_attributes.iter().any(|m| m == *name))
            .map(|name| name.to_string())
            .collect()
    }

    /// All populated single-Fact fields with their dotted paths, including
    /// `chemical.cas_numbers`. Used by the audit trigger.
    pub fn fact_fields(&self) -> Vec<(&'static str, &Fact)> {
        let mut out: Vec<(&'static str, &Fact)> = vec![("chemical.cas_numbers", &self.chemical.cas_numbers)];
        let optional: [(&'static str, &Option<Fact>); 9] = [
            ("identity.grade", &self.identity.grade),
            ("chemical.purity", &self.chemical.purity),
            ("physical.physical_form", &self.physical.physical_form),
            ("physical.density", &self.physical.density),
            ("physical.flash_point", &self.physical.flash_point),
            ("physical.temperature_range", &self.physical.temperature_range),
            ("physical.shelf_life", &self.physical.shelf_life),
            ("physical.cure_system", &self.physical.cure_system),
            ("safety.un_number", &self.safety.un_number),
        ];
        for (name, fact) in optional {
            if let Some(fact) = fact {
                out.push((name, fact));
            }
        }
        out
    }
}
