//! Prompt template registry.
//!
//! Seven templates drive the LLM agents. They are loaded once at startup
//! from a prompts directory; when no directory is configured the embedded
//! copies (the same files, compiled in) are used so a bare checkout runs.

use crate::error::AgentResult;
use crate::extractor::ExtractorKind;
use std::fs;
use std::path::Path;

/// Abbreviated response schema appended to every extractor prompt.
pub const SCHEMA_HINT: &str = r#"
## JSON Schema (abbreviated)
{
  "document_info": {"document_type": "TDS|SDS|RPI|CoA|Brochure|unknown", "language": "en", "manufacturer": "...", "brand": "...", "revision_date": "...", "page_count": 0},
  "identity": {"product_name": "...", "product_line": "...", "wacker_sku": null, "material_numbers": [], "product_url": null, "grade": {"value": "...", "unit": null, "source_section": "...", "raw_string": "...", "confidence": "high|medium|low", "is_specification": false, "test_method": null}},
  "chemical": {"cas_numbers": {"value": "...", "unit": null, "source_section": "...", "raw_string": "...", "confidence": "high", "is_specification": true, "test_method": null}, "chemical_components": [], "chemical_synonyms": [], "purity": null},
  "physical": {"physical_form": null, "density": null, "flash_point": null, "temperature_range": null, "shelf_life": null, "cure_system": null},
  "application": {"main_application": null, "usage_restrictions": [], "packaging_options": []},
  "safety": {"ghs_statements": [], "un_number": null, "certifications": [], "global_inventories": [], "blocked_countries": [], "blocked_industries": []},
  "compliance": {"wiaw_status": null, "sales_advisory": null},
  "missing_attributes": ["attribute_name_1", "..."],
  "extraction_warnings": []
}

Every fact object requires: value, source_section, raw_string, confidence. Optional: unit, is_specification, test_method.
"#;

/// Loaded prompt templates, immutable after startup.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    classifier: String,
    extractor_tds: String,
    extractor_sds: String,
    extractor_rpi: String,
    extractor_coa: String,
    extractor_brochure: String,
    auditor: String,
}

impl PromptRegistry {
    /// Compiled-in templates.
    pub fn embedded() -> Self {
        Self {
            classifier: include_str!("../prompts/classifier.txt").trim().to_string(),
            extractor_tds: include_str!("../prompts/extractor_tds.txt").trim().to_string(),
            extractor_sds: include_str!("../prompts/extractor_sds.txt").trim().to_string(),
            extractor_rpi: include_str!("../prompts/extractor_rpi.txt").trim().to_string(),
            extractor_coa: include_str!("../prompts/extractor_coa.txt").trim().to_string(),
            extractor_brochure: include_str!("../prompts/extractor_brochure.txt")
                .trim()
                .to_string(),
            auditor: include_str!("../prompts/auditor.txt").trim().to_string(),
        }
    }

    /// Load all seven templates from a directory. Every file must exist.
    pub fn load_dir(dir: &Path) -> AgentResult<Self> {
        let read = |name: &str| -> AgentResult<String> {
            Ok(fs::read_to_string(dir.join(name))?.trim().to_string())
        };
        Ok(Self {
            classifier: read("classifier.txt")?,
            extractor_tds: read("extractor_tds.txt")?,
            extractor_sds: read("extractor_sds.txt")?,
            extractor_rpi: read("extractor_rpi.txt")?,
            extractor_coa: read("extractor_coa.txt")?,
            extractor_brochure: read("extractor_brochure.txt")?,
            auditor: read("auditor.txt")?,
        })
    }

    /// Load from an optional directory, embedded copies otherwise.
    pub fn load(dir: Option<&Path>) -> AgentResult<Self> {
        match dir {
            Some(dir) => Self::load_dir(dir),
            None => Ok(Self::embedded()),
        }
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn auditor(&self) -> &str {
        &self.auditor
    }

    pub fn extractor(&self, kind: ExtractorKind) -> &str {
        match kind {
            ExtractorKind::Tds => &self.extractor_tds,
            ExtractorKind::Sds => &self.extractor_sds,
            ExtractorKind::Rpi => &self.extractor_rpi,
            ExtractorKind::CoA => &self.extractor_coa,
            ExtractorKind::Brochure => &self.extractor_brochure,
        }
    }

    /// Extractor system prompt: template plus the shared schema hint.
    pub fn extractor_system_prompt(&self, kind: ExtractorKind) -> String {
        format!("{}\n\n{}", self.extractor(kind), SCHEMA_HINT)
    }
}
