//! Golden-record drafts ready for persistence.

use crate::region::{resolve_region, Region};
use crate::schema::{ExtractionResult, ATTRIBUTE_COUNT};
use crate::DocType;
use serde::{Deserialize, Serialize};

/// Completeness percentage derived from the number of missing attributes.
///
/// Always derived, never stored independently of the missing count.
pub fn completeness(missing_count: usize) -> f64 {
    let found = ATTRIBUTE_COUNT.saturating_sub(missing_count);
    (found as f64 / ATTRIBUTE_COUNT as f64) * 100.0
}

/// A merged extraction result together with the metadata the store needs to
/// assign a version: the resolved region, source attribution, and derived
/// completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenRecordDraft {
    pub product_name: String,
    pub brand: Option<String>,
    pub region: Region,
    pub doc_language: Option<String>,
    pub revision_date: Option<String>,
    pub document_type: DocType,
    pub record: ExtractionResult,
    pub source_files: Vec<String>,
    pub source_count: usize,
    pub missing_count: usize,
    pub completeness: f64,
}

impl GoldenRecordDraft {
    /// Build a draft from a merged result, resolving region and deriving
    /// the completeness figures.
    pub fn from_merged(
        product_name: impl Into<String>,
        brand: Option<String>,
        record: ExtractionResult,
        source_files: Vec<String>,
    ) -> Self {
        let region = resolve_region(&record);
        let missing_count = record.missing_attributes.len();
        Self {
            product_name: product_name.into(),
            brand,
            region,
            doc_language: Some(record.document_info.language.clone()),
            revision_date: record.document_info.revision_date.clone(),
            document_type: record.document_info.document_type,
            source_count: source_files.len(),
            source_files,
            missing_count,
            completeness: completeness(missing_count),
            record,
        }
    }
}
