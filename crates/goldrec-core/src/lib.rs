//! # Goldrec Core
//!
//! Canonical data model and deterministic logic for the Goldrec extraction
//! pipeline: the 33-attribute extraction schema with per-value provenance,
//! the inter-agent contracts, the output sanitizer, the Truth-Hierarchy
//! merger, and region resolution for golden records.
//!
//! Everything in this crate is pure: no I/O, no LLM calls, no clocks beyond
//! timestamping helpers. The async crates (`goldrec-llm`, `goldrec-agents`,
//! `goldrec-store`) build on these types.
//!
//! ## Key Types
//!
//! - [`Fact`] - a single extracted value with source provenance
//! - [`ExtractionResult`] - the full 33-attribute record
//! - [`PartialExtraction`] / [`ProductGroup`] - per-PDF and per-product contracts
//! - [`merge_group`] - deterministic Truth-Hierarchy merge
//! - [`sanitize_extraction_json`] - shape repair for raw LLM output
//! - [`resolve_region`] - regional-variant assignment

pub mod contracts;
pub mod doc_type;
pub mod error;
pub mod fact;
pub mod fields;
pub mod merger;
pub mod record;
pub mod region;
pub mod sanitizer;
pub mod schema;

pub use contracts::{
    AuditCorrection, AuditResult, ClassificationResult, PartialExtraction, ProductGroup,
};
pub use doc_type::DocType;
pub use error::CoreError;
pub use fact::{Confidence, Fact, FactValue};
pub use merger::merge_group;
pub use record::{completeness, GoldenRecordDraft};
pub use region::{resolve_region, Region};
pub use sanitizer::{sanitize_extraction_json, strip_code_fences};
pub use schema::{
    ApplicationData, ChemicalData, ComplianceData, DocumentInfo, ExtractionResult, IdentityData,
    PhysicalData, SafetyData, WiawStatus, ATTRIBUTE_COUNT, ATTRIBUTE_NAMES, SECTION_NAMES,
};
