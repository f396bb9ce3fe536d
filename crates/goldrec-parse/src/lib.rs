//! # Goldrec Parse
//!
//! PDF text + table extraction to a normalised Markdown representation,
//! plus the cheap keyword heuristics that give the pipeline a document-type
//! guess and brand detection before any LLM is involved.
//!
//! The parser assumes a text layer (no OCR). Per-page conversion failures
//! are logged and skipped; only container-level corruption is an error.

pub mod error;
pub mod heuristics;
pub mod parser;

pub use error::ParseError;
pub use heuristics::{detect_brand, detect_document_type};
pub use parser::{parse_pdf, DocMetadata, PageContent, ParsedDocument};
