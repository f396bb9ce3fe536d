//! Core PDF parser: text layer + tables to Markdown, one heading per page.

use crate::error::{ParseError, ParseResult};
use crate::heuristics::{detect_brand, detect_document_type};
use goldrec_core::DocType;
use pdf_oxide::converters::ConversionOptions;
use pdf_oxide::PdfDocument;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Extracted content for a single PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    pub page_number: u32,
    /// Plain text layer, used by the classification heuristics.
    pub text: String,
    /// Markdown rendering of the page including detected table regions.
    pub markdown: String,
}

/// Document-level metadata picked up during parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocMetadata {
    pub brand: Option<String>,
}

/// Complete parsed PDF output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub full_markdown: String,
    pub pages: Vec<PageContent>,
    /// Heuristic guess; the LLM classifier has the final word.
    pub doc_type: DocType,
    pub page_count: u32,
    pub metadata: DocMetadata,
}

fn conversion_options() -> ConversionOptions {
    ConversionOptions {
        extract_tables: true,
        include_images: false,
        embed_images: false,
        ..ConversionOptions::default()
    }
}

/// Extract text and tables from a PDF, returning structured Markdown.
///
/// Strategy, per page: convert the page to Markdown (tables included); when
/// conversion fails, fall back to the plain text layer; page headings are
/// joined with horizontal rules. Deterministic for identical input bytes.
///
/// Only container-level corruption raises; per-page failures are logged and
/// the page is emitted empty.
pub fn parse_pdf(pdf_bytes: &[u8]) -> ParseResult<ParsedDocument> {
    // pdf_oxide reads from a path, so spool the buffer to a temp file.
    let mut spool = NamedTempFile::new()?;
    spool.write_all(pdf_bytes)?;
    spool.flush()?;

    let mut doc =
        PdfDocument::open(spool.path()).map_err(|e| ParseError::Corrupt(e.to_string()))?;
    let page_count = doc
        .page_count()
        .map_err(|e| ParseError::Corrupt(e.to_string()))?;

    let options = conversion_options();
    let mut pages: Vec<PageContent> = Vec::with_capacity(page_count);
    let mut markdown_parts: Vec<String> = Vec::with_capacity(page_count);

    for page_idx in 0..page_count {
        let page_number = (page_idx + 1) as u32;

        let text = match doc.extract_text(page_idx) {
            Ok(text) => text,
            Err(e) => {
                warn!(page = page_number, error = %e, "text extraction failed");
                String::new()
            }
        };

        let page_body = match doc.to_markdown(page_idx, &options) {
            Ok(md) if !md.trim().is_empty() => md.trim().to_string(),
            Ok(_) => text.trim().to_string(),
            Err(e) => {
                warn!(page = page_number, error = %e, "markdown conversion failed, using text layer");
                text.trim().to_string()
            }
        };

        markdown_parts.push(format!("## Page {page_number}\n\n{page_body}"));
        pages.push(PageContent {
            page_number,
            text,
            markdown: page_body,
        });
    }

    let full_text: String = pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let full_markdown = markdown_parts.join("\n\n---\n\n");

    let doc_type = detect_document_type(&full_text);
    let brand = detect_brand(&full_text);

    info!(
        pages = page_count,
        doc_type = %doc_type,
        brand = brand.as_deref().unwrap_or("-"),
        chars = full_markdown.len(),
        "PDF parsed"
    );

    Ok(ParsedDocument {
        full_markdown,
        pages,
        doc_type,
        page_count: page_count as u32,
        metadata: DocMetadata { brand },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_container_corruption() {
        let err = parse_pdf(b"this is not a pdf").unwrap_err();
        assert!(matches!(err, ParseError::Corrupt(_)));
    }

    #[test]
    fn conversion_options_keep_tables_and_drop_images() {
        let options = conversion_options();
        assert!(options.extract_tables);
        assert!(!options.include_images);
    }
}
