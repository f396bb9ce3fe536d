//! Keyword heuristics for document type and brand.
//!
//! These run before the LLM classifier and feed the parser's `doc_type`
//! guess. The rule order matters: SDS markers are checked before TDS, which
//! beats the generic fallbacks.

use goldrec_core::DocType;
use once_cell::sync::Lazy;
use regex::Regex;

/// Chars of document text scanned for type keywords.
const TYPE_SCAN_CHARS: usize = 3000;
/// Chars of document text scanned for a brand name.
const BRAND_SCAN_CHARS: usize = 5000;

static DOC_TYPE_RULES: Lazy<Vec<(DocType, Vec<Regex>)>> = Lazy::new(|| {
    let rules: [(DocType, &[&str]); 4] = [
        (
            DocType::Sds,
            &[
                r"(?i)safety\s+data\s+sheet",
                r"(?i)sicherheitsdatenblatt",
                r"(?i)SECTION\s+1[\s:.]+IDENTIFICATION",
                r"(?i)SECTION\s+1[\s:.]+Identification\s+of\s+the\s+substance",
            ],
        ),
        (
            DocType::Tds,
            &[
                r"(?i)technical\s+data\s+sheet",
                r"(?i)technisches\s+datenblatt",
                r"(?i)typical\s+properties",
                r"(?i)specification\s+data",
                r"(?i)product\s+data\s+sheet",
            ],
        ),
        (
            DocType::Rpi,
            &[
                r"(?i)raw\s+product\s+information",
                r"(?i)global\s+chemical\s+inventor",
                r"(?i)regulatory\s+product\s+information",
            ],
        ),
        (
            DocType::CoA,
            &[
                r"(?i)certificate\s+of\s+analysis",
                r"(?i)analysenzertifikat",
                r"(?i)batch[\s-]+no",
                r"(?i)lot[\s-]+no",
            ],
        ),
    ];

    rules
        .into_iter()
        .map(|(doc_type, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("doc-type pattern"))
                .collect();
            (doc_type, compiled)
        })
        .collect()
});

const BRANDS: [&str; 7] = [
    "ELASTOSIL",
    "FERMOPURE",
    "GENIOSIL",
    "BELSIL",
    "POWERSIL",
    "VINNAPAS",
    "WACKER",
];

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Classify a document by scanning the first ~3000 chars for keyword
/// patterns. Substantial unmatched text defaults to `Brochure`; near-empty
/// text (no usable layer) is `Unknown`.
pub fn detect_document_type(text: &str) -> DocType {
    let sample = truncate_chars(text, TYPE_SCAN_CHARS);
    for (doc_type, patterns) in DOC_TYPE_RULES.iter() {
        if patterns.iter().any(|p| p.is_match(sample)) {
            return *doc_type;
        }
    }
    if text.chars().count() > 200 {
        DocType::Brochure
    } else {
        DocType::Unknown
    }
}

/// Return the first known brand name found in the text.
pub fn detect_brand(text: &str) -> Option<String> {
    let sample = truncate_chars(text, BRAND_SCAN_CHARS).to_uppercase();
    BRANDS
        .iter()
        .find(|brand| sample.contains(*brand))
        .map(|brand| brand.to_string())
}
