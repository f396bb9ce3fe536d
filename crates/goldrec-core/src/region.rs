//! Regional-variant resolution for golden records.
//!
//! TDS, CoA, Brochure, and RPI documents are not region-specific. SDS
//! documents derive a region from their language, with an inventory-based
//! override: an SDS that references TSCA but not REACH is a US variant even
//! when written in English.

use crate::doc_type::DocType;
use crate::schema::ExtractionResult;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "GLOBAL")]
    Global,
    #[serde(rename = "EU")]
    Eu,
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "JP")]
    Jp,
    #[serde(rename = "CN")]
    Cn,
    #[serde(rename = "KR")]
    Kr,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Region::Global => "GLOBAL",
            Region::Eu => "EU",
            Region::Us => "US",
            Region::Jp => "JP",
            Region::Cn => "CN",
            Region::Kr => "KR",
        }
    }

    pub fn from_code(code: &str) -> Option<Region> {
        match code.trim().to_ascii_uppercase().as_str() {
            "GLOBAL" => Some(Region::Global),
            "EU" => Some(Region::Eu),
            "US" => Some(Region::Us),
            "JP" => Some(Region::Jp),
            "CN" => Some(Region::Cn),
            "KR" => Some(Region::Kr),
            _ => None,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SDS language → default region.
fn region_for_language(lang: &str) -> Region {
    match lang {
        "en" | "de" | "fr" | "es" | "it" | "pt" | "nl" | "pl" => Region::Eu,
        "ja" => Region::Jp,
        "zh" => Region::Cn,
        "ko" => Region::Kr,
        _ => Region::Global,
    }
}

/// Determine the geographic region for a golden record.
pub fn resolve_region(result: &ExtractionResult) -> Region {
    let doc_type = result.document_info.document_type;

    match doc_type {
        DocType::Tds | DocType::CoA | DocType::Brochure | DocType::Rpi => Region::Global,
        DocType::Sds => {
            let lang: String = result
                .document_info
                .language
                .chars()
                .take(2)
                .collect::<String>()
                .to_ascii_lowercase();
            let mut region = region_for_language(&lang);

            // Inventory override for US detection: TSCA without REACH.
            let inventories = &result.safety.global_inventories;
            if !inventories.is_empty() {
                let inv_text = inventories
                    .iter()
                    .map(|s| s.to_ascii_uppercase())
                    .collect::<Vec<_>>()
                    .join(" ");
                if inv_text.contains("TSCA") && !inv_text.contains("REACH") {
                    region = Region::Us;
                }
            }

            region
        }
        DocType::Unknown => Region::Global,
    }
}
