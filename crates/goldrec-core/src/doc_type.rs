//! Document types and the Truth Hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The six-way document classification.
///
/// Priority order (the Truth Hierarchy) drives conflict resolution during
/// merging: TDS(5) > CoA(4) > SDS(3) > RPI(2) > Brochure(1) > unknown(0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "TDS")]
    Tds,
    #[serde(rename = "SDS")]
    Sds,
    #[serde(rename = "RPI")]
    Rpi,
    #[serde(rename = "CoA")]
    CoA,
    Brochure,
    #[serde(rename = "unknown")]
    Unknown,
}

impl DocType {
    pub const ALL: [DocType; 6] = [
        DocType::Tds,
        DocType::Sds,
        DocType::Rpi,
        DocType::CoA,
        DocType::Brochure,
        DocType::Unknown,
    ];

    /// Truth-Hierarchy priority, highest wins on merge conflicts.
    pub fn priority(self) -> u8 {
        match self {
            DocType::Tds => 5,
            DocType::CoA => 4,
            DocType::Sds => 3,
            DocType::Rpi => 2,
            DocType::Brochure => 1,
            DocType::Unknown => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Tds => "TDS",
            DocType::Sds => "SDS",
            DocType::Rpi => "RPI",
            DocType::CoA => "CoA",
            DocType::Brochure => "Brochure",
            DocType::Unknown => "unknown",
        }
    }

    /// Parse a short code, case-insensitively. Anything unrecognised maps
    /// to `Unknown` rather than failing.
    pub fn from_code(code: &str) -> DocType {
        match code.trim().to_ascii_uppercase().as_str() {
            "TDS" => DocType::Tds,
            "SDS" => DocType::Sds,
            "RPI" => DocType::Rpi,
            "COA" => DocType::CoA,
            "BROCHURE" => DocType::Brochure,
            _ => DocType::Unknown,
        }
    }
}

impl Default for DocType {
    fn default() -> Self {
        DocType::Unknown
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
