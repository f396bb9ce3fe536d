//! Provenance-carrying extracted values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extracted value payload: the source documents mix free text ("liquid",
/// "UN 1863") with bare numbers (density, purity percentages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Text(s) => f.write_str(s),
            FactValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        FactValue::Text(s.to_string())
    }
}

impl From<String> for FactValue {
    fn from(s: String) -> Self {
        FactValue::Text(s)
    }
}

impl From<f64> for FactValue {
    fn from(n: f64) -> Self {
        FactValue::Number(n)
    }
}

/// Confidence level attached to every extracted fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        f.write_str(s)
    }
}

/// Single extracted fact with source provenance and confidence.
///
/// A `value` of `None` is a legal explicit "not found" marker; such facts
/// carry `confidence: low` by construction (see [`Fact::not_found`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    #[serde(default)]
    pub value: Option<FactValue>,
    #[serde(default)]
    pub unit: Option<String>,
    /// e.g. "TDS Spec Table", "SDS Sec 9", "RPI Global Inventories"
    pub source_section: String,
    /// Original text quote from the document.
    pub raw_string: String,
    pub confidence: Confidence,
    /// True only when the value is a guaranteed spec, not a typical value.
    #[serde(default)]
    pub is_specification: bool,
    /// e.g. "DIN 51757", "PH. EUR. 2.2.20"
    #[serde(default)]
    pub test_method: Option<String>,
}

impl Fact {
    pub fn new(
        value: impl Into<FactValue>,
        source_section: impl Into<String>,
        raw_string: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            value: Some(value.into()),
            unit: None,
            source_section: source_section.into(),
            raw_string: raw_string.into(),
            confidence,
            is_specification: false,
            test_method: None,
        }
    }

    /// Explicit "not found" placeholder.
    pub fn not_found(raw_string: impl Into<String>) -> Self {
        Self {
            value: None,
            unit: None,
            source_section: "not found".into(),
            raw_string: raw_string.into(),
            confidence: Confidence::Low,
            is_specification: false,
            test_method: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn as_spec(mut self) -> Self {
        self.is_specification = true;
        self
    }

    /// Value rendered as a plain string, empty when absent.
    pub fn value_string(&self) -> String {
        self.value.as_ref().map(|v| v.to_string()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fact_value_roundtrips_untagged() {
        let text: FactValue = serde_json::from_str("\"1.02 g/cm³\"").unwrap();
        assert_eq!(text, FactValue::Text("1.02 g/cm³".into()));

        let num: FactValue = serde_json::from_str("98.5").unwrap();
        assert_eq!(num, FactValue::Number(98.5));
    }

    #[test]
    fn not_found_is_low_confidence() {
        let fact = Fact::not_found("CAS number not found in document");
        assert!(fact.value.is_none());
        assert_eq!(fact.confidence, Confidence::Low);
        assert_eq!(fact.value_string(), "");
    }

    #[test]
    fn confidence_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Confidence::High).unwrap(), "\"high\"");
        let parsed: Confidence = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, Confidence::Medium);
    }
}
