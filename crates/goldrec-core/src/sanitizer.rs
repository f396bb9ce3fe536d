//! Deterministic repair of common LLM output-shape errors.
//!
//! Runs between raw JSON parsing and schema validation. No LLM calls; a pure
//! and idempotent `Value -> Value` transformation. Repairs, in order:
//!
//! 1. `document_type` spelled out in full → short code
//! 2. plain-string fields wrapped as Fact objects (or lists of them) → string
//! 3. single-Fact fields returned as lists → first element
//! 4. list-of-string fields returned as null → `[]`, wrapped items → strings
//! 5. `cas_numbers` returned as null → explicit not-found Fact;
//!    returned as a list of Facts → one comma-joined Fact

use crate::fields::{
    is_plain_string, is_plain_string_list, is_single_fact, map_doc_type_name,
};
use serde_json::{json, Map, Value};

/// Recursion guard for pathological nesting.
const MAX_DEPTH: usize = 5;

/// Strip markdown code fences (```json ... ```) from an LLM response.
pub fn strip_code_fences(raw_text: &str) -> String {
    let mut text = raw_text.trim();
    if text.starts_with("```") {
        if let Some(newline) = text.find('\n') {
            text = &text[newline + 1..];
        }
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    text.trim().to_string()
}

/// Fix common LLM output errors before schema validation.
pub fn sanitize_extraction_json(data: Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(fix_map(&map, 0)),
        other => other,
    }
}

fn fix_map(map: &Map<String, Value>, depth: usize) -> Map<String, Value> {
    if depth > MAX_DEPTH {
        return map.clone();
    }

    let mut result = Map::new();
    for (key, val) in map {
        if key == "document_type" {
            if let Value::String(name) = val {
                let mapped = map_doc_type_name(name)
                    .map(|code| Value::String(code.to_string()))
                    .unwrap_or_else(|| val.clone());
                result.insert(key.clone(), mapped);
                continue;
            }
            result.insert(key.clone(), val.clone());
        } else if is_plain_string(key) {
            result.insert(key.clone(), fix_plain_string(val));
        } else if is_single_fact(key) {
            result.insert(key.clone(), fix_single_fact(val));
        } else if is_plain_string_list(key) {
            result.insert(key.clone(), fix_string_list(val));
        } else if key == "cas_numbers" {
            result.insert(key.clone(), fix_cas_numbers(val));
        } else {
            match val {
                Value::Object(nested) => {
                    result.insert(key.clone(), Value::Object(fix_map(nested, depth + 1)));
                }
                Value::Array(items) => {
                    let fixed: Vec<Value> = items
                        .iter()
                        .map(|item| match item {
                            Value::Object(nested) => Value::Object(fix_map(nested, depth + 1)),
                            other => other.clone(),
                        })
                        .collect();
                    result.insert(key.clone(), Value::Array(fixed));
                }
                other => {
                    result.insert(key.clone(), other.clone());
                }
            }
        }
    }
    result
}

/// Render a scalar as the plain string the schema expects, `None` for null.
fn plain_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Extract the plain value from a Fact-like object, else stringify.
fn unwrap_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) if map.contains_key("value") => plain_string(&map["value"]),
        other => plain_string(other),
    }
}

fn fix_plain_string(val: &Value) -> Value {
    match val {
        // Wrapped in a Fact-like object.
        Value::Object(map) if map.contains_key("value") => match plain_string(&map["value"]) {
            Some(s) => Value::String(s),
            None => Value::Null,
        },
        // Wrapped in a list (possibly of Fact-like objects): join the values.
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(unwrap_value)
                .filter(|s| !s.is_empty())
                .collect();
            if parts.is_empty() {
                Value::Null
            } else {
                Value::String(parts.join("; "))
            }
        }
        other => other.clone(),
    }
}

fn fix_single_fact(val: &Value) -> Value {
    match val {
        // A list of Facts where one was expected: take the first.
        Value::Array(items) if !items.is_empty() => {
            if items[0].is_object() {
                items[0].clone()
            } else {
                val.clone()
            }
        }
        other => other.clone(),
    }
}

fn fix_string_list(val: &Value) -> Value {
    match val {
        Value::Null => Value::Array(vec![]),
        Value::Array(items) => {
            let mut cleaned = Vec::new();
            for item in items {
                let fixed = match item {
                    Value::Null => None,
                    Value::Object(map) => {
                        if map.contains_key("value") {
                            plain_string(&map["value"])
                        } else if map.contains_key("name") {
                            plain_string(&map["name"])
                        } else {
                            // Generic object: flatten to "key: value" pairs.
                            let joined = map
                                .iter()
                                .filter(|(_, v)| !v.is_null())
                                .filter_map(|(k, v)| plain_string(v).map(|s| format!("{}: {}", k, s)))
                                .collect::<Vec<_>>()
                                .join("; ");
                            if joined.is_empty() {
                                None
                            } else {
                                Some(joined)
                            }
                        }
                    }
                    Value::String(s) => Some(s.clone()),
                    other => plain_string(other),
                };
                if let Some(s) = fixed {
                    if !s.is_empty() {
                        cleaned.push(Value::String(s));
                    }
                }
            }
            Value::Array(cleaned)
        }
        other => other.clone(),
    }
}

fn cas_not_found() -> Value {
    json!({
        "value": null,
        "source_section": "not found",
        "raw_string": "CAS number not found in document",
        "confidence": "low",
        "is_specification": false,
    })
}

fn fix_cas_numbers(val: &Value) -> Value {
    match val {
        Value::Null => cas_not_found(),
        // Multiple CAS numbers as a list of Facts: join into a single Fact,
        // keeping the first entry's provenance.
        Value::Array(items) => {
            let mut cas_values = Vec::new();
            for item in items {
                match item {
                    Value::Object(map) => {
                        if let Some(v) = map.get("value").and_then(plain_string) {
                            if !v.is_empty() {
                                cas_values.push(v);
                            }
                        }
                    }
                    Value::String(s) if !s.is_empty() => cas_values.push(s.clone()),
                    _ => {}
                }
            }
            if cas_values.is_empty() {
                return cas_not_found();
            }
            let first = items.first().and_then(Value::as_object);
            let joined = cas_values.join(", ");
            json!({
                "value": joined,
                "source_section": first
                    .and_then(|m| m.get("source_section"))
                    .and_then(Value::as_str)
                    .unwrap_or("Section 3"),
                "raw_string": joined,
                "confidence": first
                    .and_then(|m| m.get("confidence"))
                    .and_then(Value::as_str)
                    .unwrap_or("high"),
                "is_specification": true,
                "test_method": null,
            })
        }
        other => other.clone(),
    }
}
