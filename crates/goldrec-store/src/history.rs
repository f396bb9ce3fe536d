//! Golden-record history helpers for the external query layer.
//!
//! [`compute_diff`] produces the field-level change set between two
//! versions of a golden record, as dotted paths. Lists are compared
//! wholesale: attribute lists in this schema are value sets, not documents.

use serde_json::Value;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldChangeKind {
    Added,
    Removed,
    Changed,
}

/// One changed field between two record versions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Dotted path, e.g. `physical.density.value`.
    pub path: String,
    pub kind: FieldChangeKind,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Compare two golden-record JSON trees field by field.
///
/// `Added` means the new version populated something the old had as null or
/// absent; `Removed` the reverse; `Changed` a differing non-null value.
pub fn compute_diff(old: &Value, new: &Value) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    walk("", old, new, &mut changes);
    changes
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn walk(prefix: &str, old: &Value, new: &Value, changes: &mut Vec<FieldChange>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_val) in old_map {
                let path = join(prefix, key);
                match new_map.get(key) {
                    Some(new_val) => walk(&path, old_val, new_val, changes),
                    None if !old_val.is_null() => changes.push(FieldChange {
                        path,
                        kind: FieldChangeKind::Removed,
                        old: Some(old_val.clone()),
                        new: None,
                    }),
                    None => {}
                }
            }
            for (key, new_val) in new_map {
                if old_map.contains_key(key) || new_val.is_null() {
                    continue;
                }
                changes.push(FieldChange {
                    path: join(prefix, key),
                    kind: FieldChangeKind::Added,
                    old: None,
                    new: Some(new_val.clone()),
                });
            }
        }
        _ if old == new => {}
        _ => {
            let kind = if is_absent(Some(old)) {
                FieldChangeKind::Added
            } else if is_absent(Some(new)) {
                FieldChangeKind::Removed
            } else {
                FieldChangeKind::Changed
            };
            changes.push(FieldChange {
                path: prefix.to_string(),
                kind,
                old: (!old.is_null()).then(|| old.clone()),
                new: (!new.is_null()).then(|| new.clone()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_trees_have_no_diff() {
        let value = json!({"physical": {"density": {"value": "1.02"}}});
        assert!(compute_diff(&value, &value).is_empty());
    }

    #[test]
    fn changed_fact_value_is_reported_with_its_path() {
        let old = json!({"physical": {"density": {"value": "1.02", "confidence": "high"}}});
        let new = json!({"physical": {"density": {"value": "1.05", "confidence": "high"}}});
        let diff = compute_diff(&old, &new);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, "physical.density.value");
        assert_eq!(diff[0].kind, FieldChangeKind::Changed);
        assert_eq!(diff[0].old, Some(json!("1.02")));
        assert_eq!(diff[0].new, Some(json!("1.05")));
    }

    #[test]
    fn null_to_value_is_added_and_back_is_removed() {
        let old = json!({"application": {"main_application": null}});
        let new = json!({"application": {"main_application": "Mold making"}});

        let added = compute_diff(&old, &new);
        assert_eq!(added[0].kind, FieldChangeKind::Added);
        assert!(added[0].old.is_none());

        let removed = compute_diff(&new, &old);
        assert_eq!(removed[0].kind, FieldChangeKind::Removed);
        assert!(removed[0].new.is_none());
    }

    #[test]
    fn lists_are_compared_wholesale() {
        let old = json!({"safety": {"ghs_statements": ["H319"]}});
        let new = json!({"safety": {"ghs_statements": ["H319", "H315"]}});
        let diff = compute_diff(&old, &new);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, "safety.ghs_statements");
        assert_eq!(diff[0].kind, FieldChangeKind::Changed);
    }
}
