//! Field-level diff between two sanitized snapshots.

use std::collections::{BTreeSet, HashSet};

use serde_json::{Number, Value};
use tally_core::models::audit::FieldChange;

/// Top-level fields of `old` and `new` whose values differ.
///
/// Keys are compared in sorted order. A key present on one side only is a
/// change even when the other side holds `null`, and is reported with `null`
/// for the missing side. Keys in `ignored` and snapshots that
/// are absent or not objects produce nothing.
pub fn changed_fields(
    old: Option<&Value>,
    new: Option<&Value>,
    ignored: &HashSet<String>,
) -> Vec<FieldChange> {
    let (Some(Value::Object(old)), Some(Value::Object(new))) = (old, new) else {
        return Vec::new();
    };

    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    keys.into_iter()
        .filter(|key| !ignored.contains(key.as_str()))
        .filter_map(|key| {
            let changed = match (old.get(key), new.get(key)) {
                (Some(before), Some(after)) => !same(before, after),
                _ => true,
            };
            changed.then(|| FieldChange {
                field: key.clone(),
                old_value: old.get(key).cloned().unwrap_or(Value::Null),
                new_value: new.get(key).cloned().unwrap_or(Value::Null),
            })
        })
        .collect()
}

/// Structural equality where `50` and `50.0` are the same number.
fn same(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => same_number(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| same(x, y)))
        }
        _ => a == b,
    }
}

/// Integers compare exactly. An integral float equals the integer it holds.
fn same_number(x: &Number, y: &Number) -> bool {
    match (integral(x), integral(y)) {
        (Some(a), Some(b)) => a == b,
        (None, None) => x.as_f64() == y.as_f64(),
        _ => false,
    }
}

fn integral(n: &Number) -> Option<i128> {
    const LIMIT: f64 = 1.7e38; // below i128::MAX

    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
        .or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < LIMIT)
                .map(|f| f as i128)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ignored() -> HashSet<String> {
        ["updatedAt", "updated_at", "__v"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn single_field_change() {
        let old = json!({"name": "Wash", "price": 50});
        let new = json!({"name": "Wash", "price": 72});
        assert_eq!(
            changed_fields(Some(&old), Some(&new), &ignored()),
            vec![FieldChange {
                field: "price".into(),
                old_value: json!(50),
                new_value: json!(72),
            }]
        );
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let a = json!({"name": "Wash", "tags": ["x", {"y": 1}], "price": 50});
        assert!(changed_fields(Some(&a), Some(&a), &ignored()).is_empty());
    }

    #[test]
    fn missing_keys_are_reported_as_null() {
        let old = json!({"a": 1});
        let new = json!({"b": 2});
        let changes = changed_fields(Some(&old), Some(&new), &ignored());
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "a");
        assert_eq!(changes[0].new_value, Value::Null);
        assert_eq!(changes[1].field, "b");
        assert_eq!(changes[1].old_value, Value::Null);
    }

    #[test]
    fn managed_fields_are_ignored() {
        let old = json!({"updatedAt": "2024-01-01", "updated_at": 1, "__v": 0});
        let new = json!({"updatedAt": "2024-02-01", "updated_at": 2, "__v": 1});
        assert!(changed_fields(Some(&old), Some(&new), &ignored()).is_empty());
    }

    #[test]
    fn nested_values_compare_structurally() {
        let old = json!({"address": {"city": "Lisbon", "zip": "1000"}});
        let same_new = json!({"address": {"zip": "1000", "city": "Lisbon"}});
        let moved = json!({"address": {"city": "Porto", "zip": "4000"}});

        assert!(changed_fields(Some(&old), Some(&same_new), &ignored()).is_empty());
        let changes = changed_fields(Some(&old), Some(&moved), &ignored());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "address");
    }

    #[test]
    fn integer_and_float_forms_are_equal() {
        let old = json!({"price": 50});
        let new = json!({"price": 50.0});
        assert!(changed_fields(Some(&old), Some(&new), &ignored()).is_empty());
    }

    #[test]
    fn explicit_null_differs_from_missing_key() {
        let old = json!({"x": null});
        let new = json!({});
        assert_eq!(
            changed_fields(Some(&old), Some(&new), &ignored()),
            vec![FieldChange {
                field: "x".into(),
                old_value: Value::Null,
                new_value: Value::Null,
            }]
        );
        assert_eq!(changed_fields(Some(&new), Some(&old), &ignored()).len(), 1);
    }

    #[test]
    fn nested_null_differs_from_missing_key() {
        let old = json!({"address": {"zip": null}});
        let new = json!({"address": {"city": null}});
        assert_eq!(changed_fields(Some(&old), Some(&new), &ignored()).len(), 1);
    }

    #[test]
    fn large_integers_compare_exactly() {
        let old = json!({"id": 9007199254740993u64});
        let new = json!({"id": 9007199254740992u64});
        let changes = changed_fields(Some(&old), Some(&new), &ignored());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_value, json!(9007199254740993u64));

        let max = json!({"id": u64::MAX});
        assert!(changed_fields(Some(&max), Some(&max), &ignored()).is_empty());
        let negative = json!({"id": -1});
        assert_eq!(changed_fields(Some(&max), Some(&negative), &ignored()).len(), 1);
    }

    #[test]
    fn fractional_float_differs_from_integer() {
        let old = json!({"price": 50});
        let new = json!({"price": 50.5});
        assert_eq!(changed_fields(Some(&old), Some(&new), &ignored()).len(), 1);
    }

    #[test]
    fn absent_snapshot_yields_nothing() {
        let a = json!({"price": 50});
        assert!(changed_fields(None, Some(&a), &ignored()).is_empty());
        assert!(changed_fields(Some(&a), None, &ignored()).is_empty());
        assert!(changed_fields(None, None, &ignored()).is_empty());
    }
}
