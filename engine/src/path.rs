//! Dotted path resolution against nested records.
//!
//! `resolve(record, "author.organization.name")` walks the record one key at
//! a time. A missing key or a null intermediate yields `None` (ABSENT) rather
//! than an error; a null leaf is returned as a present `Value::Null`.

use serde_json::Value;

/// Resolve a dotted `path` against `record`.
///
/// Numeric segments index into arrays, so `items.0.id` reaches the first
/// element's `id`.
pub fn resolve<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(record, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Resolve `path` and clone the result, substituting `default` when absent.
pub fn resolve_or(record: &Value, path: &str, default: &Value) -> Value {
    resolve(record, path).cloned().unwrap_or_else(|| default.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_value() {
        let record = json!({"a": {"b": {"c": 5}}});
        assert_eq!(resolve(&record, "a.b.c"), Some(&json!(5)));
    }

    #[test]
    fn test_missing_leaf() {
        let record = json!({"a": {"b": {}}});
        assert_eq!(resolve(&record, "a.b.c"), None);
    }

    #[test]
    fn test_empty_record() {
        assert_eq!(resolve(&json!({}), "a.b.c"), None);
    }

    #[test]
    fn test_null_intermediate_is_absent() {
        let record = json!({"a": null});
        assert_eq!(resolve(&record, "a.b"), None);
    }

    #[test]
    fn test_null_leaf_is_present() {
        let record = json!({"a": {"b": null}});
        assert_eq!(resolve(&record, "a.b"), Some(&Value::Null));
    }

    #[test]
    fn test_array_index() {
        let record = json!({"items": [{"id": 1}, {"id": 2}]});
        assert_eq!(resolve(&record, "items.1.id"), Some(&json!(2)));
        assert_eq!(resolve(&record, "items.5.id"), None);
        assert_eq!(resolve(&record, "items.first"), None);
    }

    #[test]
    fn test_scalar_root() {
        assert_eq!(resolve(&json!(42), "a"), None);
    }

    #[test]
    fn test_resolve_or_default() {
        let record = json!({"name": "LOTR"});
        assert_eq!(resolve_or(&record, "name", &json!("N/A")), json!("LOTR"));
        assert_eq!(resolve_or(&record, "missing", &json!("N/A")), json!("N/A"));
    }
}
