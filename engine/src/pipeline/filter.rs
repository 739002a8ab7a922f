//! Filter stage: keep records whose path matches a value.

use serde_json::Value;

use super::config::FilterSpec;
use super::stage::{Stage, StageContext, StageKind};
use crate::path::resolve;
use crate::value::{display_string, is_truthy};

impl FilterSpec {
    /// Whether `record` passes this filter.
    ///
    /// The resolved value must be truthy, and both sides are compared by
    /// their string forms so `42` matches `"42"`.
    pub fn matches(&self, record: &Value) -> bool {
        match resolve(record, &self.path) {
            Some(subject) if is_truthy(subject) => {
                display_string(subject) == display_string(&self.matches)
            }
            _ => false,
        }
    }
}

/// All filters combined with logical AND.
pub struct FilterStage<'a> {
    filters: &'a [FilterSpec],
}

impl<'a> FilterStage<'a> {
    pub fn new(filters: &'a [FilterSpec]) -> Self {
        Self { filters }
    }
}

impl Stage for FilterStage<'_> {
    const KIND: StageKind = StageKind::Filter;

    fn apply(&self, collection: &[Value], _ctx: &mut StageContext<'_>) -> Vec<Value> {
        let mut kept = Vec::new();
        for record in collection {
            if self.filters.iter().all(|filter| filter.matches(record)) {
                flatten_into(record.clone(), &mut kept);
            }
        }
        kept
    }
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        other => out.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::ChronoDateTime;
    use crate::settings::Settings;
    use serde_json::json;

    fn filter(path: &str, matches: Value) -> FilterSpec {
        FilterSpec {
            path: path.to_string(),
            matches,
        }
    }

    fn run(filters: &[FilterSpec], collection: &[Value]) -> Vec<Value> {
        let settings = Settings::default();
        let dates = ChronoDateTime::new();
        let mut ctx = StageContext::new(&settings, &dates);
        FilterStage::new(filters).apply(collection, &mut ctx)
    }

    fn books() -> Vec<Value> {
        vec![
            json!({"id": 123, "author": {"name": "Tolkien", "organization": {"id": 574}}}),
            json!({"id": 456, "author": {"name": "C. Tolkien", "organization": {"id": 574}}}),
            json!({"id": 789, "author": {"name": "Eddings"}}),
        ]
    }

    #[test]
    fn test_numeric_value_string_match() {
        let result = run(&[filter("id", json!("123"))], &books());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["id"], 123);
    }

    #[test]
    fn test_string_value_numeric_match() {
        let collection = vec![json!({"code": "42"}), json!({"code": "43"})];
        let result = run(&[filter("code", json!(42))], &collection);
        assert_eq!(result, vec![json!({"code": "42"})]);
    }

    #[test]
    fn test_nested_path_and_absent() {
        let result = run(&[filter("author.organization.id", json!(574))], &books());
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_filters_are_anded() {
        let filters = [
            filter("author.organization.id", json!(574)),
            filter("author.name", json!("Tolkien")),
        ];
        let result = run(&filters, &books());
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["id"], 123);
    }

    #[test]
    fn test_falsy_values_never_match() {
        let collection = vec![json!({"flag": 0}), json!({"flag": ""}), json!({"flag": false})];
        assert!(run(&[filter("flag", json!(0))], &collection).is_empty());
        assert!(run(&[filter("flag", json!(""))], &collection).is_empty());
        assert!(run(&[filter("flag", json!(false))], &collection).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let filters = [filter("author.organization.id", json!("574"))];
        let once = run(&filters, &books());
        let twice = run(&filters, &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_nested_arrays_are_flattened() {
        let collection = vec![json!([{"id": 1}, [{"id": 2}]])];
        let result = run(&[filter("0.id", json!(1))], &collection);
        assert_eq!(result, vec![json!({"id": 1}), json!({"id": 2})]);
    }
}
