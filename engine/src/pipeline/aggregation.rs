//! Aggregation stage: reduce the whole collection to one scalar per
//! configured aggregation.

use serde_json::Value;

use super::config::{AggregationKind, AggregationSpec};
use super::stage::{Stage, StageContext, StageKind};
use crate::path::resolve;
use crate::value::{as_number, number_value};

impl AggregationSpec {
    /// Compute this aggregation over `collection`.
    ///
    /// Values that are absent or not numeric are skipped.
    pub fn aggregate(&self, collection: &[Value]) -> Value {
        if let Some(value) = &self.explicit_value {
            return value.clone();
        }

        match &self.kind {
            AggregationKind::Count => Value::from(collection.len()),
            AggregationKind::Sum => number_value(self.numbers(collection).sum()),
            AggregationKind::Multiply => number_value(self.numbers(collection).product()),
            AggregationKind::Other(kind) => {
                tracing::debug!(kind = %kind, "unknown aggregation type, yielding 0");
                Value::from(0)
            }
        }
    }

    fn numbers<'a>(&'a self, collection: &'a [Value]) -> impl Iterator<Item = f64> + 'a {
        let path = self.path.as_deref();
        collection
            .iter()
            .filter_map(move |record| path.and_then(|p| resolve(record, p)))
            .filter_map(as_number)
    }
}

pub struct AggregateStage<'a> {
    specs: &'a [AggregationSpec],
}

impl<'a> AggregateStage<'a> {
    pub fn new(specs: &'a [AggregationSpec]) -> Self {
        Self { specs }
    }
}

impl Stage for AggregateStage<'_> {
    const KIND: StageKind = StageKind::Aggregation;

    fn apply(&self, collection: &[Value], _ctx: &mut StageContext<'_>) -> Vec<Value> {
        self.specs.iter().map(|spec| spec.aggregate(collection)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(kind: AggregationKind, path: Option<&str>) -> AggregationSpec {
        AggregationSpec {
            kind,
            path: path.map(str::to_string),
            explicit_value: None,
        }
    }

    fn values() -> Vec<Value> {
        vec![json!({"v": 1}), json!({"v": 2}), json!({"v": 3})]
    }

    #[test]
    fn test_sum_multiply_count() {
        let collection = values();
        assert_eq!(spec(AggregationKind::Sum, Some("v")).aggregate(&collection), json!(6));
        assert_eq!(spec(AggregationKind::Multiply, Some("v")).aggregate(&collection), json!(6));
        assert_eq!(spec(AggregationKind::Count, None).aggregate(&collection), json!(3));
    }

    #[test]
    fn test_count_ignores_path() {
        assert_eq!(spec(AggregationKind::Count, Some("nope")).aggregate(&values()), json!(3));
    }

    #[test]
    fn test_explicit_value_wins() {
        let mut explicit = spec(AggregationKind::Sum, Some("v"));
        explicit.explicit_value = Some(json!("Total"));
        assert_eq!(explicit.aggregate(&values()), json!("Total"));
    }

    #[test]
    fn test_unknown_kind_is_zero() {
        let unknown = spec(AggregationKind::Other("median".into()), Some("v"));
        assert_eq!(unknown.aggregate(&values()), json!(0));
    }

    #[test]
    fn test_absent_and_non_numeric_skipped() {
        let collection = vec![json!({"v": 2}), json!({}), json!({"v": "x"}), json!({"v": "4"})];
        assert_eq!(spec(AggregationKind::Sum, Some("v")).aggregate(&collection), json!(6));
        assert_eq!(spec(AggregationKind::Multiply, Some("v")).aggregate(&collection), json!(8));
    }

    #[test]
    fn test_empty_collection_seeds() {
        assert_eq!(spec(AggregationKind::Sum, Some("v")).aggregate(&[]), json!(0));
        assert_eq!(spec(AggregationKind::Multiply, Some("v")).aggregate(&[]), json!(1));
    }
}
