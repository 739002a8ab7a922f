//! Transposition stage: pivot rows into columns.
//!
//! ```text
//! pivot "month", name "metric"
//!
//! {month: "Jan", sales: 10, visits: 3}        {metric: "sales",  Jan: 10, Feb: 12}
//! {month: "Feb", sales: 12, visits: 5}   →    {metric: "visits", Jan: 3,  Feb: 5}
//! ```
//!
//! Every non-pivot field becomes one output record. Each input record turns
//! into a column labelled with its pivot value.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::config::TranspositionSpec;
use super::stage::{Stage, StageContext, StageKind};
use crate::error::ConfigError;
use crate::value::{display_string, type_name};

pub struct TransposeStage<'a> {
    spec: &'a TranspositionSpec,
}

impl<'a> TransposeStage<'a> {
    pub fn new(spec: &'a TranspositionSpec) -> Self {
        Self { spec }
    }
}

impl Stage for TransposeStage<'_> {
    const KIND: StageKind = StageKind::Transposition;

    fn apply(&self, collection: &[Value], ctx: &mut StageContext<'_>) -> Vec<Value> {
        let Some(label_field) = self.spec.label_field() else {
            ctx.report(
                Self::KIND,
                None,
                None,
                ConfigError::MissingTranspositionPivot.to_string(),
            );
            return collection.to_vec();
        };
        let pivots = self.spec.pivot.as_slice();

        // (column label, source record)
        let mut columns: Vec<(String, &Map<String, Value>)> = Vec::new();
        for (row, record) in collection.iter().enumerate() {
            let Some(fields) = record.as_object() else {
                ctx.report(
                    Self::KIND,
                    Some(row),
                    None,
                    format!("skipped {}, expected a record", type_name(record)),
                );
                continue;
            };
            let Some(label) = fields.get(label_field) else {
                ctx.report(
                    Self::KIND,
                    Some(row),
                    Some(label_field),
                    "skipped record without pivot",
                );
                continue;
            };
            let label = display_string(label);
            if columns.iter().any(|(existing, _)| *existing == label) {
                ctx.report(
                    Self::KIND,
                    Some(row),
                    Some(label_field),
                    format!("duplicate pivot value '{}' overwrites an earlier column", label),
                );
            }
            columns.push((label, fields));
        }

        let mut seen = HashSet::new();
        let mut field_order: Vec<&str> = Vec::new();
        for (_, fields) in &columns {
            for key in fields.keys() {
                if !pivots.contains(key) && seen.insert(key.as_str()) {
                    field_order.push(key);
                }
            }
        }

        let heterogeneous = columns
            .iter()
            .any(|(_, fields)| field_order.iter().any(|f| !fields.contains_key(*f)));
        if heterogeneous {
            ctx.report(
                Self::KIND,
                None,
                None,
                "records have different field sets; missing values are null",
            );
        }

        field_order
            .into_iter()
            .map(|field| {
                let mut output = Map::new();
                output.insert(self.spec.name.clone(), Value::String(field.to_string()));
                for (label, fields) in &columns {
                    let value = fields.get(field).cloned().unwrap_or(Value::Null);
                    output.insert(label.clone(), value);
                }
                Value::Object(output)
            })
            .collect()
    }
}
