//! Transformation stages.
//!
//! `transformations` builds a brand-new record per input record holding only
//! the configured fields. `addedTransformations` writes the same kind of
//! derived fields onto the existing records, so a later spec can read what an
//! earlier one wrote.

use serde_json::{Map, Value};

use super::config::TransformationSpec;
use super::operations::Operation;
use super::stage::{InPlaceStage, Stage, StageContext, StageKind};
use crate::path::resolve_or;
use crate::value::type_name;

/// Derive fresh records.
pub struct TransformStage<'a> {
    specs: &'a [TransformationSpec],
}

impl<'a> TransformStage<'a> {
    pub fn new(specs: &'a [TransformationSpec]) -> Self {
        Self { specs }
    }
}

impl Stage for TransformStage<'_> {
    const KIND: StageKind = StageKind::Transformation;

    fn apply(&self, collection: &[Value], ctx: &mut StageContext<'_>) -> Vec<Value> {
        collection
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let mut output = Map::new();
                for spec in self.specs {
                    let value = derive(spec, record, row, Self::KIND, ctx);
                    output.insert(spec.name.clone(), value);
                }
                Value::Object(output)
            })
            .collect()
    }
}

/// Add derived fields to the existing records.
pub struct AugmentStage<'a> {
    specs: &'a [TransformationSpec],
}

impl<'a> AugmentStage<'a> {
    pub fn new(specs: &'a [TransformationSpec]) -> Self {
        Self { specs }
    }
}

impl InPlaceStage for AugmentStage<'_> {
    const KIND: StageKind = StageKind::AddedTransformation;

    fn apply_in_place(&self, collection: &mut [Value], ctx: &mut StageContext<'_>) {
        for (row, record) in collection.iter_mut().enumerate() {
            if !record.is_object() {
                ctx.report(
                    Self::KIND,
                    Some(row),
                    None,
                    format!("cannot add fields to a {}", type_name(record)),
                );
                continue;
            }
            for spec in self.specs {
                let value = derive(spec, record, row, Self::KIND, ctx);
                if let Some(fields) = record.as_object_mut() {
                    fields.insert(spec.name.clone(), value);
                }
            }
        }
    }
}

/// Resolve `spec.path` on `record` (default when absent) and run the
/// operation. A failed operation is reported and leaves the value as resolved.
fn derive(
    spec: &TransformationSpec,
    record: &Value,
    row: usize,
    stage: StageKind,
    ctx: &mut StageContext<'_>,
) -> Value {
    let value = resolve_or(record, &spec.path, &ctx.settings.default_value);

    let Some(operation) = &spec.operation else {
        return value;
    };
    if let Operation::Unknown(name) = operation {
        tracing::debug!(operation = %name, field = %spec.name, "unknown operation, value passes through");
        return value;
    }

    match operation.apply(value.clone(), record, ctx.settings, ctx.dates) {
        Ok(derived) => derived,
        Err(err) => {
            ctx.report(stage, Some(row), Some(&spec.name), err.to_string());
            value
        }
    }
}
