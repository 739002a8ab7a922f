//! Overturn stage: invert a parent/child nesting.
//!
//! Given records that hold a child record (or an array of them) under a
//! pivot field, emit the children as top-level records, each keeping a
//! trace of its former parent:
//!
//! ```text
//! {id: 1, children: [{id: 10}]}
//!   append, "parent" →  {id: 10, parent: {id: 1}}
//!   merge,  "p_"     →  {id: 10, p_id: 1}
//! ```

use serde_json::{Map, Value};

use super::config::OverturnSpec;
use super::stage::{Stage, StageContext, StageKind};
use crate::error::ConfigError;
use crate::settings::OverturnMode;
use crate::value::type_name;

/// How a child absorbs its former parent.
pub trait Inversion {
    fn apply(&self, child: Map<String, Value>, parent: &Map<String, Value>, attribute: &str) -> Value;
}

/// Attach the parent under `attribute`.
pub struct AppendParent;

/// Copy the parent's fields onto the child, prefixed with `attribute`.
/// Fields the child already has are kept.
pub struct MergeParent;

impl Inversion for AppendParent {
    fn apply(&self, mut child: Map<String, Value>, parent: &Map<String, Value>, attribute: &str) -> Value {
        child.insert(attribute.to_string(), Value::Object(parent.clone()));
        Value::Object(child)
    }
}

impl Inversion for MergeParent {
    fn apply(&self, mut child: Map<String, Value>, parent: &Map<String, Value>, attribute: &str) -> Value {
        for (key, value) in parent {
            child
                .entry(format!("{}{}", attribute, key))
                .or_insert_with(|| value.clone());
        }
        Value::Object(child)
    }
}

impl OverturnMode {
    pub fn inversion(self) -> &'static dyn Inversion {
        match self {
            OverturnMode::Append => &AppendParent,
            OverturnMode::Merge => &MergeParent,
        }
    }
}

/// Overturn specs applied one after the other.
pub struct OverturnStage<'a> {
    specs: &'a [OverturnSpec],
}

impl<'a> OverturnStage<'a> {
    pub fn new(specs: &'a [OverturnSpec]) -> Self {
        Self { specs }
    }
}

impl Stage for OverturnStage<'_> {
    const KIND: StageKind = StageKind::Overturn;

    fn apply(&self, collection: &[Value], ctx: &mut StageContext<'_>) -> Vec<Value> {
        let mut current = collection.to_vec();
        for (index, spec) in self.specs.iter().enumerate() {
            match spec.pivot.as_deref().filter(|p| !p.is_empty()) {
                Some(pivot) => current = overturn(current, pivot, spec, ctx),
                None => ctx.report(
                    Self::KIND,
                    None,
                    None,
                    ConfigError::MissingOverturnPivot { index }.to_string(),
                ),
            }
        }
        current
    }
}

fn overturn(
    records: Vec<Value>,
    pivot: &str,
    spec: &OverturnSpec,
    ctx: &mut StageContext<'_>,
) -> Vec<Value> {
    let settings = ctx.settings;
    let attribute = spec
        .parent_attribute_name
        .as_deref()
        .unwrap_or(&settings.overturn_parent_attribute_name);
    let inversion = spec.mode.unwrap_or(settings.overturn_mode).inversion();

    let mut overturned = Vec::new();
    for (row, record) in records.into_iter().enumerate() {
        let fields = match record {
            Value::Object(fields) => fields,
            other => {
                ctx.report(
                    StageKind::Overturn,
                    Some(row),
                    None,
                    format!("skipped {}, expected a record", type_name(&other)),
                );
                continue;
            }
        };

        let mut children = None;
        let parent: Map<String, Value> = fields
            .into_iter()
            .filter_map(|(key, value)| {
                if key == pivot {
                    children = Some(value);
                    None
                } else {
                    Some((key, value))
                }
            })
            .collect();

        match children {
            Some(Value::Array(items)) => {
                for child in items {
                    match child {
                        Value::Object(child) => {
                            overturned.push(inversion.apply(child, &parent, attribute));
                        }
                        other => ctx.report(
                            StageKind::Overturn,
                            Some(row),
                            Some(pivot),
                            format!("skipped child of type {}", type_name(&other)),
                        ),
                    }
                }
            }
            Some(Value::Object(child)) if !child.is_empty() => {
                overturned.push(inversion.apply(child, &parent, attribute));
            }
            // No child under the pivot: nothing to promote.
            _ => {}
        }
    }
    overturned
}
