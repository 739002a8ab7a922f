//! Pipeline configuration
//!
//! A pipeline is either one stage set ([`ProcessConfig`]) or an ordered list
//! of stage sets, each run consuming the previous run's output. Every stage
//! key is optional; an absent or empty stage is skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operations::Operation;
use crate::error::{ConfigError, ConfigResult};
use crate::settings::OverturnMode;

/// A full pipeline: a single run or a chain of runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineConfig {
    /// Runs applied in order, each on the output of the previous one.
    Chain(Vec<ProcessConfig>),
    /// One run.
    Single(ProcessConfig),
}

/// The stages of a single run. Execution order is fixed regardless of key
/// order: filters, overturn, transformations, addedTransformations,
/// aggregations, transposition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overturn: Option<OneOrMany<OverturnSpec>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<TransformationSpec>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added_transformations: Vec<TransformationSpec>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transposition: Option<TranspositionSpec>,
}

/// Either a single item or a list of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => std::slice::from_ref(item),
        }
    }
}

/// Keep records whose `path` resolves to a truthy value equal to `match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub path: String,
    #[serde(rename = "match")]
    pub matches: Value,
}

/// Promote the records held under `pivot` to the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverturnSpec {
    /// Field holding the child record(s). Required.
    #[serde(default)]
    pub pivot: Option<String>,

    /// Overrides the engine's `overturnParentAttributeName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_attribute_name: Option<String>,

    /// Overrides the engine's `overturnMode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<OverturnMode>,
}

/// Derive the field `name` from `path`, optionally through an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTransformation", into = "RawTransformation")]
pub struct TransformationSpec {
    pub name: String,
    pub path: String,
    pub operation: Option<Operation>,
}

/// Wire shape of a transformation: the operation is a name plus a loose
/// parameter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTransformation {
    name: String,
    #[serde(default)]
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    params: Vec<Value>,
}

impl From<RawTransformation> for TransformationSpec {
    fn from(raw: RawTransformation) -> Self {
        Self {
            name: raw.name,
            path: raw.path,
            operation: raw
                .operation
                .map(|op| Operation::from_parts(&op, &raw.params)),
        }
    }
}

impl From<TransformationSpec> for RawTransformation {
    fn from(spec: TransformationSpec) -> Self {
        let (operation, params) = match spec.operation {
            Some(op) => {
                let params = op.params();
                (Some(op.name().to_string()), params)
            }
            None => (None, Vec::new()),
        };
        Self {
            name: spec.name,
            path: spec.path,
            operation,
            params,
        }
    }
}

impl TransformationSpec {
    /// Copy `path` into `name` unchanged.
    pub fn field(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            operation: None,
        }
    }

    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operation = Some(op);
        self
    }
}

/// Kind of aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregationKind {
    Count,
    Sum,
    Multiply,
    /// Unrecognized kinds aggregate to 0.
    Other(String),
}

impl From<String> for AggregationKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "count" => AggregationKind::Count,
            "sum" => AggregationKind::Sum,
            "multiply" => AggregationKind::Multiply,
            _ => AggregationKind::Other(kind),
        }
    }
}

impl From<AggregationKind> for String {
    fn from(kind: AggregationKind) -> Self {
        match kind {
            AggregationKind::Count => "count".to_string(),
            AggregationKind::Sum => "sum".to_string(),
            AggregationKind::Multiply => "multiply".to_string(),
            AggregationKind::Other(other) => other,
        }
    }
}

/// One scalar computed over the whole collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    #[serde(rename = "type")]
    pub kind: AggregationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Returned verbatim when present, bypassing `type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_value: Option<Value>,
}

/// Pivot rows into columns around `pivot`, labelling the field column `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranspositionSpec {
    pub pivot: OneOrMany<String>,
    pub name: String,
}

impl PipelineConfig {
    /// Parse a pipeline from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a pipeline from a JSON value.
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The runs in execution order.
    pub fn runs(&self) -> &[ProcessConfig] {
        match self {
            PipelineConfig::Chain(runs) => runs,
            PipelineConfig::Single(run) => std::slice::from_ref(run),
        }
    }

    /// Static checks over every run; returns all problems found.
    pub fn problems(&self) -> Vec<ConfigError> {
        self.runs()
            .iter()
            .enumerate()
            .flat_map(|(run, config)| config.problems(run))
            .collect()
    }

    /// Fail on the first static problem.
    pub fn check(&self) -> ConfigResult<()> {
        match self.problems().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl From<ProcessConfig> for PipelineConfig {
    fn from(config: ProcessConfig) -> Self {
        PipelineConfig::Single(config)
    }
}

impl From<Vec<ProcessConfig>> for PipelineConfig {
    fn from(runs: Vec<ProcessConfig>) -> Self {
        PipelineConfig::Chain(runs)
    }
}

impl ProcessConfig {
    /// Static problems of this run. `run` is only used for messages.
    pub fn problems(&self, run: usize) -> Vec<ConfigError> {
        let mut problems = Vec::new();

        if let Some(overturn) = &self.overturn {
            for (index, spec) in overturn.as_slice().iter().enumerate() {
                if spec.pivot.as_deref().map_or(true, str::is_empty) {
                    problems.push(ConfigError::MissingOverturnPivot { index });
                }
            }
        }

        for (index, spec) in self
            .transformations
            .iter()
            .chain(&self.added_transformations)
            .enumerate()
        {
            if spec.name.is_empty() {
                problems.push(ConfigError::EmptyTransformationName { index });
            }
        }

        if let Some(transposition) = &self.transposition {
            if transposition.label_field().is_none() {
                problems.push(ConfigError::MissingTranspositionPivot);
            }
            if !self.aggregations.is_empty() {
                problems.push(ConfigError::AggregationWithTransposition { run });
            }
        }

        problems
    }

    /// True when no stage is configured.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
            && self.overturn.is_none()
            && self.transformations.is_empty()
            && self.added_transformations.is_empty()
            && self.aggregations.is_empty()
            && self.transposition.is_none()
    }
}

impl TranspositionSpec {
    /// The pivot field whose values label the output columns.
    pub fn label_field(&self) -> Option<&str> {
        self.pivot
            .as_slice()
            .first()
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }
}

/// Example pipeline for documentation and the `example-config` command.
pub fn example_config() -> PipelineConfig {
    PipelineConfig::Single(ProcessConfig {
        filters: vec![FilterSpec {
            path: "author.organization.name".to_string(),
            matches: Value::String("Tolkien Society".to_string()),
        }],
        transformations: vec![
            TransformationSpec::field("title", "name"),
            TransformationSpec::field("author", "author.name").with_operation(Operation::Uppercase),
            TransformationSpec::field("created_date", "created").with_operation(Operation::Date),
            TransformationSpec::field("summary", "name").with_operation(Operation::Concat {
                paths: vec!["name".to_string(), "author.name".to_string()],
            }),
        ],
        ..ProcessConfig::default()
    })
}
