//! Pipeline orchestrator.
//!
//! [`AssemblyLine`] holds the frozen settings and the date capability, and
//! runs a [`PipelineConfig`] over an input collection. Stages always execute
//! in the same order:
//!
//! ```text
//! filters → overturn → transformations → addedTransformations
//!         → aggregations | transposition
//! ```
//!
//! A chained pipeline feeds each run's output into the next run.

use serde::Serialize;
use serde_json::Value;

use super::aggregation::AggregateStage;
use super::config::{PipelineConfig, ProcessConfig};
use super::filter::FilterStage;
use super::overturn::OverturnStage;
use super::stage::{Diagnostic, InPlaceStage, Stage, StageContext, StageKind};
use super::transformation::{AugmentStage, TransformStage};
use super::transposition::TransposeStage;
use crate::datetime::{ChronoDateTime, DateTimeCapability};
use crate::error::ConfigError;
use crate::settings::Settings;

/// Output of [`AssemblyLine::process`].
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub records: Vec<Value>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ProcessResult {
    /// True when no diagnostic was produced.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records, {} diagnostics",
            self.records.len(),
            self.diagnostics.len()
        )
    }
}

/// The engine. Immutable once built; safe to share between threads.
pub struct AssemblyLine {
    settings: Settings,
    dates: Box<dyn DateTimeCapability>,
}

impl Default for AssemblyLine {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl AssemblyLine {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            dates: Box::new(ChronoDateTime::new()),
        }
    }

    /// Replace the date capability (fixed offsets in tests, custom calendars).
    pub fn with_dates(mut self, dates: impl DateTimeCapability + 'static) -> Self {
        self.dates = Box::new(dates);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run `pipeline` over `input`.
    ///
    /// An array input is the collection; any other value is treated as a
    /// one-record collection. Never fails: problems are returned as
    /// diagnostics next to the records.
    pub fn process(&self, input: Value, pipeline: &PipelineConfig) -> ProcessResult {
        let collection = match input {
            Value::Array(items) => items,
            other => vec![other],
        };
        self.process_collection(collection, pipeline)
    }

    /// Run `pipeline` over an already normalized collection.
    pub fn process_collection(&self, collection: Vec<Value>, pipeline: &PipelineConfig) -> ProcessResult {
        let mut ctx = StageContext::new(&self.settings, self.dates.as_ref());

        let runs = pipeline.runs();
        tracing::debug!(records = collection.len(), runs = runs.len(), "processing");

        let records = runs
            .iter()
            .enumerate()
            .fold(collection, |current, (run, config)| {
                ctx.set_run(run);
                run_once(current, config, run, &mut ctx)
            });

        let result = ProcessResult {
            records,
            diagnostics: ctx.into_diagnostics(),
        };
        tracing::debug!("{}", result.summary());
        result
    }
}

fn run_once(
    mut current: Vec<Value>,
    config: &ProcessConfig,
    run: usize,
    ctx: &mut StageContext<'_>,
) -> Vec<Value> {
    if config.is_empty() {
        tracing::debug!(run, "no stage configured, records pass through");
        return current;
    }

    if !config.filters.is_empty() {
        current = run_stage(&FilterStage::new(&config.filters), &current, ctx);
    }

    if let Some(overturn) = &config.overturn {
        current = run_stage(&OverturnStage::new(overturn.as_slice()), &current, ctx);
    }

    if !config.transformations.is_empty() {
        current = run_stage(&TransformStage::new(&config.transformations), &current, ctx);
    }

    if !config.added_transformations.is_empty() {
        run_in_place(&AugmentStage::new(&config.added_transformations), &mut current, ctx);
    }

    if !config.aggregations.is_empty() {
        current = run_stage(&AggregateStage::new(&config.aggregations), &current, ctx);
        if config.transposition.is_some() {
            ctx.report(
                StageKind::Transposition,
                None,
                None,
                ConfigError::AggregationWithTransposition { run }.to_string(),
            );
            return current;
        }
    }

    if let Some(transposition) = &config.transposition {
        current = run_stage(&TransposeStage::new(transposition), &current, ctx);
    }

    current
}

fn run_stage<S: Stage>(stage: &S, current: &[Value], ctx: &mut StageContext<'_>) -> Vec<Value> {
    let output = stage.apply(current, ctx);
    tracing::debug!(
        stage = %S::KIND,
        input = current.len(),
        output = output.len(),
        "stage"
    );
    output
}

fn run_in_place<S: InPlaceStage>(stage: &S, current: &mut [Value], ctx: &mut StageContext<'_>) {
    stage.apply_in_place(current, ctx);
    tracing::debug!(stage = %S::KIND, records = current.len(), "stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    fn engine() -> AssemblyLine {
        AssemblyLine::new(Settings::default().with_output_local_time(false))
    }

    fn pipeline(value: Value) -> PipelineConfig {
        PipelineConfig::from_value(&value).unwrap()
    }

    #[test]
    fn test_lotr_scenario() {
        let input = json!([{
            "id": 123,
            "name": "LOTR",
            "author": {"id": 321, "name": "Tolkien"},
            "created": "1954-07-29 09:12:12"
        }]);
        let config = pipeline(json!({
            "filters": [],
            "transformations": [
                {"name": "title", "path": "name"},
                {"name": "created_date", "path": "created", "operation": "date"}
            ]
        }));

        let result = engine().process(input, &config);
        assert!(result.is_clean());
        assert_eq!(
            result.records,
            vec![json!({"title": "LOTR", "created_date": "07/29/1954"})]
        );
    }

    #[test]
    fn test_injected_dates_localize_output() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let engine = AssemblyLine::new(Settings::default()).with_dates(ChronoDateTime::with_offset(offset));
        assert!(engine.settings().output_local_time);

        let config = pipeline(json!({
            "transformations": [{"name": "at", "path": "created", "operation": "datetime"}]
        }));
        let result = engine.process(json!([{"created": "1954-07-29 23:30:00"}]), &config);
        assert_eq!(result.records, vec![json!({"at": "07/30/1954 01:30:00"})]);
    }

    #[test]
    fn test_runs_are_chained() {
        let config = pipeline(json!([
            {"filters": [{"path": "x", "match": 1}]},
            {"transformations": [{"name": "y", "path": "x"}]}
        ]));

        let result = engine().process(json!([{"x": 1}, {"x": 2}]), &config);
        assert_eq!(result.records, vec![json!({"y": 1})]);
    }

    #[test]
    fn test_bare_object_is_promoted() {
        let config = pipeline(json!({"transformations": [{"name": "n", "path": "name"}]}));
        let result = engine().process(json!({"name": "solo"}), &config);
        assert_eq!(result.records, vec![json!({"n": "solo"})]);
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let input = json!([{"a": 1}, {"b": 2}]);
        let result = engine().process(input.clone(), &pipeline(json!({})));
        assert_eq!(Value::Array(result.records), input);
    }

    #[test]
    fn test_aggregation_skips_transposition() {
        let config = pipeline(json!({
            "aggregations": [{"type": "count"}, {"type": "sum", "path": "v"}],
            "transposition": {"pivot": "month", "name": "metric"}
        }));

        let result = engine().process(json!([{"v": 2}, {"v": 5}]), &config);
        assert_eq!(result.records, vec![json!(2), json!(7)]);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].stage, StageKind::Transposition);
    }

    #[test]
    fn test_overturn_then_transform() {
        let config = pipeline(json!({
            "overturn": {"pivot": "books", "mode": "merge", "parentAttributeName": "author_"},
            "transformations": [
                {"name": "title", "path": "title", "operation": "uppercase"},
                {"name": "by", "path": "author_name"}
            ]
        }));
        let input = json!([{"name": "Tolkien", "books": [{"title": "lotr"}, {"title": "hobbit"}]}]);

        let result = engine().process(input, &config);
        assert_eq!(
            result.records,
            vec![
                json!({"title": "LOTR", "by": "Tolkien"}),
                json!({"title": "HOBBIT", "by": "Tolkien"}),
            ]
        );
    }

    #[test]
    fn test_added_transformations_then_aggregate() {
        let config = pipeline(json!({
            "addedTransformations": [
                {"name": "total", "path": "", "operation": "sum", "params": ["a", "b"]}
            ],
            "aggregations": [{"type": "sum", "path": "total"}]
        }));

        let result = engine().process(json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}]), &config);
        assert_eq!(result.records, vec![json!(10)]);
    }

    #[test]
    fn test_diagnostics_carry_run_index() {
        let config = pipeline(json!([
            {},
            {"transformations": [{"name": "short", "path": "n", "operation": "truncate", "params": [1]}]}
        ]));

        let result = engine().process(json!([{"n": 42}]), &config);
        assert_eq!(result.records, vec![json!({"short": 42})]);
        assert_eq!(result.diagnostics[0].run, 1);
        assert_eq!(result.summary(), "1 records, 1 diagnostics");
    }
}
