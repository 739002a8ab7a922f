//! Stage traits, run context and diagnostics.
//!
//! Two stage shapes exist. A [`Stage`] reads the working collection and
//! returns a new one. An [`InPlaceStage`] writes into the records it is
//! handed; only `addedTransformations` has that shape.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::datetime::DateTimeCapability;
use crate::settings::Settings;

/// Which part of the pipeline produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StageKind {
    Filter,
    Overturn,
    Transformation,
    AddedTransformation,
    Aggregation,
    Transposition,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Filter => "filters",
            StageKind::Overturn => "overturn",
            StageKind::Transformation => "transformations",
            StageKind::AddedTransformation => "addedTransformations",
            StageKind::Aggregation => "aggregations",
            StageKind::Transposition => "transposition",
        };
        f.write_str(name)
    }
}

/// A non-fatal problem met while running a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Index of the run in a chained pipeline (0 for single runs).
    pub run: usize,
    pub stage: StageKind,
    /// Index of the record in the stage's input, when record-specific.
    pub row: Option<usize>,
    /// Output field concerned, when field-specific.
    pub field: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run {} {}", self.run, self.stage)?;
        if let Some(row) = self.row {
            write!(f, " row {}", row)?;
        }
        if let Some(field) = &self.field {
            write!(f, " field '{}'", field)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Everything a stage may read, plus the diagnostics sink.
pub struct StageContext<'a> {
    pub settings: &'a Settings,
    pub dates: &'a dyn DateTimeCapability,
    run: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> StageContext<'a> {
    pub fn new(settings: &'a Settings, dates: &'a dyn DateTimeCapability) -> Self {
        Self {
            settings,
            dates,
            run: 0,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn set_run(&mut self, run: usize) {
        self.run = run;
    }

    /// Record a diagnostic and log it.
    pub fn report(
        &mut self,
        stage: StageKind,
        row: Option<usize>,
        field: Option<&str>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            run: self.run,
            stage,
            row,
            field: field.map(str::to_string),
            message: message.into(),
        };
        tracing::warn!(
            run = diagnostic.run,
            stage = %diagnostic.stage,
            row = ?diagnostic.row,
            field = ?diagnostic.field,
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// A stage that derives a new collection from the working one.
pub trait Stage {
    const KIND: StageKind;

    fn apply(&self, collection: &[Value], ctx: &mut StageContext<'_>) -> Vec<Value>;
}

/// A stage that augments the working records in place.
pub trait InPlaceStage {
    const KIND: StageKind;

    fn apply_in_place(&self, collection: &mut [Value], ctx: &mut StageContext<'_>);
}
