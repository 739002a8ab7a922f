//! # Assembly line - declarative JSON record transformation
//!
//! Runs a collection of JSON records through a fixed chain of stages
//! described by a pipeline configuration: filter, overturn (invert
//! parent/child nesting), derive fields, augment in place, then either
//! aggregate or transpose.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────────────┐
//! │ JSON / CSV  │────▶│    Input    │────▶│  Pipeline   │────▶│   Records    │
//! │   (file)    │     │ (auto-enc)  │     │  (stages)   │     │ + diagnostics│
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────────────┘
//! ```
//!
//! Stages run in a fixed order: filter, overturn, transformations,
//! addedTransformations, then aggregations or transposition.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use assembly_line::{AssemblyLine, PipelineConfig, Settings};
//! use serde_json::json;
//!
//! let pipeline = PipelineConfig::from_json(
//!     r#"{"transformations": [{"name": "title", "path": "name"}]}"#,
//! )?;
//! let result = AssemblyLine::new(Settings::default())
//!     .process(json!([{"name": "LOTR"}]), &pipeline);
//! assert_eq!(result.records, vec![json!({"title": "LOTR"})]);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`settings`] - Engine-wide settings
//! - [`path`] - Dotted path resolution
//! - [`value`] - Truthiness, string forms and numeric coercion of JSON values
//! - [`datetime`] - Date parsing and formatting capability
//! - [`pipeline`] - Stage configuration, stages and the orchestrator
//! - [`input`] - JSON/CSV loading with auto-detection
//! - [`logging`] - Subscriber setup for the CLI

// Core modules
pub mod error;
pub mod path;
pub mod settings;
pub mod value;

// Dates
pub mod datetime;

// Pipeline
pub mod pipeline;

// Loading
pub mod input;

// Observability
pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ConfigResult,
    EngineError,
    EngineResult,
    InputError,
    InputResult,
    OperationError,
    OperationResult,
};

// =============================================================================
// Re-exports - Settings
// =============================================================================

pub use settings::{OverturnMode, Settings};

// =============================================================================
// Re-exports - Paths and values
// =============================================================================

pub use path::{resolve, resolve_or};
pub use value::{as_number, display_string, is_truthy};

// =============================================================================
// Re-exports - Dates
// =============================================================================

pub use datetime::{ChronoDateTime, DateTimeCapability};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    example_config,
    operations_description,
    AggregationKind,
    AggregationSpec,
    AssemblyLine,
    Diagnostic,
    FilterSpec,
    OneOrMany,
    Operation,
    OverturnSpec,
    PipelineConfig,
    ProcessConfig,
    ProcessResult,
    StageKind,
    TransformationSpec,
    TranspositionSpec,
};

// =============================================================================
// Re-exports - Input
// =============================================================================

pub use input::{
    csv_to_json,
    decode_content,
    detect_delimiter,
    detect_encoding,
    load_bytes,
    load_path,
    parse_json,
    InputFormat,
    LoadedInput,
};
