//! Error types for the assembly line.
//!
//! - [`InputError`] - loading a collection from JSON or CSV
//! - [`ConfigError`] - malformed or contradictory pipeline configuration
//! - [`OperationError`] - a transformation operation whose precondition failed
//! - [`EngineError`] - top-level wrapper used by the CLI and loaders
//!
//! The engine itself never returns these from `process`: configuration and
//! operation failures are turned into [`crate::Diagnostic`] entries so the
//! pipeline always produces a result.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while loading a collection.
#[derive(Debug, Error)]
pub enum InputError {
    /// Failed to read file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input is not valid JSON.
    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid CSV content.
    #[error("Invalid CSV at line {line}: {message}")]
    Csv { line: u64, message: String },

    /// Content could not be decoded with the detected encoding.
    #[error("Failed to decode input as {0}")]
    Encoding(String),

    /// Empty input.
    #[error("Input is empty")]
    Empty,
}

impl From<csv::Error> for InputError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        InputError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration is not valid JSON or does not match the stage shapes.
    #[error("Invalid pipeline configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Overturn spec without a pivot.
    #[error("Overturn spec #{index} has no pivot")]
    MissingOverturnPivot { index: usize },

    /// Transposition spec without a pivot.
    #[error("Transposition has no pivot")]
    MissingTranspositionPivot,

    /// Aggregations and transposition configured in the same run.
    #[error("Run #{run} configures both aggregations and transposition")]
    AggregationWithTransposition { run: usize },

    /// Transformation spec with an empty target name.
    #[error("Transformation #{index} has an empty name")]
    EmptyTransformationName { index: usize },
}

// =============================================================================
// Operation Errors
// =============================================================================

/// A transformation operation could not be applied to its input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OperationError {
    /// Value has the wrong type for the operation.
    #[error("'{operation}' expects {expected}, found {found}")]
    TypeMismatch {
        operation: &'static str,
        expected: &'static str,
        found: String,
    },

    /// Value could not be parsed with the input date pattern.
    #[error("Cannot parse '{value}' with pattern '{pattern}'")]
    InvalidDate { value: String, pattern: String },

    /// Output pattern could not be rendered.
    #[error("Invalid date pattern '{0}'")]
    InvalidPattern(String),
}

// =============================================================================
// Engine Errors (top-level)
// =============================================================================

/// Top-level errors surfaced by loaders and the CLI.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input loading error.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Settings file error.
    #[error("Settings error: {0}")]
    Settings(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input loading.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for configuration parsing and checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for a single operation.
pub type OperationResult<T> = Result<T, OperationError>;

/// Result type for top-level calls.
pub type EngineResult<T> = Result<T, EngineError>;
