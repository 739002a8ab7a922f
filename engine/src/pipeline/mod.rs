//! Pipeline module.
//!
//! - Config: stage specs and (chained) pipeline configuration
//! - Operations: per-field transformation operations
//! - Stages: filter, overturn, transformations, aggregation, transposition
//! - Engine: the orchestrator that runs a pipeline over a collection

pub mod aggregation;
pub mod config;
pub mod engine;
pub mod filter;
pub mod operations;
pub mod overturn;
pub mod stage;
pub mod transformation;
pub mod transposition;

pub use aggregation::AggregateStage;
pub use config::*;
pub use engine::{AssemblyLine, ProcessResult};
pub use filter::FilterStage;
pub use operations::{operations_description, Operation};
pub use overturn::{AppendParent, Inversion, MergeParent, OverturnStage};
pub use stage::{Diagnostic, InPlaceStage, Stage, StageContext, StageKind};
pub use transformation::{AugmentStage, TransformStage};
pub use transposition::TransposeStage;
