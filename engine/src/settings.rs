//! Engine-wide settings.
//!
//! Settings are read once (from JSON, with every field optional), adjusted by
//! the caller if needed, and then frozen inside an [`crate::AssemblyLine`].
//! Date patterns are chrono `strftime` patterns.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// How an overturned child keeps track of its former parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverturnMode {
    /// Attach the parent as a nested object.
    #[default]
    Append,
    /// Copy the parent's keys onto the child with a prefix.
    Merge,
}

/// Process-wide options applied to every `process` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Placeholder for paths that do not resolve.
    pub default_value: Value,

    /// Keep hour precision (instead of day precision) in `timey`.
    pub timey: bool,

    /// Pattern used to parse incoming date/time strings.
    pub input_date_format: String,

    /// Pattern for the `date` operation.
    pub display_date_format: String,

    /// Pattern for the `time` operation.
    pub display_time_format: String,

    /// Pattern for the `datetime` operation.
    pub display_datetime_format: String,

    /// Convert parsed (UTC) values to local time before rendering.
    pub output_local_time: bool,

    /// Key under which overturn stores or prefixes the parent.
    pub overturn_parent_attribute_name: String,

    /// Default inversion mode for overturn specs that do not set one.
    pub overturn_mode: OverturnMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_value: Value::String(String::new()),
            timey: false,
            input_date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            display_date_format: "%m/%d/%Y".to_string(),
            display_time_format: "%H:%M:%S".to_string(),
            display_datetime_format: "%m/%d/%Y %H:%M:%S".to_string(),
            output_local_time: true,
            overturn_parent_attribute_name: "vlmParent".to_string(),
            overturn_mode: OverturnMode::Append,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON string. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Settings(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
            .map_err(|e| EngineError::Settings(format!("{}: {}", path.display(), e)))
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Whether `value` is the configured placeholder.
    pub fn is_default(&self, value: &Value) -> bool {
        *value == self.default_value
    }

    pub fn with_default_value(mut self, value: Value) -> Self {
        self.default_value = value;
        self
    }

    pub fn with_timey(mut self, timey: bool) -> Self {
        self.timey = timey;
        self
    }

    pub fn with_output_local_time(mut self, local: bool) -> Self {
        self.output_local_time = local;
        self
    }

    pub fn with_overturn_mode(mut self, mode: OverturnMode) -> Self {
        self.overturn_mode = mode;
        self
    }
}
