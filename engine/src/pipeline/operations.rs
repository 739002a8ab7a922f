//! Transformation operations
//!
//! Each operation is a variant owning its parameters. Configurations name an
//! operation with a string plus a loose `params` array; [`Operation::from_parts`]
//! turns that into a variant once, at load time.

use serde_json::Value;

use crate::datetime::DateTimeCapability;
use crate::error::{OperationError, OperationResult};
use crate::path::resolve;
use crate::settings::Settings;
use crate::value::{as_number, display_string, number_value, type_name};

const DEFAULT_TRUNCATE_LENGTH: usize = 100;
const DEFAULT_DECIMAL_PLACES: usize = 2;
const TIMEY_DAY_LENGTH: usize = 10;
const TIMEY_HOUR_LENGTH: usize = 13;

/// All available transformation operations
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Join the values of several paths with a space
    Concat { paths: Vec<String> },

    /// Keep the first `length` characters
    Truncate { length: usize },

    /// Render with the display date format
    Date,

    /// Render with the display time format
    Time,

    /// Render with the display datetime format
    Datetime,

    /// Drop sub-day (or sub-hour, with the `timey` setting) precision
    Timey,

    /// Collect the values of several paths into an array
    Pick { paths: Vec<String> },

    /// Sum the numeric values of several paths
    Sum { paths: Vec<String> },

    /// Sum every top-level field except the excluded ones
    ExclusiveSum { excluded: Vec<String> },

    /// Convert to lowercase
    Lowercase,

    /// Convert to uppercase
    Uppercase,

    /// Fixed-point rendering with `places` decimals
    Decimal { places: usize },

    /// Unrecognized operation name; the value passes through
    Unknown(String),
}

impl Operation {
    /// Build an operation from its configured name and parameters.
    pub fn from_parts(name: &str, params: &[Value]) -> Self {
        match name {
            "concat" => Operation::Concat {
                paths: param_paths(params),
            },
            "truncate" => Operation::Truncate {
                length: param_usize(params)
                    .filter(|n| *n > 0)
                    .unwrap_or(DEFAULT_TRUNCATE_LENGTH),
            },
            "date" => Operation::Date,
            "time" => Operation::Time,
            "datetime" => Operation::Datetime,
            "timey" => Operation::Timey,
            "pick" => Operation::Pick {
                paths: param_paths(params),
            },
            "sum" => Operation::Sum {
                paths: param_paths(params),
            },
            "exclusiveSum" => Operation::ExclusiveSum {
                excluded: param_paths(params),
            },
            "lowercase" => Operation::Lowercase,
            "uppercase" | "upercase" => Operation::Uppercase,
            "decimal" => Operation::Decimal {
                places: param_usize(params).unwrap_or(DEFAULT_DECIMAL_PLACES),
            },
            other => Operation::Unknown(other.to_string()),
        }
    }

    /// Configuration name of this operation.
    pub fn name(&self) -> &str {
        match self {
            Operation::Concat { .. } => "concat",
            Operation::Truncate { .. } => "truncate",
            Operation::Date => "date",
            Operation::Time => "time",
            Operation::Datetime => "datetime",
            Operation::Timey => "timey",
            Operation::Pick { .. } => "pick",
            Operation::Sum { .. } => "sum",
            Operation::ExclusiveSum { .. } => "exclusiveSum",
            Operation::Lowercase => "lowercase",
            Operation::Uppercase => "uppercase",
            Operation::Decimal { .. } => "decimal",
            Operation::Unknown(name) => name,
        }
    }

    /// Configuration parameters of this operation.
    pub fn params(&self) -> Vec<Value> {
        match self {
            Operation::Concat { paths }
            | Operation::Pick { paths }
            | Operation::Sum { paths }
            | Operation::ExclusiveSum { excluded: paths } => {
                paths.iter().cloned().map(Value::String).collect()
            }
            Operation::Truncate { length } => vec![Value::from(*length)],
            Operation::Decimal { places } => vec![Value::from(*places)],
            _ => Vec::new(),
        }
    }

    /// Apply this operation to `value`, the resolved (or defaulted) value of
    /// the transformation's path on `record`.
    ///
    /// # Errors
    ///
    /// Returns an [`OperationError`] when the value does not meet the
    /// operation's precondition (wrong type, unparsable date).
    pub fn apply(
        &self,
        value: Value,
        record: &Value,
        settings: &Settings,
        dates: &dyn DateTimeCapability,
    ) -> OperationResult<Value> {
        match self {
            Operation::Concat { paths } => Ok(Self::apply_concat(value, record, paths, settings)),
            Operation::Truncate { length } => Self::apply_truncate(value, *length),
            Operation::Date => {
                Self::apply_display(value, "date", &settings.display_date_format, settings, dates)
            }
            Operation::Time => {
                Self::apply_display(value, "time", &settings.display_time_format, settings, dates)
            }
            Operation::Datetime => Self::apply_display(
                value,
                "datetime",
                &settings.display_datetime_format,
                settings,
                dates,
            ),
            Operation::Timey => Self::apply_timey(value, settings, dates),
            Operation::Pick { paths } => Ok(Value::Array(
                paths
                    .iter()
                    .map(|p| resolve(record, p).cloned().unwrap_or(Value::Null))
                    .collect(),
            )),
            Operation::Sum { paths } => Ok(number_value(
                paths
                    .iter()
                    .filter_map(|p| resolve(record, p))
                    .filter_map(as_number)
                    .sum(),
            )),
            Operation::ExclusiveSum { excluded } => Ok(Self::apply_exclusive_sum(record, excluded)),
            Operation::Lowercase => Ok(Self::apply_case(value, settings, str::to_lowercase)),
            Operation::Uppercase => Ok(Self::apply_case(value, settings, str::to_uppercase)),
            Operation::Decimal { places } => Self::apply_decimal(value, *places, settings),
            Operation::Unknown(_) => Ok(value),
        }
    }

    fn apply_concat(value: Value, record: &Value, paths: &[String], settings: &Settings) -> Value {
        if paths.is_empty() {
            return value;
        }
        let parts: Vec<String> = paths
            .iter()
            .map(|p| display_string(resolve(record, p).unwrap_or(&settings.default_value)))
            .collect();
        Value::String(parts.join(" "))
    }

    fn apply_truncate(value: Value, length: usize) -> OperationResult<Value> {
        match value {
            Value::String(s) => Ok(Value::String(s.chars().take(length).collect())),
            other => Err(mismatch("truncate", "a string", &other)),
        }
    }

    fn apply_display(
        value: Value,
        operation: &'static str,
        pattern: &str,
        settings: &Settings,
        dates: &dyn DateTimeCapability,
    ) -> OperationResult<Value> {
        if settings.is_default(&value) {
            return Ok(value);
        }
        let text = value.as_str().ok_or_else(|| mismatch(operation, "a string", &value))?;
        let parsed = dates.parse(text, &settings.input_date_format)?;
        let handle = if settings.output_local_time {
            dates.to_local(parsed)
        } else {
            parsed
        };
        Ok(Value::String(dates.format(&handle, pattern)?))
    }

    fn apply_timey(
        value: Value,
        settings: &Settings,
        dates: &dyn DateTimeCapability,
    ) -> OperationResult<Value> {
        if settings.is_default(&value) {
            return Ok(value);
        }
        let text = value.as_str().ok_or_else(|| mismatch("timey", "a string", &value))?;

        // Cut the text down to "YYYY-MM-DD" or "YYYY-MM-DD HH" before parsing.
        let truncated: String = if settings.timey {
            text.chars().take(TIMEY_HOUR_LENGTH).chain(":00:00".chars()).collect()
        } else {
            text.chars().take(TIMEY_DAY_LENGTH).collect()
        };

        let pattern = &settings.input_date_format;
        let parsed = dates.parse(&truncated, pattern).or_else(|err| {
            // A bare day does not fill the time fields of the input pattern.
            match pattern.split_once(char::is_whitespace) {
                Some((date_pattern, _)) => dates.parse(&truncated, date_pattern),
                None => Err(err),
            }
        })?;

        let handle = if settings.output_local_time {
            dates.to_local(parsed)
        } else {
            parsed
        };
        Ok(Value::String(dates.format(&handle, pattern)?))
    }

    fn apply_exclusive_sum(record: &Value, excluded: &[String]) -> Value {
        let total = record
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(key, _)| !excluded.contains(key))
                    .filter_map(|(_, v)| as_number(v))
                    .sum()
            })
            .unwrap_or(0.0);
        number_value(total)
    }

    fn apply_case(value: Value, settings: &Settings, fold: fn(&str) -> String) -> Value {
        if settings.is_default(&value) {
            return value;
        }
        match value {
            Value::String(s) => Value::String(fold(&s)),
            other => other,
        }
    }

    fn apply_decimal(value: Value, places: usize, settings: &Settings) -> OperationResult<Value> {
        if settings.is_default(&value) {
            return Ok(value);
        }
        let number = as_number(&value).ok_or_else(|| mismatch("decimal", "a number", &value))?;
        Ok(Value::String(format!("{:.*}", places, round_half_up(number, places))))
    }
}

/// Round to `places` decimals with ties away from zero.
fn round_half_up(number: f64, places: usize) -> f64 {
    let Ok(exponent) = i32::try_from(places) else {
        return number;
    };
    let scale = 10f64.powi(exponent);
    let scaled = number * scale;
    if !scaled.is_finite() {
        return number;
    }
    scaled.round() / scale
}

fn mismatch(operation: &'static str, expected: &'static str, found: &Value) -> OperationError {
    OperationError::TypeMismatch {
        operation,
        expected,
        found: type_name(found).to_string(),
    }
}

fn param_paths(params: &[Value]) -> Vec<String> {
    params.iter().map(display_string).collect()
}

fn param_usize(params: &[Value]) -> Option<usize> {
    params
        .first()
        .and_then(as_number)
        .filter(|n| *n >= 0.0)
        .map(|n| n.trunc() as usize)
}

/// Get a description of all available operations
pub fn operations_description() -> String {
    r#"Available transformation operations:

| Operation | Description | Params |
|-----------|-------------|--------|
| (none) | Copy the resolved value | - |
| concat | Join values of several paths with a space | paths to join |
| truncate | Keep the first N characters | [length] (default 100) |
| date | Render with displayDateFormat | - |
| time | Render with displayTimeFormat | - |
| datetime | Render with displayDatetimeFormat | - |
| timey | Truncate to day (or hour with timey: true) | - |
| pick | Array of the values of several paths | paths to pick |
| sum | Sum of numeric values of several paths | paths to sum |
| exclusiveSum | Sum of all numeric fields except some | fields to exclude |
| lowercase | Convert to lowercase | - |
| uppercase | Convert to uppercase | - |
| decimal | Fixed-point number as string | [places] (default 2) |

Example transformations in JSON:
[
  {"name": "title", "path": "name"},
  {"name": "short_title", "path": "name", "operation": "truncate", "params": [20]},
  {"name": "created_date", "path": "created", "operation": "date"},
  {"name": "label", "path": "name", "operation": "concat", "params": ["name", "author.name"]},
  {"name": "price", "path": "price", "operation": "decimal", "params": [2]}
]"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::ChronoDateTime;
    use serde_json::json;

    fn utc_settings() -> Settings {
        Settings::default().with_output_local_time(false)
    }

    fn apply(op: &Operation, value: Value, record: &Value, settings: &Settings) -> OperationResult<Value> {
        op.apply(value, record, settings, &ChronoDateTime::new())
    }

    #[test]
    fn test_from_parts_defaults() {
        assert_eq!(
            Operation::from_parts("truncate", &[]),
            Operation::Truncate { length: 100 }
        );
        assert_eq!(
            Operation::from_parts("truncate", &[json!(0)]),
            Operation::Truncate { length: 100 }
        );
        assert_eq!(
            Operation::from_parts("decimal", &[json!("3")]),
            Operation::Decimal { places: 3 }
        );
        assert_eq!(Operation::from_parts("upercase", &[]), Operation::Uppercase);
        assert_eq!(
            Operation::from_parts("reverse", &[]),
            Operation::Unknown("reverse".to_string())
        );
    }

    #[test]
    fn test_concat() {
        let record = json!({"first": "J.R.R.", "last": "Tolkien", "born": 1892});
        let op = Operation::from_parts("concat", &[json!("first"), json!("last"), json!("born")]);
        let result = apply(&op, json!("ignored"), &record, &utc_settings()).unwrap();
        assert_eq!(result, json!("J.R.R. Tolkien 1892"));
    }

    #[test]
    fn test_concat_absent_uses_default() {
        let record = json!({"first": "Ann"});
        let settings = utc_settings().with_default_value(json!("?"));
        let op = Operation::Concat {
            paths: vec!["first".into(), "last".into()],
        };
        assert_eq!(apply(&op, json!(""), &record, &settings).unwrap(), json!("Ann ?"));
    }

    #[test]
    fn test_truncate() {
        let op = Operation::Truncate { length: 4 };
        let result = apply(&op, json!("Lord Of The Rings"), &json!({}), &utc_settings()).unwrap();
        assert_eq!(result, json!("Lord"));
    }

    #[test]
    fn test_truncate_rejects_numbers() {
        let op = Operation::Truncate { length: 4 };
        let err = apply(&op, json!(123456), &json!({}), &utc_settings()).unwrap_err();
        assert!(matches!(err, OperationError::TypeMismatch { operation: "truncate", .. }));
    }

    #[test]
    fn test_date_time_datetime() {
        let settings = utc_settings();
        let value = json!("1954-07-29 09:12:12");
        assert_eq!(
            apply(&Operation::Date, value.clone(), &json!({}), &settings).unwrap(),
            json!("07/29/1954")
        );
        assert_eq!(
            apply(&Operation::Time, value.clone(), &json!({}), &settings).unwrap(),
            json!("09:12:12")
        );
        assert_eq!(
            apply(&Operation::Datetime, value, &json!({}), &settings).unwrap(),
            json!("07/29/1954 09:12:12")
        );
    }

    #[test]
    fn test_date_skips_default() {
        let settings = utc_settings();
        assert_eq!(apply(&Operation::Date, json!(""), &json!({}), &settings).unwrap(), json!(""));
    }

    #[test]
    fn test_date_invalid() {
        let err = apply(&Operation::Date, json!("yesterday"), &json!({}), &utc_settings()).unwrap_err();
        assert!(matches!(err, OperationError::InvalidDate { .. }));
    }

    #[test]
    fn test_timey_day_and_hour() {
        let value = json!("2001-09-01 11:48:21");
        let day = apply(&Operation::Timey, value.clone(), &json!({}), &utc_settings()).unwrap();
        assert_eq!(day, json!("2001-09-01 00:00:00"));

        let hourly = utc_settings().with_timey(true);
        let hour = apply(&Operation::Timey, value, &json!({}), &hourly).unwrap();
        assert_eq!(hour, json!("2001-09-01 11:00:00"));
    }

    #[test]
    fn test_timey_date_only_and_fractional_seconds() {
        let settings = utc_settings();
        let date_only = apply(&Operation::Timey, json!("2001-09-01"), &json!({}), &settings).unwrap();
        assert_eq!(date_only, json!("2001-09-01 00:00:00"));

        let fractional = json!("2001-09-01 11:48:21.500");
        let day = apply(&Operation::Timey, fractional.clone(), &json!({}), &settings).unwrap();
        assert_eq!(day, json!("2001-09-01 00:00:00"));

        let hourly = utc_settings().with_timey(true);
        let hour = apply(&Operation::Timey, fractional, &json!({}), &hourly).unwrap();
        assert_eq!(hour, json!("2001-09-01 11:00:00"));
    }

    #[test]
    fn test_timey_invalid() {
        let err = apply(&Operation::Timey, json!("someday"), &json!({}), &utc_settings()).unwrap_err();
        assert!(matches!(err, OperationError::InvalidDate { .. }));
    }

    #[test]
    fn test_pick() {
        let record = json!({"id": 1, "author": {"name": "Tolkien"}});
        let op = Operation::Pick {
            paths: vec!["id".into(), "author.name".into(), "missing".into()],
        };
        let result = apply(&op, json!(""), &record, &utc_settings()).unwrap();
        assert_eq!(result, json!([1, "Tolkien", null]));
    }

    #[test]
    fn test_sum_same_record() {
        let record = json!({"a": 1, "b": {"c": 2.5}, "d": "3", "e": "x"});
        let op = Operation::Sum {
            paths: vec!["a".into(), "b.c".into(), "d".into(), "e".into(), "missing".into()],
        };
        assert_eq!(apply(&op, json!(""), &record, &utc_settings()).unwrap(), json!(6.5));
    }

    #[test]
    fn test_exclusive_sum() {
        let record = json!({"id": 100, "q1": 10, "q2": 20, "label": "total"});
        let op = Operation::ExclusiveSum {
            excluded: vec!["id".into()],
        };
        assert_eq!(apply(&op, json!(""), &record, &utc_settings()).unwrap(), json!(30));
    }

    #[test]
    fn test_case_folding() {
        let settings = utc_settings().with_default_value(json!("N/A"));
        assert_eq!(
            apply(&Operation::Lowercase, json!("HeLLo"), &json!({}), &settings).unwrap(),
            json!("hello")
        );
        assert_eq!(
            apply(&Operation::Uppercase, json!("HeLLo"), &json!({}), &settings).unwrap(),
            json!("HELLO")
        );
        assert_eq!(
            apply(&Operation::Uppercase, json!("N/A"), &json!({}), &settings).unwrap(),
            json!("N/A")
        );
        assert_eq!(
            apply(&Operation::Lowercase, json!(12), &json!({}), &settings).unwrap(),
            json!(12)
        );
    }

    #[test]
    fn test_decimal() {
        let op = Operation::Decimal { places: 2 };
        assert_eq!(
            apply(&op, json!(3.14159), &json!({}), &utc_settings()).unwrap(),
            json!("3.14")
        );
        assert_eq!(
            apply(&op, json!("7"), &json!({}), &utc_settings()).unwrap(),
            json!("7.00")
        );
        assert_eq!(apply(&op, json!(""), &json!({}), &utc_settings()).unwrap(), json!(""));
        assert!(apply(&op, json!("abc"), &json!({}), &utc_settings()).is_err());
    }

    #[test]
    fn test_decimal_ties_round_up() {
        let whole = Operation::Decimal { places: 0 };
        assert_eq!(apply(&whole, json!(2.5), &json!({}), &utc_settings()).unwrap(), json!("3"));

        let cents = Operation::Decimal { places: 2 };
        assert_eq!(apply(&cents, json!(0.125), &json!({}), &utc_settings()).unwrap(), json!("0.13"));
        assert_eq!(apply(&cents, json!(-0.125), &json!({}), &utc_settings()).unwrap(), json!("-0.13"));
    }

    #[test]
    fn test_unknown_passes_through() {
        let op = Operation::Unknown("reverse".into());
        assert_eq!(apply(&op, json!("abc"), &json!({}), &utc_settings()).unwrap(), json!("abc"));
    }
}
