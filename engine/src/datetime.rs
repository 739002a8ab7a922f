//! Date/time capability used by the `date`, `time`, `datetime` and `timey`
//! operations.
//!
//! The engine only ever needs three things: parse a string with an input
//! pattern (values are taken as UTC), shift a parsed value to local time,
//! and render it with an output pattern. [`DateTimeCapability`] is that seam;
//! [`ChronoDateTime`] is the chrono-backed implementation.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{OperationError, OperationResult};

/// Parse, localize and format date/time values.
pub trait DateTimeCapability: Send + Sync {
    /// Parse `value` with `pattern`, interpreting it as UTC.
    fn parse(&self, value: &str, pattern: &str) -> OperationResult<DateTime<FixedOffset>>;

    /// Convert a parsed value to local time.
    fn to_local(&self, handle: DateTime<FixedOffset>) -> DateTime<FixedOffset>;

    /// Render `handle` with `pattern`.
    fn format(&self, handle: &DateTime<FixedOffset>, pattern: &str) -> OperationResult<String>;
}

/// chrono implementation. Local time is the system zone unless a fixed
/// offset is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoDateTime {
    local_offset: Option<FixedOffset>,
}

impl ChronoDateTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `offset` as "local time" instead of the system zone.
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            local_offset: Some(offset),
        }
    }
}

impl DateTimeCapability for ChronoDateTime {
    fn parse(&self, value: &str, pattern: &str) -> OperationResult<DateTime<FixedOffset>> {
        // Date-only patterns have no time fields; those land on midnight.
        let naive = NaiveDateTime::parse_from_str(value, pattern)
            .or_else(|_| {
                NaiveDate::parse_from_str(value, pattern)
                    .map(|date| date.and_time(NaiveTime::default()))
            })
            .map_err(|_| OperationError::InvalidDate {
                value: value.to_string(),
                pattern: pattern.to_string(),
            })?;
        Ok(Utc.from_utc_datetime(&naive).fixed_offset())
    }

    fn to_local(&self, handle: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        match self.local_offset {
            Some(offset) => handle.with_timezone(&offset),
            None => handle.with_timezone(&Local).fixed_offset(),
        }
    }

    fn format(&self, handle: &DateTime<FixedOffset>, pattern: &str) -> OperationResult<String> {
        let mut rendered = String::new();
        write!(rendered, "{}", handle.format(pattern))
            .map_err(|_| OperationError::InvalidPattern(pattern.to_string()))?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "%Y-%m-%d %H:%M:%S";

    #[test]
    fn test_parse_and_format() {
        let dates = ChronoDateTime::new();
        let parsed = dates.parse("1954-07-29 09:12:12", INPUT).unwrap();
        assert_eq!(dates.format(&parsed, "%m/%d/%Y").unwrap(), "07/29/1954");
        assert_eq!(dates.format(&parsed, "%H:%M:%S").unwrap(), "09:12:12");
    }

    #[test]
    fn test_parse_date_only_pattern() {
        let dates = ChronoDateTime::new();
        let parsed = dates.parse("2001-09-01", "%Y-%m-%d").unwrap();
        assert_eq!(dates.format(&parsed, INPUT).unwrap(), "2001-09-01 00:00:00");
    }

    #[test]
    fn test_parse_failure() {
        let dates = ChronoDateTime::new();
        let err = dates.parse("not a date", INPUT).unwrap_err();
        assert!(matches!(err, OperationError::InvalidDate { .. }));
    }

    #[test]
    fn test_fixed_local_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let dates = ChronoDateTime::with_offset(offset);
        let parsed = dates.parse("1982-04-21 14:21:00", INPUT).unwrap();
        let local = dates.to_local(parsed);
        assert_eq!(dates.format(&local, "%H:%M").unwrap(), "16:21");
    }

    #[test]
    fn test_invalid_output_pattern() {
        let dates = ChronoDateTime::new();
        let parsed = dates.parse("1982-04-21 14:21:00", INPUT).unwrap();
        assert!(dates.format(&parsed, "%Y-%").is_err());
    }
}
