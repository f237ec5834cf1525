//! Errors raised when rebuilding records from generic maps.

use crate::{Context, Value};

/// A map could not be turned back into a record.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A required key is absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A key is present but holds the wrong kind of value
    #[error("invalid field {field}: expected {expected}")]
    InvalidField {
        /// Offending key
        field: &'static str,
        /// What was expected there
        expected: &'static str,
    },
}

/// Result alias for snapshot conversions.
pub type Result<T> = std::result::Result<T, SnapshotError>;

pub(crate) fn required<'a>(map: &'a Context, field: &'static str) -> Result<&'a Value> {
    map.get(field).ok_or(SnapshotError::MissingField(field))
}

pub(crate) fn required_str(map: &Context, field: &'static str) -> Result<String> {
    required(map, field)?
        .as_str()
        .map(str::to_string)
        .ok_or(SnapshotError::InvalidField { field, expected: "text" })
}

pub(crate) fn required_f64(map: &Context, field: &'static str) -> Result<f64> {
    required(map, field)?
        .as_f64()
        .ok_or(SnapshotError::InvalidField { field, expected: "number" })
}

pub(crate) fn required_bool(map: &Context, field: &'static str) -> Result<bool> {
    required(map, field)?
        .as_bool()
        .ok_or(SnapshotError::InvalidField { field, expected: "bool" })
}

pub(crate) fn required_map(map: &Context, field: &'static str) -> Result<Context> {
    match required(map, field)? {
        Value::Map(inner) => Ok(inner.clone()),
        _ => Err(SnapshotError::InvalidField { field, expected: "map" }),
    }
}

/// RFC 3339 with nanoseconds, so a timestamp survives the map round-trip.
pub(crate) fn time_to_value(time: &crate::Time) -> Value {
    time.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true).into()
}

pub(crate) fn required_time(map: &Context, field: &'static str) -> Result<crate::Time> {
    let raw = required(map, field)?
        .as_str()
        .ok_or(SnapshotError::InvalidField { field, expected: "RFC 3339 text" })?;
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|_| SnapshotError::InvalidField { field, expected: "RFC 3339 text" })
}
