use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// Wrap a decoding failure so it can leave a `query_map` closure.
pub fn invalid_column(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        err.to_string(),
    )))
}

/// Column value from an event projection; absent keys become NULL.
///
/// Integers outside SQLite's signed 64-bit range are rejected rather than
/// stored as REAL, which would not decode back into the event.
pub fn projected(projection: &Map<String, Value>, column: &str) -> Result<SqlValue> {
    let value = match projection.get(column) {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::String(text)) => SqlValue::Text(text.clone()),
        Some(Value::Number(number)) => match number.as_u64() {
            Some(unsigned) => SqlValue::Integer(
                to_i64(unsigned).with_context(|| format!("{column} out of range"))?,
            ),
            None => number
                .as_i64()
                .map(SqlValue::Integer)
                .ok_or_else(|| anyhow!("{column} is not an integer: {number}"))?,
        },
        Some(Value::Bool(flag)) => SqlValue::Integer(i64::from(*flag)),
        Some(other) => SqlValue::Text(other.to_string()),
    };
    Ok(value)
}
