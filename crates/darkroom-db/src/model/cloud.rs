//! Field mapping between local camelCase records and cloud snake_case rows.
//!
//! The two schemas evolve independently, so reads from the cloud accept the
//! snake_case name, the local name, or any declared alias for each column,
//! and coerce loosely typed values (numbers as strings, JSON as text) into
//! the shape the local column expects.

use serde_json::{Map, Value};

use crate::db::schema::ColumnKind;
use crate::error::{DbError, DbResult};
use crate::model::CloudRecord;

/// A row as the cloud returns it.
pub type CloudRow = Map<String, Value>;

/// ## Summary
/// Converts a camelCase column name to the cloud's snake_case spelling.
#[must_use]
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// ## Summary
/// Reads the row id, accepting numeric ids.
#[must_use]
pub fn cloud_id(row: &CloudRow) -> Option<String> {
    match row.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// ## Summary
/// Shapes a local record as a cloud row.
///
/// ## Errors
/// Returns an error if the record does not serialize to an object.
pub fn to_cloud<R: CloudRecord>(record: &R) -> DbResult<CloudRow> {
    let Value::Object(mut local) = serde_json::to_value(record)? else {
        return Err(DbError::DecodeError {
            table: R::SCHEMA.name,
            message: "record is not an object".to_string(),
        });
    };

    let mut row = CloudRow::new();
    for column in R::SCHEMA.columns {
        let value = local.remove(column.name).unwrap_or(Value::Null);
        row.insert(snake_case(column.name), value);
    }
    Ok(row)
}

/// ## Summary
/// Decodes a cloud row into a local record, tolerating renamed and loosely
/// typed fields.
///
/// ## Errors
/// Returns `DecodeError` when the row still does not form a valid record.
pub fn from_cloud<R: CloudRecord>(row: &CloudRow) -> DbResult<R> {
    let mut object = Map::new();
    for column in R::SCHEMA.columns {
        let snake = snake_case(column.name);
        let aliases = R::CLOUD_ALIASES
            .iter()
            .find(|(local, _)| *local == column.name)
            .map_or(&[][..], |(_, names)| *names);

        let found = std::iter::once(snake.as_str())
            .chain(std::iter::once(column.name))
            .chain(aliases.iter().copied())
            .find_map(|name| row.get(name).filter(|value| !value.is_null()));

        let value = found.map_or(Value::Null, |value| coerce(column.kind, value));
        object.insert(column.name.to_string(), value);
    }

    R::normalize_cloud(&mut object);
    serde_json::from_value(Value::Object(object)).map_err(|err| DbError::DecodeError {
        table: R::SCHEMA.name,
        message: err.to_string(),
    })
}

fn coerce(kind: ColumnKind, value: &Value) -> Value {
    match (kind, value) {
        (ColumnKind::Json, Value::String(text)) => {
            serde_json::from_str(text).unwrap_or_else(|_| value.clone())
        }
        (ColumnKind::Boolean, Value::Number(n)) => Value::Bool(n.as_i64().is_some_and(|n| n != 0)),
        (ColumnKind::Boolean, Value::String(text)) => {
            Value::Bool(matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "1" | "t" | "yes"))
        }
        (ColumnKind::Integer, Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map_or_else(|_| value.clone(), Value::from),
        (ColumnKind::Real, Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map_or_else(|| value.clone(), Value::Number),
        (ColumnKind::Text, Value::Number(n)) => Value::String(n.to_string()),
        (ColumnKind::Text, Value::Bool(flag)) => Value::String(flag.to_string()),
        _ => value.clone(),
    }
}

/// ## Summary
/// Trims a timestamp down to its calendar date (`2026-01-01T00:00:00Z` → `2026-01-01`).
pub(crate) fn date_only(object: &mut Map<String, Value>, field: &str) {
    if let Some(Value::String(text)) = object.get_mut(field)
        && text.len() > 10
        && text.is_char_boundary(10)
    {
        text.truncate(10);
    }
}

/// ## Summary
/// Pads an `HH:MM` clock time to `HH:MM:SS`.
pub(crate) fn full_time(object: &mut Map<String, Value>, field: &str) {
    if let Some(Value::String(text)) = object.get_mut(field)
        && text.len() == 5
    {
        text.push_str(":00");
    }
}
