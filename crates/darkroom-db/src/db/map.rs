//! Mapping between JSON-shaped records and SQL rows for a table schema.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::db::schema::{ColumnKind, TableSchema};
use crate::db::wire::{Row, SqlValue};
use crate::error::{DbError, DbResult};

/// ## Summary
/// Converts a serializable record to column values, in schema column order.
/// Fields missing from the record bind as NULL; fields the schema does not
/// know are ignored.
///
/// ## Errors
/// Returns an error if the record does not serialize to a JSON object or a
/// field does not fit its column kind.
pub fn record_values<R: Serialize>(
    schema: &TableSchema,
    record: &R,
) -> DbResult<Vec<(&'static str, SqlValue)>> {
    let value = serde_json::to_value(record)?;
    object_values(schema, &value)
}

/// ## Summary
/// Same as [`record_values`] for an already-built JSON object.
///
/// ## Errors
/// Returns `DecodeError` when `value` is not an object or a field does not
/// fit its column kind.
pub fn object_values(
    schema: &TableSchema,
    value: &Value,
) -> DbResult<Vec<(&'static str, SqlValue)>> {
    let Value::Object(object) = value else {
        return Err(decode_error(schema, "record is not an object"));
    };

    schema
        .columns
        .iter()
        .map(|column| {
            let field = object.get(column.name).unwrap_or(&Value::Null);
            let sql = to_sql(column.kind, field).ok_or_else(|| {
                decode_error(
                    schema,
                    &format!("field {} does not fit {:?}", column.name, column.kind),
                )
            })?;
            Ok((column.name, sql))
        })
        .collect()
}

/// ## Summary
/// Converts one field to its SQL representation. `None` when the value
/// cannot be stored in a column of `kind`.
#[must_use]
pub fn to_sql(kind: ColumnKind, value: &Value) -> Option<SqlValue> {
    if value.is_null() {
        return Some(SqlValue::Null);
    }
    match kind {
        ColumnKind::Text => Some(match value {
            Value::String(text) => SqlValue::Text(text.clone()),
            other => SqlValue::Text(other.to_string()),
        }),
        ColumnKind::Integer => match value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(truncate))
                .map(SqlValue::Integer),
            Value::Bool(flag) => Some(SqlValue::from(*flag)),
            Value::String(text) => text.trim().parse().ok().map(SqlValue::Integer),
            _ => None,
        },
        ColumnKind::Real => match value {
            Value::Number(number) => number.as_f64().map(SqlValue::Real),
            Value::String(text) => text.trim().parse().ok().map(SqlValue::Real),
            _ => None,
        },
        ColumnKind::Boolean => match value {
            Value::Bool(flag) => Some(SqlValue::from(*flag)),
            Value::Number(number) => number.as_i64().map(|n| SqlValue::from(n != 0)),
            _ => None,
        },
        ColumnKind::Json => serde_json::to_string(value).ok().map(SqlValue::Text),
    }
}

#[expect(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}

/// ## Summary
/// Converts a row back to a JSON object keyed by column name.
///
/// ## Errors
/// Returns `DecodeError` when a JSON column holds malformed text.
pub fn row_to_object(schema: &TableSchema, row: &Row) -> DbResult<Map<String, Value>> {
    let mut object = Map::new();
    for column in schema.columns {
        let value = match row.get(column.name) {
            None | Some(SqlValue::Null) => Value::Null,
            Some(value) => from_sql(column.kind, value).ok_or_else(|| {
                decode_error(
                    schema,
                    &format!("column {} holds {value:?}", column.name),
                )
            })?,
        };
        object.insert(column.name.to_string(), value);
    }
    Ok(object)
}

fn from_sql(kind: ColumnKind, value: &SqlValue) -> Option<Value> {
    match (kind, value) {
        (_, SqlValue::Null) => Some(Value::Null),
        (ColumnKind::Text, SqlValue::Text(text)) => Some(Value::String(text.clone())),
        (ColumnKind::Text, SqlValue::Integer(n)) => Some(Value::String(n.to_string())),
        (ColumnKind::Text, SqlValue::Real(n)) => Some(Value::String(n.to_string())),
        (ColumnKind::Integer, SqlValue::Integer(n)) => Some(Value::from(*n)),
        (ColumnKind::Integer, SqlValue::Real(n)) => Some(Value::from(truncate(*n))),
        (ColumnKind::Real, SqlValue::Real(n)) => Number::from_f64(*n).map(Value::Number),
        #[expect(clippy::cast_precision_loss)]
        (ColumnKind::Real, SqlValue::Integer(n)) => Number::from_f64(*n as f64).map(Value::Number),
        (ColumnKind::Boolean, SqlValue::Integer(n)) => Some(Value::Bool(*n != 0)),
        (ColumnKind::Json, SqlValue::Text(text)) => serde_json::from_str(text).ok(),
        _ => None,
    }
}

/// ## Summary
/// Decodes a row into a typed record.
///
/// ## Errors
/// Returns `DecodeError` naming the table when the row does not match the record.
pub fn decode_row<R: DeserializeOwned>(schema: &TableSchema, row: &Row) -> DbResult<R> {
    let object = row_to_object(schema, row)?;
    serde_json::from_value(Value::Object(object))
        .map_err(|err| decode_error(schema, &err.to_string()))
}

fn decode_error(schema: &TableSchema, message: &str) -> DbError {
    DbError::DecodeError {
        table: schema.name,
        message: message.to_string(),
    }
}
