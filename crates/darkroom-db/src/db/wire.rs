//! Values, statements and rows as they cross the local store boundary.

use serde::{Deserialize, Serialize};

use crate::error::{DbError, DbResult};

/// A single SQL value. Mirrors SQLite's storage classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(value) => value.parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<SqlValue> for sea_query::Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::String(None),
            SqlValue::Integer(value) => Self::BigInt(Some(value)),
            SqlValue::Real(value) => Self::Double(Some(value)),
            SqlValue::Text(value) => value.into(),
            SqlValue::Blob(value) => value.into(),
        }
    }
}

impl TryFrom<sea_query::Value> for SqlValue {
    type Error = DbError;

    fn try_from(value: sea_query::Value) -> DbResult<Self> {
        use sea_query::Value as V;

        let converted = match value {
            V::Bool(value) => value.map_or(Self::Null, |flag| Self::Integer(i64::from(flag))),
            V::TinyInt(value) => value.map_or(Self::Null, |n| Self::Integer(i64::from(n))),
            V::SmallInt(value) => value.map_or(Self::Null, |n| Self::Integer(i64::from(n))),
            V::Int(value) => value.map_or(Self::Null, |n| Self::Integer(i64::from(n))),
            V::BigInt(value) => value.map_or(Self::Null, Self::Integer),
            V::TinyUnsigned(value) => value.map_or(Self::Null, |n| Self::Integer(i64::from(n))),
            V::SmallUnsigned(value) => value.map_or(Self::Null, |n| Self::Integer(i64::from(n))),
            V::Unsigned(value) => value.map_or(Self::Null, |n| Self::Integer(i64::from(n))),
            V::BigUnsigned(Some(n)) => Self::Integer(
                i64::try_from(n)
                    .map_err(|_err| DbError::UnsupportedValue(format!("{n} overflows i64")))?,
            ),
            V::BigUnsigned(None) => Self::Null,
            V::Float(value) => value.map_or(Self::Null, |n| Self::Real(f64::from(n))),
            V::Double(value) => value.map_or(Self::Null, Self::Real),
            V::String(value) => value.map_or(Self::Null, |text| Self::Text(text.to_string())),
            V::Char(value) => value.map_or(Self::Null, |c| Self::Text(c.to_string())),
            V::Bytes(value) => value.map_or(Self::Null, |bytes| Self::Blob(bytes.to_vec())),
            #[expect(unreachable_patterns)]
            other => return Err(DbError::UnsupportedValue(format!("{other:?}"))),
        };
        Ok(converted)
    }
}

/// Whether a statement returns rows or only an affected-row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Query,
    Execute,
}

/// Compiled SQL text with positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub kind: StatementKind,
}

impl Statement {
    #[must_use]
    pub fn query(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind: StatementKind::Query,
        }
    }

    #[must_use]
    pub fn execute(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
            kind: StatementKind::Execute,
        }
    }

    /// ## Summary
    /// Builds a statement from sea-query output.
    ///
    /// ## Errors
    /// Returns `UnsupportedValue` if a bound value has no SQLite storage class.
    pub fn from_built(built: (String, sea_query::Values), kind: StatementKind) -> DbResult<Self> {
        let (sql, values) = built;
        let params = values
            .0
            .into_iter()
            .map(SqlValue::try_from)
            .collect::<DbResult<Vec<_>>>()?;
        Ok(Self { sql, params, kind })
    }
}

/// One result row. Column order follows the statement's projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A request sent to the privileged side of the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "body", rename_all = "snake_case")]
pub enum BridgeRequest {
    Run(Statement),
    /// Executed inside a single transaction; any failure rolls back every statement.
    Atomic(Vec<Statement>),
}

/// Result of one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeOutput {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}
