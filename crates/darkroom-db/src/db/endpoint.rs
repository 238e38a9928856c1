//! Privileged side of the local store: executes bridge requests against SQLite.

use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row as _, SqliteConnection, SqlitePool, TypeInfo, ValueRef};

use crate::db::wire::{BridgeOutput, BridgeRequest, Row, SqlValue, Statement, StatementKind};
use crate::error::{DbError, DbResult};

/// Executes statements on a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteEndpoint {
    pool: SqlitePool,
}

impl SqliteEndpoint {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// ## Summary
    /// Handles one bridge request.
    ///
    /// ## Errors
    /// Returns the SQLite error of the failing statement. Atomic requests are
    /// rolled back before the error is returned.
    pub async fn handle(&self, request: BridgeRequest) -> DbResult<Vec<BridgeOutput>> {
        match request {
            BridgeRequest::Run(statement) => {
                let mut conn = self.pool.acquire().await?;
                Ok(vec![execute(&mut conn, statement).await?])
            }
            BridgeRequest::Atomic(statements) => self.handle_atomic(statements).await,
        }
    }

    #[tracing::instrument(skip(self, statements), fields(count = statements.len()))]
    async fn handle_atomic(&self, statements: Vec<Statement>) -> DbResult<Vec<BridgeOutput>> {
        let mut tx = self.pool.begin().await?;
        let mut outputs = Vec::with_capacity(statements.len());

        for statement in statements {
            match execute(&mut tx, statement).await {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    tracing::debug!(error = %err, "Rolling back atomic batch");
                    tx.rollback().await?;
                    return Err(err);
                }
            }
        }

        tx.commit().await?;
        Ok(outputs)
    }
}

async fn execute(conn: &mut SqliteConnection, statement: Statement) -> DbResult<BridgeOutput> {
    tracing::trace!(sql = %statement.sql, params = statement.params.len(), "Executing statement");

    let Statement { sql, params, kind } = statement;
    let query = bind_params(sqlx::query(&sql), &params);

    match kind {
        StatementKind::Query => {
            let rows = query.fetch_all(&mut *conn).await?;
            let rows = rows.iter().map(decode_row).collect::<DbResult<Vec<_>>>()?;
            Ok(BridgeOutput {
                rows_affected: 0,
                rows,
            })
        }
        StatementKind::Execute => {
            let result = query.execute(&mut *conn).await?;
            Ok(BridgeOutput {
                rows: Vec::new(),
                rows_affected: result.rows_affected(),
            })
        }
    }
}

fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(value) => query.bind(*value),
            SqlValue::Real(value) => query.bind(*value),
            SqlValue::Text(value) => query.bind(value.as_str()),
            SqlValue::Blob(value) => query.bind(value.as_slice()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> DbResult<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            match type_name.as_str() {
                "INTEGER" | "BIGINT" | "INT" | "BOOLEAN" => {
                    SqlValue::Integer(row.try_get_unchecked::<i64, _>(idx)?)
                }
                "REAL" | "FLOAT" | "DOUBLE" => SqlValue::Real(row.try_get_unchecked::<f64, _>(idx)?),
                "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
                "TEXT" | "DATETIME" | "DATE" | "TIME" => {
                    SqlValue::Text(row.try_get_unchecked::<String, _>(idx)?)
                }
                other => {
                    return Err(DbError::EndpointError(format!(
                        "unsupported column type {other} for {}",
                        column.name()
                    )));
                }
            }
        };
        decoded.push(column.name(), value);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::create_local_pool;

    async fn endpoint() -> SqliteEndpoint {
        let pool = create_local_pool("sqlite::memory:", 1)
            .await
            .expect("in-memory pool");
        let endpoint = SqliteEndpoint::new(pool);
        endpoint
            .handle(BridgeRequest::Run(Statement::execute(
                "CREATE TABLE t (id TEXT PRIMARY KEY, n INTEGER, r REAL, b BLOB)",
                vec![],
            )))
            .await
            .expect("create table");
        endpoint
    }

    #[test_log::test(tokio::test)]
    async fn test_values_round_trip_by_storage_class() {
        let endpoint = endpoint().await;
        endpoint
            .handle(BridgeRequest::Run(Statement::execute(
                "INSERT INTO t (id, n, r, b) VALUES (?, ?, ?, ?)",
                vec![
                    SqlValue::from("a"),
                    SqlValue::Integer(7),
                    SqlValue::Real(1.5),
                    SqlValue::Null,
                ],
            )))
            .await
            .expect("insert");

        let outputs = endpoint
            .handle(BridgeRequest::Run(Statement::query(
                "SELECT id, n, r, b FROM t",
                vec![],
            )))
            .await
            .expect("select");
        let row = &outputs[0].rows[0];

        assert_eq!(row.get("id"), Some(&SqlValue::from("a")));
        assert_eq!(row.get("n"), Some(&SqlValue::Integer(7)));
        assert_eq!(row.get("r"), Some(&SqlValue::Real(1.5)));
        assert_eq!(row.get("b"), Some(&SqlValue::Null));
    }

    #[test_log::test(tokio::test)]
    async fn test_atomic_failure_rolls_back() {
        let endpoint = endpoint().await;
        let result = endpoint
            .handle(BridgeRequest::Atomic(vec![
                Statement::execute("INSERT INTO t (id) VALUES (?)", vec![SqlValue::from("x")]),
                Statement::execute("INSERT INTO missing (id) VALUES (?)", vec![]),
            ]))
            .await;
        assert!(result.is_err());

        let outputs = endpoint
            .handle(BridgeRequest::Run(Statement::query("SELECT id FROM t", vec![])))
            .await
            .expect("select");
        assert!(outputs[0].rows.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_execute_reports_rows_affected() {
        let endpoint = endpoint().await;
        let outputs = endpoint
            .handle(BridgeRequest::Atomic(vec![
                Statement::execute("INSERT INTO t (id) VALUES ('a')", vec![]),
                Statement::execute("INSERT INTO t (id) VALUES ('b')", vec![]),
                Statement::execute("DELETE FROM t", vec![]),
            ]))
            .await
            .expect("batch");

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[2].rows_affected, 2);
    }
}
