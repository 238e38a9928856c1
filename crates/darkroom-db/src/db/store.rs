//! Typed façade over a [`LocalBridge`].

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::db::LocalBridge;
use crate::db::lock::{RowGuard, RowLocks};
use crate::db::map::{decode_row, object_values, record_values, row_to_object};
use crate::db::query::{self, Direction, Filter};
use crate::db::schema::{ALL_TABLES, TableSchema};
use crate::db::transaction::LocalTransaction;
use crate::db::wire::{BridgeOutput, SqlValue, Statement};
use crate::error::{DbError, DbResult};
use crate::model::LocalRecord;

/// Handle to the local store. Cheap to clone; clones share the bridge and row locks.
#[derive(Clone)]
pub struct LocalStore {
    bridge: Arc<dyn LocalBridge>,
    locks: RowLocks,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    #[must_use]
    pub fn new(bridge: Arc<dyn LocalBridge>) -> Self {
        Self {
            bridge,
            locks: RowLocks::new(),
        }
    }

    /// ## Summary
    /// Creates every table that does not exist yet, in one transaction.
    ///
    /// ## Errors
    /// Returns an error if any DDL statement fails.
    #[tracing::instrument(skip(self))]
    pub async fn migrate(&self) -> DbResult<()> {
        let statements = ALL_TABLES
            .iter()
            .map(|schema| schema.create_statement())
            .collect();
        self.bridge.run_atomic(statements).await?;
        tracing::debug!(tables = ALL_TABLES.len(), "Local schema up to date");
        Ok(())
    }

    /// ## Summary
    /// Serialises work on one row. Hold the guard across read-modify-write.
    pub async fn lock_row(&self, table: &str, id: &str) -> RowGuard {
        self.locks.lock(table, id).await
    }

    /// ## Summary
    /// Runs a raw statement.
    ///
    /// ## Errors
    /// Returns an error if the bridge or endpoint fails.
    pub async fn run(&self, statement: Statement) -> DbResult<BridgeOutput> {
        self.bridge.run(statement).await
    }

    /// ## Summary
    /// Runs statements atomically.
    ///
    /// ## Errors
    /// Returns the first failing statement's error; nothing is applied.
    pub async fn run_atomic(&self, statements: Vec<Statement>) -> DbResult<Vec<BridgeOutput>> {
        self.bridge.run_atomic(statements).await
    }

    /// ## Summary
    /// Every row of the record's table.
    ///
    /// ## Errors
    /// Returns an error if the query fails. Rows that do not decode are skipped.
    pub async fn all<R: LocalRecord>(&self) -> DbResult<Vec<R>> {
        self.list(None, None).await
    }

    /// ## Summary
    /// Rows matching `filter`, optionally ordered.
    ///
    /// ## Errors
    /// Returns an error if the query fails. Rows that do not decode are skipped
    /// with a warning.
    pub async fn find_where<R: LocalRecord>(
        &self,
        filter: Filter,
        order: Option<(&'static str, Direction)>,
    ) -> DbResult<Vec<R>> {
        self.list(Some(&filter), order).await
    }

    async fn list<R: LocalRecord>(
        &self,
        filter: Option<&Filter>,
        order: Option<(&'static str, Direction)>,
    ) -> DbResult<Vec<R>> {
        let schema = R::SCHEMA;
        let output = self.bridge.run(query::select(schema, filter, order)?).await?;

        let mut records = Vec::with_capacity(output.rows.len());
        for row in &output.rows {
            match decode_row::<R>(schema, row) {
                Ok(record) => records.push(record),
                Err(err) => tracing::warn!(
                    table = schema.name,
                    id = ?row.get(schema.primary_key),
                    error = %err,
                    "Skipping row that does not decode"
                ),
            }
        }
        Ok(records)
    }

    /// ## Summary
    /// Looks a record up by primary key.
    ///
    /// ## Errors
    /// Returns an error if the query fails or the stored row does not decode.
    pub async fn find<R: LocalRecord>(&self, id: impl Into<SqlValue>) -> DbResult<Option<R>> {
        let schema = R::SCHEMA;
        let filter = Filter::Eq(schema.primary_key, id.into());
        let output = self.bridge.run(query::select(schema, Some(&filter), None)?).await?;

        output
            .rows
            .first()
            .map(|row| decode_row::<R>(schema, row))
            .transpose()
    }

    /// ## Summary
    /// Rows of `schema` matching `filter` as JSON objects keyed by local column
    /// name. Used where the record type is only known by table.
    ///
    /// ## Errors
    /// Returns an error if the query fails or a row does not map to its schema.
    pub async fn find_objects(
        &self,
        schema: &TableSchema,
        filter: &Filter,
    ) -> DbResult<Vec<Map<String, Value>>> {
        let output = self.bridge.run(query::select(schema, Some(filter), None)?).await?;
        output
            .rows
            .iter()
            .map(|row| row_to_object(schema, row))
            .collect()
    }

    /// ## Errors
    /// Returns an error if the query fails or the row does not map to its schema.
    pub async fn find_object(
        &self,
        schema: &TableSchema,
        id: impl Into<SqlValue>,
    ) -> DbResult<Option<Map<String, Value>>> {
        let filter = Filter::Eq(schema.primary_key, id.into());
        Ok(self.find_objects(schema, &filter).await?.into_iter().next())
    }

    /// ## Summary
    /// Inserts or replaces a record by primary key.
    ///
    /// ## Errors
    /// Returns an error if the record does not map to its table or the write fails.
    pub async fn upsert<R: LocalRecord>(&self, record: &R) -> DbResult<()> {
        self.bridge
            .run(query::upsert(R::SCHEMA, record_values(R::SCHEMA, record)?)?)
            .await?;
        Ok(())
    }

    /// Whether the store drops every statement (no local backing).
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.bridge.is_detached()
    }

    /// ## Summary
    /// Inserts a JSON-shaped row and returns the store-assigned key.
    /// A detached store keeps nothing and yields `None`.
    ///
    /// ## Errors
    /// Returns an error if the insert fails, or a backed store returns no key.
    pub async fn insert_returning_key(&self, schema: &TableSchema, row: &Value) -> DbResult<Option<i64>> {
        let output = self
            .bridge
            .run(query::insert_returning_key(schema, object_values(schema, row)?)?)
            .await?;
        if self.is_detached() {
            return Ok(None);
        }
        output
            .rows
            .first()
            .and_then(|row| row.get(schema.primary_key))
            .and_then(SqlValue::as_integer)
            .map(Some)
            .ok_or_else(|| DbError::DecodeError {
                table: schema.name,
                message: "insert returned no key".to_string(),
            })
    }

    /// ## Summary
    /// Deletes a record by primary key. Returns the number of rows removed.
    ///
    /// ## Errors
    /// Returns an error if the delete fails.
    pub async fn delete<R: LocalRecord>(&self, id: impl Into<SqlValue>) -> DbResult<u64> {
        let schema = R::SCHEMA;
        self.delete_where(schema, &Filter::Eq(schema.primary_key, id.into()))
            .await
    }

    /// ## Summary
    /// Deletes every row of `schema` matching `filter`.
    ///
    /// ## Errors
    /// Returns an error if the delete fails.
    pub async fn delete_where(&self, schema: &TableSchema, filter: &Filter) -> DbResult<u64> {
        let output = self.bridge.run(query::delete(schema, filter)?).await?;
        Ok(output.rows_affected)
    }

    /// ## Summary
    /// Sets columns on every row of `schema` matching `filter`.
    ///
    /// ## Errors
    /// Returns an error if the update fails.
    pub async fn update_where(
        &self,
        schema: &TableSchema,
        assignments: Vec<(&'static str, SqlValue)>,
        filter: &Filter,
    ) -> DbResult<u64> {
        let output = self
            .bridge
            .run(query::update(schema, assignments, filter)?)
            .await?;
        Ok(output.rows_affected)
    }

    /// ## Summary
    /// Starts collecting statements to be applied atomically.
    #[must_use]
    pub fn begin(&self) -> LocalTransaction<'_> {
        LocalTransaction::new(self)
    }
}
