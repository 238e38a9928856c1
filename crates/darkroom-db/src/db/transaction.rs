//! Atomic batches forwarded across the bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut tx = store.begin();
//! tx.upsert(&booking)?;
//! tx.delete_where(&REMINDERS, &Filter::eq("bookingId", booking.id.as_str()))?;
//! tx.commit().await?;
//! ```
//!
//! Statements are collected locally and sent as one `Atomic` request on
//! commit, where the endpoint wraps them in BEGIN/COMMIT and rolls back on
//! the first failure. Dropping an uncommitted transaction discards it.

use crate::db::map::record_values;
use crate::db::query::{self, Filter};
use crate::db::schema::TableSchema;
use crate::db::store::LocalStore;
use crate::db::wire::{BridgeOutput, SqlValue, Statement};
use crate::error::DbResult;
use crate::model::LocalRecord;

#[derive(Debug)]
pub struct LocalTransaction<'a> {
    store: &'a LocalStore,
    statements: Vec<Statement>,
}

impl<'a> LocalTransaction<'a> {
    pub(crate) const fn new(store: &'a LocalStore) -> Self {
        Self {
            store,
            statements: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// ## Errors
    /// Returns an error if the record does not map to its table.
    pub fn upsert<R: LocalRecord>(&mut self, record: &R) -> DbResult<()> {
        let statement = query::upsert(R::SCHEMA, record_values(R::SCHEMA, record)?)?;
        self.statements.push(statement);
        Ok(())
    }

    /// ## Errors
    /// Returns an error if the statement cannot be built.
    pub fn update_where(
        &mut self,
        schema: &TableSchema,
        assignments: Vec<(&'static str, SqlValue)>,
        filter: &Filter,
    ) -> DbResult<()> {
        self.statements
            .push(query::update(schema, assignments, filter)?);
        Ok(())
    }

    /// ## Errors
    /// Returns an error if the statement cannot be built.
    pub fn delete_where(&mut self, schema: &TableSchema, filter: &Filter) -> DbResult<()> {
        self.statements.push(query::delete(schema, filter)?);
        Ok(())
    }

    /// ## Summary
    /// Applies every collected statement atomically.
    ///
    /// ## Errors
    /// Returns the first failing statement's error. Nothing is applied in that case.
    pub async fn commit(mut self) -> DbResult<Vec<BridgeOutput>> {
        let statements = std::mem::take(&mut self.statements);
        tracing::trace!(count = statements.len(), "Committing local transaction");
        self.store.run_atomic(statements).await
    }
}

impl Drop for LocalTransaction<'_> {
    fn drop(&mut self) {
        if !self.statements.is_empty() {
            tracing::debug!(
                discarded = self.statements.len(),
                "Local transaction dropped without commit"
            );
        }
    }
}
