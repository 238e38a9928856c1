//! Statement builders over typed table schemas, compiled with sea-query.

use sea_query::{
    Alias, Condition, ConditionalStatement, Expr, OnConflict, Order, Query, SimpleExpr,
    SqliteQueryBuilder,
};

use crate::db::schema::TableSchema;
use crate::db::wire::{SqlValue, Statement, StatementKind};
use crate::error::DbResult;

/// Row predicate understood by the local store.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, SqlValue),
    IsNull(&'static str),
    IsNotNull(&'static str),
    In(&'static str, Vec<SqlValue>),
    NotIn(&'static str, Vec<SqlValue>),
    And(Vec<Filter>),
}

impl Filter {
    #[must_use]
    pub fn eq(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self::Eq(column, value.into())
    }

    #[must_use]
    pub fn id(value: impl Into<SqlValue>) -> Self {
        Self::Eq("id", value.into())
    }

    /// Rows that have not been soft-deleted.
    #[must_use]
    pub const fn active() -> Self {
        Self::IsNull("deletedAt")
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            first => Self::And(vec![first, other]),
        }
    }

    fn condition(&self) -> Condition {
        let leaf = match self {
            Self::Eq(column, value) => col(column).eq(value_expr(value)),
            Self::IsNull(column) => col(column).is_null(),
            Self::IsNotNull(column) => col(column).is_not_null(),
            Self::In(column, values) => col(column).is_in(values.iter().map(value_expr)),
            Self::NotIn(column, values) => col(column).is_not_in(values.iter().map(value_expr)),
            Self::And(filters) => {
                return filters
                    .iter()
                    .fold(Condition::all(), |cond, filter| cond.add(filter.condition()));
            }
        };
        Condition::all().add(leaf)
    }
}

/// Sort direction for list reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

fn col(name: &str) -> Expr {
    Expr::col(Alias::new(name))
}

fn value_expr(value: &SqlValue) -> SimpleExpr {
    SimpleExpr::Value(sea_query::Value::from(value.clone()))
}

/// ## Summary
/// `SELECT <all columns> FROM <table> [WHERE ...] [ORDER BY ...]`.
///
/// ## Errors
/// Returns an error if a bound value cannot be represented.
pub fn select(
    schema: &TableSchema,
    filter: Option<&Filter>,
    order: Option<(&'static str, Direction)>,
) -> DbResult<Statement> {
    let mut query = Query::select();
    query
        .columns(schema.columns.iter().map(|column| Alias::new(column.name)))
        .from(Alias::new(schema.name));
    if let Some(filter) = filter {
        query.cond_where(filter.condition());
    }
    if let Some((column, direction)) = order {
        let order = match direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        };
        query.order_by(Alias::new(column), order);
    }
    Statement::from_built(query.build(SqliteQueryBuilder), StatementKind::Query)
}

/// ## Summary
/// Insert-or-update keyed on the primary key. Columns absent from `values`
/// are left out of the statement.
///
/// ## Errors
/// Returns an error if the statement cannot be built.
pub fn upsert(schema: &TableSchema, values: Vec<(&'static str, SqlValue)>) -> DbResult<Statement> {
    let (columns, exprs): (Vec<_>, Vec<_>) = values
        .into_iter()
        .map(|(column, value)| (column, SimpleExpr::Value(value.into())))
        .unzip();

    let updates: Vec<_> = columns
        .iter()
        .filter(|column| **column != schema.primary_key)
        .map(|column| Alias::new(*column))
        .collect();
    let mut on_conflict = OnConflict::column(Alias::new(schema.primary_key));
    if updates.is_empty() {
        on_conflict.do_nothing();
    } else {
        on_conflict.update_columns(updates);
    }

    let mut query = Query::insert();
    query
        .into_table(Alias::new(schema.name))
        .columns(columns.iter().map(|column| Alias::new(*column)))
        .values(exprs)?
        .on_conflict(on_conflict);
    Statement::from_built(query.build(SqliteQueryBuilder), StatementKind::Execute)
}

/// ## Summary
/// Plain insert that returns the store-assigned primary key.
///
/// ## Errors
/// Returns an error if the statement cannot be built.
pub fn insert_returning_key(
    schema: &TableSchema,
    values: Vec<(&'static str, SqlValue)>,
) -> DbResult<Statement> {
    let (columns, exprs): (Vec<_>, Vec<_>) = values
        .into_iter()
        .filter(|(column, _)| *column != schema.primary_key)
        .map(|(column, value)| (Alias::new(column), SimpleExpr::Value(value.into())))
        .unzip();

    let mut query = Query::insert();
    query
        .into_table(Alias::new(schema.name))
        .columns(columns)
        .values(exprs)?
        .returning_col(Alias::new(schema.primary_key));
    Statement::from_built(query.build(SqliteQueryBuilder), StatementKind::Query)
}

/// ## Summary
/// `UPDATE <table> SET ... WHERE ...`.
///
/// ## Errors
/// Returns an error if a bound value cannot be represented.
pub fn update(
    schema: &TableSchema,
    assignments: Vec<(&'static str, SqlValue)>,
    filter: &Filter,
) -> DbResult<Statement> {
    let mut query = Query::update();
    query
        .table(Alias::new(schema.name))
        .values(
            assignments
                .into_iter()
                .map(|(column, value)| (Alias::new(column), SimpleExpr::Value(value.into()))),
        )
        .cond_where(filter.condition());
    Statement::from_built(query.build(SqliteQueryBuilder), StatementKind::Execute)
}

/// ## Summary
/// `DELETE FROM <table> WHERE ...`.
///
/// ## Errors
/// Returns an error if a bound value cannot be represented.
pub fn delete(schema: &TableSchema, filter: &Filter) -> DbResult<Statement> {
    let mut query = Query::delete();
    query
        .from_table(Alias::new(schema.name))
        .cond_where(filter.condition());
    Statement::from_built(query.build(SqliteQueryBuilder), StatementKind::Execute)
}
