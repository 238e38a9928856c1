//! Soft delete, restore and permanent purge, walked generically over the
//! ownership graph declared by the table schemas.
//!
//! Dependents (a booking's reminders and dashboard tasks) have no lifecycle
//! of their own: they are removed outright when their parent is moved to
//! the trash, and restoring the parent does not bring them back.

use chrono::{DateTime, Duration, Utc};
use darkroom_core::actor::{Actor, Rank};
use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::db::query::{Direction, Filter};
use darkroom_db::db::schema::{TableSchema, by_name};
use darkroom_db::db::wire::SqlValue;
use darkroom_db::model::LocalRecord;
use serde::Serialize;
use serde_json::{Value, json};

use crate::activity;
use crate::error::{ServiceError, ServiceResult};
use crate::studio::Studio;
use crate::sync::write::{push, push_delete};

const DELETED_AT: &str = "deletedAt";
const DELETED_BY: &str = "deletedBy";

/// A record removed for good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgedRecord {
    pub kind: EntityKind,
    pub id: String,
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub purged: Vec<PurgedRecord>,
    pub failed: usize,
}

fn schema_for(kind: EntityKind) -> ServiceResult<&'static TableSchema> {
    by_name(kind.table()).ok_or(ServiceError::InvariantViolation(
        "entity kind without a table schema",
    ))
}

fn parse_time(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn text_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// ## Summary
/// Every record that hangs off `(schema, id)` in the ownership graph,
/// children before their own dependents.
async fn dependents_of(
    studio: &Studio,
    schema: &'static TableSchema,
    id: &str,
) -> ServiceResult<Vec<(&'static TableSchema, String)>> {
    let mut found = Vec::new();
    let mut frontier = vec![(schema, id.to_string())];

    while let Some((parent, parent_id)) = frontier.pop() {
        for dependent in parent.dependents {
            let Some(child) = by_name(dependent.table) else {
                tracing::warn!(table = dependent.table, "Dependent table has no schema");
                continue;
            };
            let rows = studio
                .store
                .find_objects(child, &Filter::eq(dependent.foreign_key, parent_id.as_str()))
                .await?;
            for row in rows {
                if let Some(child_id) = text_id(row.get(child.primary_key)) {
                    found.push((child, child_id.clone()));
                    frontier.push((child, child_id));
                }
            }
        }
    }
    Ok(found)
}

/// ## Summary
/// Mirrors the removal of cascaded dependents.
async fn push_dependent_deletes(
    studio: &Studio,
    dependents: &[(&'static TableSchema, String)],
) -> ServiceResult<()> {
    for (schema, id) in dependents {
        match EntityKind::parse(schema.name) {
            Ok(kind) => {
                push_delete(studio, kind, id).await?;
            }
            Err(_) => tracing::debug!(table = schema.name, "Dependent is local-only"),
        }
    }
    Ok(())
}

/// ## Summary
/// Moves a record to the trash: stamps `deletedAt`/`deletedBy` and removes
/// its dependents. Returns the number of dependents removed. Deleting a
/// record already in the trash changes nothing.
///
/// ## Side Effects
/// - Local update of the record and delete of its dependents, atomically
/// - Cloud patch of the deletion columns and cloud deletes of the dependents
/// - Audit entry
///
/// ## Errors
/// - `AuthorizationError` below reception rank
/// - `ValidationError` for entities without soft delete
/// - `NotFound` when the record does not exist
#[tracing::instrument(skip(studio, actor), fields(actor = %actor.id))]
pub async fn soft_delete(
    studio: &Studio,
    actor: &Actor,
    kind: EntityKind,
    id: &str,
) -> ServiceResult<usize> {
    actor.require(Rank::Reception, "move records to the trash")?;
    let schema = schema_for(kind)?;
    if !schema.has_soft_delete() {
        return Err(ServiceError::ValidationError(format!(
            "{kind} records cannot be moved to the trash"
        )));
    }

    let _guard = studio.store.lock_row(schema.name, id).await;
    let row = studio
        .store
        .find_object(schema, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{kind} {id}")))?;
    if row.get(DELETED_AT).is_some_and(|value| !value.is_null()) {
        tracing::debug!("Already in the trash");
        return Ok(0);
    }

    let dependents = dependents_of(studio, schema, id).await?;
    let now = Utc::now();

    let mut tx = studio.store.begin();
    tx.update_where(
        schema,
        vec![
            (DELETED_AT, SqlValue::from(now.to_rfc3339())),
            (DELETED_BY, SqlValue::from(actor.id.as_str())),
        ],
        &Filter::id(id),
    )?;
    for (child, child_id) in &dependents {
        tx.delete_where(child, &Filter::id(child_id.as_str()))?;
    }
    tx.commit().await?;

    push(
        studio,
        kind,
        id,
        SyncOperation::Update,
        json!({"id": id, "deleted_at": now, "deleted_by": actor.id}),
    )
    .await?;
    push_dependent_deletes(studio, &dependents).await?;

    activity::record(
        studio,
        actor,
        "soft_delete",
        kind,
        id,
        format!(
            "Moved {kind} {id} to the trash; removed {} dependent records",
            dependents.len()
        ),
    )
    .await?;
    tracing::info!(dependents = dependents.len(), "Moved to the trash");
    Ok(dependents.len())
}

/// ## Summary
/// Takes a record out of the trash. Only the deletion columns change, so the
/// restored record matches its state before deletion. Dependents removed by
/// the deletion stay removed.
///
/// ## Errors
/// - `AuthorizationError` below reception rank
/// - `NotFound` when the record does not exist
/// - `ValidationError` when the record is not in the trash
/// - `RetentionExpired` when it was deleted longer ago than the retention window
#[tracing::instrument(skip(studio, actor), fields(actor = %actor.id))]
pub async fn restore(studio: &Studio, actor: &Actor, kind: EntityKind, id: &str) -> ServiceResult<()> {
    actor.require(Rank::Reception, "restore records from the trash")?;
    let schema = schema_for(kind)?;

    let _guard = studio.store.lock_row(schema.name, id).await;
    let row = studio
        .store
        .find_object(schema, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{kind} {id}")))?;
    let Some(deleted_at) = parse_time(row.get(DELETED_AT)) else {
        return Err(ServiceError::ValidationError(format!(
            "{kind} {id} is not in the trash"
        )));
    };

    let retention = Duration::days(studio.retention().days);
    if Utc::now() - deleted_at > retention {
        return Err(ServiceError::RetentionExpired(format!(
            "{kind} {id} was deleted on {} and can no longer be restored",
            deleted_at.format("%Y-%m-%d")
        )));
    }

    studio
        .store
        .update_where(
            schema,
            vec![(DELETED_AT, SqlValue::Null), (DELETED_BY, SqlValue::Null)],
            &Filter::id(id),
        )
        .await?;
    push(
        studio,
        kind,
        id,
        SyncOperation::Update,
        json!({"id": id, "deleted_at": null, "deleted_by": null}),
    )
    .await?;

    activity::record(studio, actor, "restore", kind, id, format!("Restored {kind} {id}")).await?;
    tracing::info!("Restored from the trash");
    Ok(())
}

/// ## Summary
/// Permanently removes a record and its dependents, locally and in the cloud.
///
/// ## Side Effects
/// The audit entry is written before anything is removed.
///
/// ## Errors
/// - `AuthorizationError` below manager rank
/// - `NotFound` when the record does not exist
#[tracing::instrument(skip(studio, actor), fields(actor = %actor.id))]
pub async fn purge(studio: &Studio, actor: &Actor, kind: EntityKind, id: &str) -> ServiceResult<usize> {
    actor.require(Rank::Manager, "permanently delete records")?;
    purge_unchecked(studio, actor, kind, id).await
}

async fn purge_unchecked(
    studio: &Studio,
    actor: &Actor,
    kind: EntityKind,
    id: &str,
) -> ServiceResult<usize> {
    let schema = schema_for(kind)?;
    let _guard = studio.store.lock_row(schema.name, id).await;
    if studio.store.find_object(schema, id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("{kind} {id}")));
    }

    let dependents = dependents_of(studio, schema, id).await?;
    activity::record(
        studio,
        actor,
        "purge",
        kind,
        id,
        format!(
            "Permanently deleted {kind} {id} and {} dependent records",
            dependents.len()
        ),
    )
    .await?;

    let mut tx = studio.store.begin();
    for (child, child_id) in &dependents {
        tx.delete_where(child, &Filter::id(child_id.as_str()))?;
    }
    tx.delete_where(schema, &Filter::id(id))?;
    tx.commit().await?;

    push_dependent_deletes(studio, &dependents).await?;
    push_delete(studio, kind, id).await?;
    tracing::info!(dependents = dependents.len(), "Purged");
    Ok(dependents.len())
}

/// ## Summary
/// Purges every record that has been in the trash longer than the retention
/// window. Runs as the system actor.
///
/// ## Errors
/// Returns an error if a table cannot be scanned. Failures on single records
/// are logged and counted.
#[tracing::instrument(skip(studio))]
pub async fn sweep_expired(studio: &Studio) -> ServiceResult<SweepReport> {
    let system = Actor::system();
    let cutoff = Utc::now() - Duration::days(studio.retention().days);
    let mut report = SweepReport::default();

    for kind in EntityKind::ALL {
        let schema = schema_for(kind)?;
        if !schema.has_soft_delete() {
            continue;
        }
        let rows = studio
            .store
            .find_objects(schema, &Filter::IsNotNull(DELETED_AT))
            .await?;
        for row in rows {
            let Some(id) = text_id(row.get(schema.primary_key)) else {
                continue;
            };
            if parse_time(row.get(DELETED_AT)).is_none_or(|deleted_at| deleted_at >= cutoff) {
                continue;
            }
            match purge_unchecked(studio, &system, kind, &id).await {
                Ok(_) => report.purged.push(PurgedRecord { kind, id }),
                // Already removed as a dependent of an earlier purge.
                Err(ServiceError::NotFound(_)) => {}
                Err(err) => {
                    tracing::error!(%kind, id = %id, error = %err, "Retention purge failed");
                    report.failed += 1;
                }
            }
        }
    }

    tracing::info!(purged = report.purged.len(), failed = report.failed, "Retention sweep finished");
    Ok(report)
}

/// ## Summary
/// Records in the trash, most recently deleted first.
///
/// ## Errors
/// Returns an error if the local read fails.
pub async fn list_deleted<R: LocalRecord>(studio: &Studio) -> ServiceResult<Vec<R>> {
    Ok(studio
        .store
        .find_where(Filter::IsNotNull(DELETED_AT), Some((DELETED_AT, Direction::Desc)))
        .await?)
}
