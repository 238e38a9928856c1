//! Cloud half of a dual write: mirror now when possible, otherwise queue.

use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::model::cloud::to_cloud;
use darkroom_db::model::queue::SyncQueueEntry;
use darkroom_db::model::{CloudRecord, CloudRow};
use serde_json::Value;

use crate::cloud::{CloudError, CloudResult, CloudStore, timed};
use crate::error::ServiceResult;
use crate::studio::Studio;
use crate::sync::queue;

/// Where an outbound write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirrored {
    /// Applied to the cloud directly.
    Cloud,
    /// Waiting in the outbound queue under this sequence number.
    Queued(i64),
    /// The cloud was not reached and the local store is detached, so the
    /// write was not kept anywhere.
    Dropped,
}

impl From<Option<i64>> for Mirrored {
    fn from(queued: Option<i64>) -> Self {
        queued.map_or(Self::Dropped, Self::Queued)
    }
}

/// ## Summary
/// Applies one outbound mutation to the cloud. Returns the number of rows
/// affected; zero for an update or delete means the row is already gone.
///
/// ## Errors
/// Returns the cloud failure, or `InvalidPayload` when a create or update
/// does not carry a row object.
pub async fn apply(
    cloud: &dyn CloudStore,
    kind: EntityKind,
    entity_id: &str,
    operation: SyncOperation,
    payload: &Value,
) -> CloudResult<u64> {
    let table = kind.table();
    match operation {
        SyncOperation::Create => {
            cloud.upsert(table, as_row(payload)?).await?;
            Ok(1)
        }
        SyncOperation::Update => cloud.update(table, entity_id, as_row(payload)?).await,
        SyncOperation::Delete => cloud.delete(table, entity_id).await,
    }
}

fn as_row(payload: &Value) -> CloudResult<&CloudRow> {
    payload
        .as_object()
        .ok_or_else(|| CloudError::InvalidPayload("expected a row object".to_string()))
}

/// ## Summary
/// Mirrors a mutation already applied locally. Goes straight to the cloud
/// when online and nothing older for the same entity is still queued,
/// pending or dead; otherwise, or when the cloud call fails, the mutation
/// is queued behind it.
///
/// ## Side Effects
/// - May write to the cloud
/// - May append to the outbound queue
/// - Marks the studio offline when the cloud cannot be reached
///
/// ## Errors
/// Returns an error only if queueing fails locally. Cloud failures are absorbed.
#[tracing::instrument(skip(studio, payload), fields(entity = %kind))]
pub async fn push(
    studio: &Studio,
    kind: EntityKind,
    entity_id: &str,
    operation: SyncOperation,
    payload: Value,
) -> ServiceResult<Mirrored> {
    if studio.is_online() && !queue::has_queued(&studio.store, kind, entity_id).await? {
        let attempt = timed(
            studio.request_timeout(),
            apply(studio.cloud.as_ref(), kind, entity_id, operation, &payload),
        )
        .await;
        match attempt {
            Ok(affected) => {
                tracing::debug!(affected, "Mirrored to cloud");
                return Ok(Mirrored::Cloud);
            }
            Err(err) => {
                if err.is_connectivity() {
                    studio.connectivity.set_online(false);
                }
                tracing::warn!(error = %err, "Cloud write failed; queueing");
                let queued = queue::enqueue(&studio.store, kind, entity_id, operation, payload).await?;
                if !err.is_transient()
                    && let Some(id) = queued
                    && let Some(entry) = studio.store.find::<SyncQueueEntry>(id).await?
                {
                    queue::record_failure(&studio.store, studio.sync_config(), &entry, &err)
                        .await?;
                }
                return Ok(queued.into());
            }
        }
    }

    let queued = queue::enqueue(&studio.store, kind, entity_id, operation, payload).await?;
    Ok(queued.into())
}

/// ## Summary
/// Mirrors a whole record after a local create or update.
///
/// ## Errors
/// Returns an error if the record cannot be shaped for the cloud or queueing fails.
pub async fn push_record<R: CloudRecord>(
    studio: &Studio,
    operation: SyncOperation,
    record: &R,
) -> ServiceResult<Mirrored> {
    let row = to_cloud(record)?;
    push(studio, R::KIND, record.record_id(), operation, Value::Object(row)).await
}

/// ## Summary
/// Stores a new record locally and mirrors it. The row lock is held across
/// both halves, as every write path does, so reconciliation never sees the
/// local row without its cloud write settled.
///
/// ## Errors
/// Returns an error if the local write or queueing fails.
pub async fn insert_record<R: CloudRecord>(studio: &Studio, record: &R) -> ServiceResult<Mirrored> {
    let _guard = studio.store.lock_row(R::KIND.table(), record.record_id()).await;
    studio.store.upsert(record).await?;
    push_record(studio, SyncOperation::Create, record).await
}

/// ## Summary
/// Mirrors a removal after a local delete.
///
/// ## Errors
/// Returns an error if queueing fails.
pub async fn push_delete(studio: &Studio, kind: EntityKind, entity_id: &str) -> ServiceResult<Mirrored> {
    push(studio, kind, entity_id, SyncOperation::Delete, Value::Null).await
}
