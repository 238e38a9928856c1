//! Durable outbound queue stored in the local `sync_queue` table.

use std::collections::HashSet;

use chrono::Utc;
use darkroom_core::config::SyncConfig;
use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::db::query::{Direction, Filter};
use darkroom_db::db::store::LocalStore;
use darkroom_db::db::wire::SqlValue;
use darkroom_db::model::LocalRecord;
use darkroom_db::model::queue::{QueueStatus, SyncQueueEntry};
use serde::Serialize;
use serde_json::{Value, json};

use crate::cloud::CloudError;
use crate::error::{ServiceError, ServiceResult};

/// Counts reported by the operator surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    pub pending: usize,
    pub dead: usize,
    pub online: bool,
}

/// ## Summary
/// Appends a mutation to the queue. Returns its sequence number, or `None`
/// when the store is detached and nothing could be kept.
///
/// ## Side Effects
/// Writes one row to the local store before returning.
///
/// ## Errors
/// Returns an error if the local write fails.
#[tracing::instrument(skip(store, payload))]
pub async fn enqueue(
    store: &LocalStore,
    kind: EntityKind,
    entity_id: &str,
    operation: SyncOperation,
    payload: Value,
) -> ServiceResult<Option<i64>> {
    let row = json!({
        "entityType": kind,
        "entityId": entity_id,
        "operation": operation,
        "payload": payload,
        "status": QueueStatus::Pending,
        "createdAt": Utc::now(),
        "retryCount": 0,
    });
    let id = store
        .insert_returning_key(SyncQueueEntry::SCHEMA, &row)
        .await?;
    match id {
        Some(id) => tracing::debug!(id, "Queued outbound write"),
        None => tracing::warn!("Local store detached; outbound write not kept"),
    }
    Ok(id)
}

/// ## Summary
/// Every queued entry, pending and dead, in sequence order.
///
/// ## Errors
/// Returns an error if the local read fails.
pub async fn all_entries(store: &LocalStore) -> ServiceResult<Vec<SyncQueueEntry>> {
    let statuses = [QueueStatus::Pending, QueueStatus::Dead]
        .into_iter()
        .map(|status| SqlValue::from(status.as_str()))
        .collect();
    Ok(store
        .find_where(Filter::In("status", statuses), Some(("id", Direction::Asc)))
        .await?)
}

fn status_filter(status: QueueStatus) -> Filter {
    Filter::eq("status", status.as_str())
}

/// ## Summary
/// Entries with the given status in sequence order.
///
/// ## Errors
/// Returns an error if the local read fails.
pub async fn entries(store: &LocalStore, status: QueueStatus) -> ServiceResult<Vec<SyncQueueEntry>> {
    Ok(store
        .find_where(status_filter(status), Some(("id", Direction::Asc)))
        .await?)
}

/// ## Summary
/// Whether this entity still has a queued write, pending or dead. A dead
/// entry holds its entity until it is requeued.
///
/// ## Errors
/// Returns an error if the local read fails.
pub async fn has_queued(store: &LocalStore, kind: EntityKind, entity_id: &str) -> ServiceResult<bool> {
    let filter = Filter::eq("entityType", kind.as_str()).and(Filter::eq("entityId", entity_id));
    let found: Vec<SyncQueueEntry> = store.find_where(filter, None).await?;
    Ok(!found.is_empty())
}

/// ## Summary
/// Ids of entities of `kind` that still have unsynced local writes, pending or dead.
///
/// ## Errors
/// Returns an error if the local read fails.
pub async fn unsynced_ids(store: &LocalStore, kind: EntityKind) -> ServiceResult<HashSet<String>> {
    let found: Vec<SyncQueueEntry> = store
        .find_where(Filter::eq("entityType", kind.as_str()), None)
        .await?;
    Ok(found.into_iter().map(|entry| entry.entity_id).collect())
}

/// ## Errors
/// Returns an error if the local read fails.
pub async fn summary(store: &LocalStore, online: bool) -> ServiceResult<QueueSummary> {
    Ok(QueueSummary {
        pending: entries(store, QueueStatus::Pending).await?.len(),
        dead: entries(store, QueueStatus::Dead).await?.len(),
        online,
    })
}

/// ## Summary
/// Removes an entry that reached the cloud.
///
/// ## Errors
/// Returns an error if the local delete fails.
pub async fn complete(store: &LocalStore, id: i64) -> ServiceResult<()> {
    store.delete::<SyncQueueEntry>(id).await?;
    Ok(())
}

/// ## Summary
/// Records a failed attempt. The entry is parked as dead when the failure is
/// permanent or the retry budget is spent; otherwise it is rescheduled with
/// exponential backoff. Returns the resulting status.
///
/// ## Errors
/// Returns an error if the local update fails.
pub async fn record_failure(
    store: &LocalStore,
    config: &SyncConfig,
    entry: &SyncQueueEntry,
    err: &CloudError,
) -> ServiceResult<QueueStatus> {
    let retry_count = entry.retry_count.saturating_add(1);
    let status = if !err.is_transient() || retry_count >= config.max_retries {
        QueueStatus::Dead
    } else {
        QueueStatus::Pending
    };
    let next_attempt = match status {
        QueueStatus::Pending => {
            let delay = chrono::Duration::from_std(config.backoff(retry_count))
                .unwrap_or_else(|_| chrono::Duration::zero());
            SqlValue::from((Utc::now() + delay).to_rfc3339())
        }
        QueueStatus::Dead => SqlValue::Null,
    };

    store
        .update_where(
            SyncQueueEntry::SCHEMA,
            vec![
                ("status", SqlValue::from(status.as_str())),
                ("retryCount", SqlValue::Integer(i64::from(retry_count))),
                ("lastError", SqlValue::from(err.to_string())),
                ("nextAttemptAt", next_attempt),
            ],
            &Filter::id(entry.id),
        )
        .await?;

    match status {
        QueueStatus::Dead => tracing::error!(
            id = entry.id,
            entity = %entry.entity_type,
            entity_id = %entry.entity_id,
            retry_count,
            error = %err,
            "Outbound write parked as dead"
        ),
        QueueStatus::Pending => tracing::warn!(
            id = entry.id,
            retry_count,
            error = %err,
            "Outbound write failed; will retry"
        ),
    }
    Ok(status)
}

/// ## Summary
/// Puts a dead entry back in line with a fresh retry budget.
///
/// ## Errors
/// Returns `NotFound` when no dead entry has this id.
#[tracing::instrument(skip(store))]
pub async fn requeue(store: &LocalStore, id: i64) -> ServiceResult<()> {
    let changed = store
        .update_where(
            SyncQueueEntry::SCHEMA,
            vec![
                ("status", SqlValue::from(QueueStatus::Pending.as_str())),
                ("retryCount", SqlValue::Integer(0)),
                ("nextAttemptAt", SqlValue::Null),
            ],
            &Filter::id(id).and(status_filter(QueueStatus::Dead)),
        )
        .await?;
    if changed == 0 {
        return Err(ServiceError::NotFound(format!("dead queue entry {id}")));
    }
    tracing::info!("Dead entry requeued");
    Ok(())
}

#[cfg(test)]
mod tests {
    use darkroom_db::db::connection::open_in_memory;

    use super::*;

    fn config(max_retries: u32) -> SyncConfig {
        SyncConfig {
            drain_interval_secs: 60,
            health_interval_secs: 30,
            max_retries,
            backoff_base_secs: 5,
            backoff_max_secs: 900,
            drain_concurrency: 4,
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_entries_keep_enqueue_order() {
        let store = open_in_memory().await.expect("store");
        for op in [SyncOperation::Create, SyncOperation::Update, SyncOperation::Delete] {
            enqueue(&store, EntityKind::Booking, "b1", op, Value::Null)
                .await
                .expect("enqueue");
        }

        let pending = entries(&store, QueueStatus::Pending).await.expect("entries");
        let ops: Vec<_> = pending.iter().map(|e| e.operation).collect();
        assert_eq!(
            ops,
            vec![SyncOperation::Create, SyncOperation::Update, SyncOperation::Delete]
        );
        assert!(has_queued(&store, EntityKind::Booking, "b1").await.expect("check"));
        assert!(!has_queued(&store, EntityKind::Reminder, "b1").await.expect("check"));
    }

    #[test_log::test(tokio::test)]
    async fn test_failures_back_off_then_go_dead() {
        let store = open_in_memory().await.expect("store");
        let config = config(2);
        enqueue(&store, EntityKind::Reminder, "r1", SyncOperation::Create, json!({"id": "r1"}))
            .await
            .expect("enqueue");
        let err = CloudError::Unreachable("offline".to_string());

        let entry = entries(&store, QueueStatus::Pending).await.expect("entries").remove(0);
        let status = record_failure(&store, &config, &entry, &err).await.expect("fail");
        assert_eq!(status, QueueStatus::Pending);

        let entry = entries(&store, QueueStatus::Pending).await.expect("entries").remove(0);
        assert_eq!(entry.retry_count, 1);
        assert!(!entry.is_due(Utc::now()));

        let status = record_failure(&store, &config, &entry, &err).await.expect("fail");
        assert_eq!(status, QueueStatus::Dead);
        assert!(has_queued(&store, EntityKind::Reminder, "r1").await.expect("check"));
        assert!(
            unsynced_ids(&store, EntityKind::Reminder)
                .await
                .expect("ids")
                .contains("r1")
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_permanent_rejection_is_dead_immediately_and_requeueable() {
        let store = open_in_memory().await.expect("store");
        let id = enqueue(&store, EntityKind::Booking, "b1", SyncOperation::Update, json!({}))
            .await
            .expect("enqueue")
            .expect("key");
        let entry = entries(&store, QueueStatus::Pending).await.expect("entries").remove(0);
        let rejected = CloudError::Rejected {
            status: 422,
            body: "bad column".to_string(),
        };
        record_failure(&store, &config(25), &entry, &rejected)
            .await
            .expect("fail");

        let summary = summary(&store, true).await.expect("summary");
        assert_eq!((summary.pending, summary.dead), (0, 1));

        requeue(&store, id).await.expect("requeue");
        let entry = entries(&store, QueueStatus::Pending).await.expect("entries").remove(0);
        assert_eq!(entry.retry_count, 0);
        assert!(entry.is_due(Utc::now()));
        assert!(matches!(requeue(&store, id).await, Err(ServiceError::NotFound(_))));
    }
}
