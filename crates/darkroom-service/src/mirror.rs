//! Read path for synchronised entities: local first, reconciled with the cloud when reachable.

use std::collections::{HashMap, HashSet};

use darkroom_db::model::cloud::{cloud_id, from_cloud};
use darkroom_db::model::{CloudRecord, LocalRecord};
use serde::Serialize;

use crate::cloud::timed;
use crate::studio::Studio;
use crate::sync::queue;

/// ## Summary
/// Lists every row of `R`, reconciling the local store with the cloud.
///
/// Local rows are read first and are the answer whenever the cloud cannot
/// be consulted. When the cloud answers, it is authoritative for the rows it
/// knows: rows where the two sides disagree are adopted from the cloud, and
/// local rows the cloud does not have are deleted. Rows with unsynced local
/// writes in the outbound queue are left alone on both counts. The result is
/// the cloud rows plus the local rows not yet in the cloud.
///
/// A disagreeing row is settled under the same row lock the write paths
/// hold, against a fresh read of that one row, so a write whose cloud half
/// lands after the bulk fetch is never undone.
///
/// ## Side Effects
/// - Rewrites or removes local rows that disagree with the cloud
/// - Marks the studio offline when the cloud cannot be reached
///
/// Never fails; read errors degrade to whatever is available locally.
#[tracing::instrument(skip(studio), fields(table = R::SCHEMA.name))]
pub async fn list_mirrored<R: CloudRecord>(studio: &Studio) -> Vec<R> {
    let local: Vec<R> = match studio.store.all().await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(error = %err, "Local read failed; continuing without local rows");
            Vec::new()
        }
    };
    if !studio.is_online() {
        return local;
    }

    let table = R::KIND.table();
    let cloud_rows = match timed(studio.request_timeout(), studio.cloud.fetch_all(table)).await {
        Ok(rows) => rows,
        Err(err) => {
            if err.is_connectivity() {
                studio.connectivity.set_online(false);
            }
            tracing::warn!(error = %err, "Cloud fetch failed; serving local rows");
            return local;
        }
    };

    let protected = match queue::unsynced_ids(&studio.store, R::KIND).await {
        Ok(ids) => ids,
        Err(err) => {
            tracing::warn!(error = %err, "Queue read failed; skipping reconciliation");
            return local;
        }
    };

    let cloud_ids: HashSet<String> = cloud_rows.iter().filter_map(cloud_id).collect();
    let mut remote: Vec<R> = Vec::with_capacity(cloud_rows.len());
    for row in &cloud_rows {
        match from_cloud::<R>(row) {
            Ok(record) => remote.push(record),
            Err(err) => tracing::warn!(id = ?cloud_id(row), error = %err, "Skipping cloud row"),
        }
    }

    let mut by_id: HashMap<String, R> = local
        .into_iter()
        .map(|record| (record.record_id().to_string(), record))
        .collect();

    let mut merged = Vec::with_capacity(remote.len() + by_id.len());
    let mut unsettled: Vec<(String, Option<R>)> = Vec::new();
    for record in remote {
        let id = record.record_id().to_string();
        match by_id.remove(&id) {
            // Local has writes the cloud has not seen yet.
            Some(mine) if protected.contains(&id) => merged.push(mine),
            Some(mine) if same_row(&mine, &record) => merged.push(mine),
            Some(_) => unsettled.push((id, None)),
            None if protected.contains(&id) => {}
            None => unsettled.push((id, Some(record))),
        }
    }
    for (id, mine) in by_id {
        // Undecodable cloud rows leave their local copy alone.
        if protected.contains(&id) || cloud_ids.contains(&id) {
            merged.push(mine);
        } else {
            unsettled.push((id, None));
        }
    }

    if !unsettled.is_empty() {
        tracing::debug!(count = unsettled.len(), "Settling rows that disagree with the cloud");
    }
    for (id, fetched) in unsettled {
        if let Some(record) = settle(studio, &id, fetched).await {
            merged.push(record);
        }
    }
    merged
}

fn same_row<R: Serialize>(a: &R, b: &R) -> bool {
    matches!(
        (serde_json::to_value(a), serde_json::to_value(b)),
        (Ok(left), Ok(right)) if left == right
    )
}

/// ## Summary
/// Brings one disagreeing row in line with the cloud while holding its row
/// lock. `fetched` is the cloud copy from the bulk read when the row was not
/// local at the time. Returns the row as it now stands locally.
async fn settle<R: CloudRecord>(studio: &Studio, id: &str, fetched: Option<R>) -> Option<R> {
    let table = R::KIND.table();
    let _guard = studio.store.lock_row(table, id).await;

    let current: Option<R> = match studio.store.find(id).await {
        Ok(found) => found,
        Err(err) => {
            tracing::warn!(id, error = %err, "Local read failed; leaving row as it is");
            return None;
        }
    };
    match queue::has_queued(&studio.store, R::KIND, id).await {
        Ok(false) => {}
        Ok(true) => return current,
        Err(err) => {
            tracing::warn!(id, error = %err, "Queue read failed; leaving row as it is");
            return current;
        }
    }

    let Some(mine) = current else {
        // Not local before the fetch and still not local: new from elsewhere.
        let record = fetched?;
        if let Err(err) = studio.store.upsert(&record).await {
            tracing::warn!(id, error = %err, "Cloud row does not map to the local table");
        }
        return Some(record);
    };

    let fresh = match timed(studio.request_timeout(), studio.cloud.fetch_one(table, id)).await {
        Ok(fresh) => fresh,
        Err(err) => {
            if err.is_connectivity() {
                studio.connectivity.set_online(false);
            }
            tracing::warn!(id, error = %err, "Cloud re-read failed; keeping local row");
            return Some(mine);
        }
    };
    match fresh.map(|row| from_cloud::<R>(&row)) {
        None => {
            tracing::debug!(id, "Removing row the cloud no longer has");
            if let Err(err) = studio.store.delete::<R>(mine.key()).await {
                tracing::warn!(id, error = %err, "Local delete failed; row may be stale");
                return Some(mine);
            }
            None
        }
        Some(Ok(record)) => {
            if same_row(&mine, &record) {
                return Some(mine);
            }
            if let Err(err) = studio.store.upsert(&record).await {
                tracing::warn!(id, error = %err, "Cloud row does not map to the local table");
                return Some(mine);
            }
            Some(record)
        }
        Some(Err(err)) => {
            tracing::warn!(id, error = %err, "Skipping cloud row");
            Some(mine)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, Utc};
    use darkroom_core::types::{EntityKind, SyncOperation};
    use darkroom_db::model::cloud::to_cloud;
    use darkroom_db::model::reminder::Reminder;
    use serde_json::{Value, json};

    use super::*;
    use crate::sync::write::push_record;
    use crate::testing::memory_studio;

    fn reminder(id: &str, title: &str) -> Reminder {
        let now = Utc::now();
        Reminder {
            id: id.to_string(),
            booking_id: None,
            title: title.to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("date"),
            completed: false,
            reminder_type: "call".to_string(),
            created_by: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        }
    }

    fn titles(mut rows: Vec<Reminder>) -> Vec<String> {
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows.into_iter().map(|r| r.title).collect()
    }

    #[test_log::test(tokio::test)]
    async fn test_cloud_is_authoritative_for_known_rows() {
        let (studio, cloud) = memory_studio().await.expect("studio");
        studio.store.upsert(&reminder("r1", "stale title")).await.expect("upsert");
        studio.store.upsert(&reminder("r2", "removed in cloud")).await.expect("upsert");
        cloud.seed("reminders", to_cloud(&reminder("r1", "fresh title")).expect("row"));
        let Value::Object(renamed) = json!({
            "id": "r3",
            "title": "from another device",
            "remind_at": "2026-04-01T09:00:00Z",
            "type": "email",
            "is_completed": "true",
            "created_at": "2026-02-01T09:00:00Z",
            "updated_at": "2026-02-01T09:00:00Z",
        }) else {
            unreachable!("literal is an object");
        };
        cloud.seed("reminders", renamed);

        let listed: Vec<Reminder> = list_mirrored(&studio).await;
        assert_eq!(titles(listed), vec!["fresh title", "from another device"]);

        let local: Vec<Reminder> = studio.store.all().await.expect("local");
        assert_eq!(titles(local.clone()), vec!["fresh title", "from another device"]);
        let r3 = local.iter().find(|r| r.id == "r3").expect("r3");
        assert!(r3.completed);
        assert_eq!(r3.due_date, NaiveDate::from_ymd_opt(2026, 4, 1).expect("date"));
    }

    #[test_log::test(tokio::test)]
    async fn test_unsynced_local_rows_survive_reconciliation() {
        let (studio, cloud) = memory_studio().await.expect("studio");
        let local_only = reminder("r-new", "created offline");
        studio.store.upsert(&local_only).await.expect("upsert");
        let edited = reminder("r1", "edited offline");
        studio.store.upsert(&edited).await.expect("upsert");
        for record in [&local_only, &edited] {
            queue::enqueue(
                &studio.store,
                EntityKind::Reminder,
                &record.id,
                SyncOperation::Create,
                Value::Object(to_cloud(record).expect("row")),
            )
            .await
            .expect("enqueue");
        }
        cloud.seed("reminders", to_cloud(&reminder("r1", "cloud version")).expect("row"));

        let listed: Vec<Reminder> = list_mirrored(&studio).await;
        assert_eq!(titles(listed), vec!["created offline", "edited offline"]);
    }

    /// Writes `record` locally and mirrors it, holding the row lock the way
    /// the services do, with a pause between the two halves.
    async fn slow_write(studio: &Studio, record: &Reminder, operation: SyncOperation) {
        let _guard = studio.store.lock_row("reminders", &record.id).await;
        studio.store.upsert(record).await.expect("local write");
        tokio::time::sleep(Duration::from_millis(50)).await;
        push_record(studio, operation, record).await.expect("push");
    }

    async fn list_after(studio: &Studio, delay: Duration) -> Vec<Reminder> {
        tokio::time::sleep(delay).await;
        list_mirrored(studio).await
    }

    #[test_log::test(tokio::test)]
    async fn test_create_landing_after_fetch_is_kept() {
        let (studio, cloud) = memory_studio().await.expect("studio");
        let fresh = reminder("r-fresh", "just booked");

        let ((), listed) = tokio::join!(
            slow_write(&studio, &fresh, SyncOperation::Create),
            list_after(&studio, Duration::from_millis(10)),
        );

        assert_eq!(titles(listed), vec!["just booked"]);
        assert!(cloud.row("reminders", "r-fresh").is_some());
        let local: Vec<Reminder> = studio.store.all().await.expect("local");
        assert_eq!(titles(local), vec!["just booked"]);
    }

    #[test_log::test(tokio::test)]
    async fn test_edit_landing_after_fetch_is_not_overwritten() {
        let (studio, cloud) = memory_studio().await.expect("studio");
        let original = reminder("r1", "first draft");
        studio.store.upsert(&original).await.expect("upsert");
        cloud.seed("reminders", to_cloud(&original).expect("row"));

        let mut edited = original.clone();
        edited.title = "second draft".to_string();
        edited.updated_at = Utc::now();
        let ((), listed) = tokio::join!(
            slow_write(&studio, &edited, SyncOperation::Update),
            list_after(&studio, Duration::from_millis(10)),
        );

        assert_eq!(titles(listed), vec!["second draft"]);
        let local: Vec<Reminder> = studio.store.all().await.expect("local");
        assert_eq!(titles(local), vec!["second draft"]);
    }

    #[test_log::test(tokio::test)]
    async fn test_unreachable_cloud_serves_local_rows() {
        let (studio, cloud) = memory_studio().await.expect("studio");
        studio.store.upsert(&reminder("r1", "local")).await.expect("upsert");
        cloud.set_online(false);

        let listed: Vec<Reminder> = list_mirrored(&studio).await;
        assert_eq!(titles(listed), vec!["local"]);
        assert!(!studio.is_online());
        assert_eq!(studio.store.all::<Reminder>().await.expect("local").len(), 1);
    }
}
