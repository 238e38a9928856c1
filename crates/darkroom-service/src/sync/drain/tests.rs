use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::db::query::Filter;
use darkroom_db::db::schema::SYNC_QUEUE;
use darkroom_db::model::queue::QueueStatus;
use serde_json::json;

use super::*;
use crate::cloud::CloudError;
use crate::booking::{BookingPatch, NewBooking, create_booking, list_bookings, update_booking};
use crate::cloud::memory::CloudCall;
use crate::sync::write::{Mirrored, push};
use crate::testing::{memory_studio, memory_studio_with, reception};

fn call(op: &'static str, id: &str) -> CloudCall {
    CloudCall {
        op,
        table: "reminders".to_string(),
        id: id.to_string(),
    }
}

#[test_log::test(tokio::test)]
async fn test_offline_writes_drain_in_order() {
    let (studio, cloud) = memory_studio().await.expect("studio");
    studio.connectivity.set_online(false);

    let create = json!({"id": "r1", "title": "Call the florist"});
    let update = json!({"id": "r1", "title": "Call the florist again"});
    for (op, payload) in [
        (SyncOperation::Create, create),
        (SyncOperation::Update, update),
        (SyncOperation::Delete, serde_json::Value::Null),
    ] {
        let mirrored = push(&studio, EntityKind::Reminder, "r1", op, payload)
            .await
            .expect("push");
        assert!(matches!(mirrored, Mirrored::Queued(_)));
    }
    assert!(cloud.calls().is_empty());

    let report = studio.sync_now().await.expect("drain");
    assert!(!report.offline);
    assert_eq!(report.applied, 3);
    assert_eq!(
        cloud.calls(),
        vec![call("upsert", "r1"), call("update", "r1"), call("delete", "r1")]
    );
    assert!(cloud.row("reminders", "r1").is_none());
    assert!(
        queue::entries(&studio.store, QueueStatus::Pending)
            .await
            .expect("entries")
            .is_empty()
    );
}

#[test_log::test(tokio::test)]
async fn test_delete_of_missing_cloud_row_is_satisfied() {
    let (studio, cloud) = memory_studio().await.expect("studio");
    queue::enqueue(&studio.store, EntityKind::Booking, "gone", SyncOperation::Delete, json!(null))
        .await
        .expect("enqueue");

    let report = studio.sync_now().await.expect("drain");
    assert_eq!(report.already_satisfied, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(cloud.calls(), vec![CloudCall {
        op: "delete",
        table: "bookings".to_string(),
        id: "gone".to_string(),
    }]);
    let summary = queue::summary(&studio.store, true).await.expect("summary");
    assert_eq!((summary.pending, summary.dead), (0, 0));
}

#[test_log::test(tokio::test)]
async fn test_failure_holds_back_later_entries_of_same_entity() {
    let (studio, cloud) = memory_studio_with(|settings| settings.sync.drain_concurrency = 1)
        .await
        .expect("studio");
    for (id, title) in [("r1", "first"), ("r1", "second"), ("r2", "other")] {
        queue::enqueue(
            &studio.store,
            EntityKind::Reminder,
            id,
            SyncOperation::Create,
            json!({"id": id, "title": title}),
        )
        .await
        .expect("enqueue");
    }
    cloud.fail_next(CloudError::Rejected {
        status: 503,
        body: "busy".to_string(),
    });

    let report = studio.sync_now().await.expect("drain");
    // Groups run in entity order with one worker, so r1's first write fails.
    assert_eq!(report.failed, 1);
    assert_eq!(report.deferred, 1);
    assert_eq!(report.applied, 1);
    assert!(cloud.row("reminders", "r2").is_some());
    assert!(cloud.row("reminders", "r1").is_none());

    let report = studio.sync_now().await.expect("second drain");
    assert_eq!(report.applied, 2);
    let row = cloud.row("reminders", "r1").expect("r1 mirrored");
    assert_eq!(row.get("title"), Some(&json!("second")));
}

#[test_log::test(tokio::test)]
async fn test_dead_entry_holds_back_its_entity_until_requeued() {
    let (studio, cloud) = memory_studio().await.expect("studio");
    let parked = queue::enqueue(
        &studio.store,
        EntityKind::Reminder,
        "r1",
        SyncOperation::Create,
        json!("not a row"),
    )
    .await
    .expect("enqueue")
    .expect("key");
    queue::enqueue(
        &studio.store,
        EntityKind::Reminder,
        "r1",
        SyncOperation::Update,
        json!({"id": "r1", "title": "valid"}),
    )
    .await
    .expect("enqueue");

    let report = studio.sync_now().await.expect("drain");
    assert_eq!(report.dead, 1);
    assert_eq!(report.applied, 0);
    assert_eq!(report.deferred, 1);

    let dead = queue::entries(&studio.store, QueueStatus::Dead)
        .await
        .expect("dead");
    assert_eq!(dead.len(), 1);
    assert!(dead[0].last_error.as_deref().is_some_and(|e| e.contains("payload")));

    let report = studio.sync_now().await.expect("second drain");
    assert_eq!((report.applied, report.deferred), (0, 1));
    assert!(cloud.calls().is_empty());

    // A later write for the same entity queues behind the dead entry.
    let mirrored = push(
        &studio,
        EntityKind::Reminder,
        "r1",
        SyncOperation::Delete,
        serde_json::Value::Null,
    )
    .await
    .expect("push");
    assert!(matches!(mirrored, Mirrored::Queued(_)));
    assert!(cloud.calls().is_empty());

    studio
        .store
        .update_where(
            &SYNC_QUEUE,
            vec![("payload", json!({"id": "r1", "title": "fixed"}).to_string().into())],
            &Filter::id(parked),
        )
        .await
        .expect("repair payload");
    queue::requeue(&studio.store, parked).await.expect("requeue");
    let report = studio.sync_now().await.expect("third drain");
    assert_eq!(report.applied, 3);
    assert_eq!(
        cloud.calls(),
        vec![call("upsert", "r1"), call("update", "r1"), call("delete", "r1")]
    );
}

#[test_log::test(tokio::test)]
async fn test_edit_after_rejected_create_survives_requeue() {
    let (studio, cloud) = memory_studio().await.expect("studio");
    let date = chrono::NaiveDate::from_ymd_opt(2026, 6, 20).expect("date");
    cloud.fail_next(CloudError::Rejected {
        status: 422,
        body: "schema mismatch".to_string(),
    });
    let booking = create_booking(&studio, &reception(), NewBooking::new("Old Name", date))
        .await
        .expect("create");

    let patch = BookingPatch {
        client_name: Some("New Name".to_string()),
        ..BookingPatch::default()
    };
    update_booking(&studio, &reception(), &booking.id, patch)
        .await
        .expect("update");
    assert!(cloud.row("bookings", &booking.id).is_none());
    let summary = queue::summary(&studio.store, true).await.expect("summary");
    assert_eq!((summary.pending, summary.dead), (1, 1));

    let dead = queue::entries(&studio.store, QueueStatus::Dead)
        .await
        .expect("dead");
    queue::requeue(&studio.store, dead[0].id).await.expect("requeue");
    let report = studio.sync_now().await.expect("drain");
    assert_eq!(report.applied, 2);

    let row = cloud.row("bookings", &booking.id).expect("mirrored");
    assert_eq!(row.get("client_name"), Some(&json!("New Name")));
    let listed = list_bookings(&studio).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].client_name, "New Name");
}

#[test_log::test(tokio::test)]
async fn test_offline_cloud_reports_offline() {
    let (studio, cloud) = memory_studio().await.expect("studio");
    queue::enqueue(&studio.store, EntityKind::Booking, "b1", SyncOperation::Delete, json!(null))
        .await
        .expect("enqueue");
    cloud.set_online(false);
    studio.connectivity.set_online(false);

    let report = studio.sync_now().await.expect("drain");
    assert!(report.offline);
    assert_eq!(
        queue::summary(&studio.store, false).await.expect("summary").pending,
        1
    );
}

#[test_log::test(tokio::test)]
async fn test_concurrent_drain_is_skipped() {
    let (studio, _cloud) = memory_studio().await.expect("studio");
    let _held = studio.drain_gate.lock().await;

    let report = studio.sync_now().await.expect("drain");
    assert!(report.skipped);
}
