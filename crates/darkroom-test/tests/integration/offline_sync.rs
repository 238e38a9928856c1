//! Offline writes queue locally and reach the cloud in order once the
//! network returns.

use serde_json::json;

use darkroom_test::component::booking::{
    BookingPatch, BookingUpdate, NewBooking, create_booking, get_booking, list_bookings,
    update_booking,
};
use darkroom_test::component::sync::queue;
use darkroom_test::component::types::{EntityKind, SyncOperation};

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn offline_edits_drain_in_order_after_reconnect() {
    let test = TestStudio::new().await;
    test.go_offline();

    let booking = create_booking(
        &test.studio,
        &reception(),
        NewBooking::new("Offline Bride", date(8, 15)).window(hour(14), hour(18)),
    )
    .await
    .expect("create while offline");
    for category in ["wedding", "wedding + henna"] {
        let patch = BookingPatch {
            category: Some(category.to_string()),
            ..BookingPatch::default()
        };
        let outcome = update_booking(&test.studio, &reception(), &booking.id, patch)
            .await
            .expect("update while offline");
        assert!(matches!(outcome, BookingUpdate::Applied(_)));
    }

    // Local reads keep working.
    assert_eq!(list_bookings(&test.studio).await.len(), 1);
    assert_eq!(
        get_booking(&test.studio, &booking.id).await.expect("local").category,
        "wedding + henna"
    );
    assert!(test.cloud.row("bookings", &booking.id).is_none());

    let report = test.studio.sync_now().await.expect("drain while offline");
    assert!(report.offline);
    let summary = queue::summary(&test.studio.store, false).await.expect("summary");
    assert!(summary.pending >= 3);

    test.restore_network();
    let report = test.studio.sync_now().await.expect("drain after reconnect");
    assert!(!report.offline);
    assert_eq!(report.failed, 0);
    assert!(test.studio.is_online());

    assert_eq!(
        test.calls_for(&booking.id),
        vec![
            ("upsert", "bookings".to_string()),
            ("update", "bookings".to_string()),
            ("update", "bookings".to_string()),
        ]
    );
    let row = test.cloud.row("bookings", &booking.id).expect("mirrored");
    assert_eq!(row.get("category"), Some(&json!("wedding + henna")));
    let summary = queue::summary(&test.studio.store, true).await.expect("summary");
    assert_eq!(summary.pending, 0);
    assert_eq!(summary.dead, 0);
}

#[test_log::test(tokio::test)]
async fn delete_of_missing_cloud_row_is_already_satisfied() {
    let test = TestStudio::new().await;
    queue::enqueue(
        &test.studio.store,
        EntityKind::Reminder,
        "gone",
        SyncOperation::Delete,
        serde_json::Value::Null,
    )
    .await
    .expect("enqueue");

    let report = test.studio.sync_now().await.expect("drain");
    assert_eq!(report.already_satisfied, 1);
    assert_eq!(report.failed, 0);

    // A second pass has nothing left to do.
    let report = test.studio.sync_now().await.expect("drain again");
    assert_eq!(report.applied + report.already_satisfied, 0);
}

#[test_log::test(tokio::test)]
async fn newer_write_waits_behind_queued_one() {
    let test = TestStudio::new().await;
    test.go_offline();
    let booking = create_booking(
        &test.studio,
        &reception(),
        NewBooking::new("Queued First", date(9, 1)),
    )
    .await
    .expect("create");

    // Back online, but the create is still queued: the update must not jump it.
    test.restore_network();
    test.studio.connectivity.set_online(true);
    let patch = BookingPatch {
        client_phone: Some("0661 00 00 00".to_string()),
        ..BookingPatch::default()
    };
    update_booking(&test.studio, &reception(), &booking.id, patch)
        .await
        .expect("update");
    assert!(test.cloud.row("bookings", &booking.id).is_none());

    test.studio.sync_now().await.expect("drain");
    let row = test.cloud.row("bookings", &booking.id).expect("mirrored");
    assert_eq!(row.get("client_phone"), Some(&json!("0661 00 00 00")));
}
