//! Soft delete, restore and the retention window, checked on both stores.

use serde_json::Value;

use darkroom_test::component::booking::{
    NewBooking, create_booking, delete_booking, get_booking, list_bookings, restore_booking,
};
use darkroom_test::component::model::reminder::Reminder;
use darkroom_test::component::reminder::{NewReminder, create_reminder, list_for_booking};
use darkroom_test::component::task::{create_task, list_for_booking as tasks_for_booking};

use super::helpers::*;

#[test_log::test(tokio::test)]
async fn restore_brings_back_the_same_booking_but_not_its_dependents() {
    let test = TestStudio::new().await;
    let booking = create_booking(
        &test.studio,
        &reception(),
        NewBooking::new("Kenza", date(11, 20)).window(hour(9), hour(12)),
    )
    .await
    .expect("create");
    let reminder = create_reminder(
        &test.studio,
        &reception(),
        NewReminder {
            booking_id: Some(booking.id.clone()),
            title: "Confirm venue".to_string(),
            due_date: date(11, 18),
            reminder_type: "call".to_string(),
        },
    )
    .await
    .expect("reminder");
    create_task(&test.studio, &reception(), Some(&booking.id), "Charge flashes", None)
        .await
        .expect("task");

    test.go_offline();
    delete_booking(&test.studio, &reception(), &booking.id)
        .await
        .expect("delete offline");
    assert_eq!(
        delete_booking(&test.studio, &reception(), &booking.id)
            .await
            .expect("delete twice"),
        0
    );
    assert!(list_bookings(&test.studio).await.is_empty());

    test.restore_network();
    test.studio.sync_now().await.expect("drain");
    let row = test.cloud.row("bookings", &booking.id).expect("cloud row kept");
    assert!(row.get("deleted_at").is_some_and(|at| !at.is_null()));
    assert!(test.cloud.row("reminders", &reminder.id).is_none());

    restore_booking(&test.studio, &manager(), &booking.id)
        .await
        .expect("restore");
    assert_eq!(get_booking(&test.studio, &booking.id).await.expect("live"), booking);
    let row = test.cloud.row("bookings", &booking.id).expect("cloud row");
    assert_eq!(row.get("deleted_at"), Some(&Value::Null));

    // Listing reconciles with the cloud; the dependents stay gone everywhere.
    assert!(list_for_booking(&test.studio, &booking.id).await.is_empty());
    assert!(tasks_for_booking(&test.studio, &booking.id).await.is_empty());
    let local: Vec<Reminder> = test.studio.store.all().await.expect("reminders");
    assert!(local.is_empty());
}

#[test_log::test(tokio::test)]
async fn restore_is_refused_once_retention_lapses() {
    let test = TestStudio::with(|settings| settings.retention.days = 0).await;
    let booking = create_booking(
        &test.studio,
        &reception(),
        NewBooking::new("Late Regret", date(12, 1)),
    )
    .await
    .expect("create");
    delete_booking(&test.studio, &reception(), &booking.id)
        .await
        .expect("delete");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let result = restore_booking(&test.studio, &manager(), &booking.id).await;
    assert!(matches!(
        result,
        Err(darkroom_test::ServiceError::RetentionExpired(_))
    ));
}
