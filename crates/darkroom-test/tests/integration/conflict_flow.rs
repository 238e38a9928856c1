//! Rank-based conflict resolution across the whole edit path.

use darkroom_test::ServiceError;
use darkroom_test::component::actor::{Actor, Rank, Role};
use darkroom_test::component::booking::{
    BookingPatch, BookingUpdate, NewBooking, create_booking, get_booking, update_booking,
};
use darkroom_test::component::conflict::{accept_conflict, list_conflicts};
use darkroom_test::component::model::conflict::ConflictStatus;

use super::helpers::*;

fn phone(number: &str) -> BookingPatch {
    BookingPatch {
        client_phone: Some(number.to_string()),
        ..BookingPatch::default()
    }
}

#[test_log::test(tokio::test)]
async fn manager_edit_protects_booking_until_accepted() {
    let test = TestStudio::new().await;
    let booking = create_booking(
        &test.studio,
        &reception(),
        NewBooking::new("Sara & Adel", date(10, 3)),
    )
    .await
    .expect("create");

    // Manager over reception applies.
    let BookingUpdate::Applied(managed) =
        update_booking(&test.studio, &manager(), &booking.id, phone("0550 11 11 11"))
            .await
            .expect("manager edit")
    else {
        panic!("manager edit must apply");
    };
    assert_eq!(managed.last_editor_rank, Rank::Manager);

    // Reception over manager is held back.
    let BookingUpdate::Deferred(pending) =
        update_booking(&test.studio, &reception(), &booking.id, phone("0550 22 22 22"))
            .await
            .expect("reception edit")
    else {
        panic!("reception edit must be deferred");
    };
    let live = get_booking(&test.studio, &booking.id).await.expect("live");
    assert_eq!(live.client_phone.as_deref(), Some("0550 11 11 11"));
    assert_eq!(
        list_conflicts(&test.studio, Some(ConflictStatus::Pending)).await.len(),
        1
    );
    assert!(test.cloud.row("booking_conflicts", &pending.id).is_some());

    let accepted = accept_conflict(&test.studio, &manager(), &pending.id)
        .await
        .expect("accept");
    assert_eq!(accepted.client_phone.as_deref(), Some("0550 22 22 22"));
    assert_eq!(accepted.last_editor_rank, Rank::MAX);

    // Another manager now defers behind the owner-level approval; the
    // approving manager still edits freely.
    let colleague = Actor::new("u-manager-2", "Yacine Floor", Role::Manager);
    let after = update_booking(&test.studio, &colleague, &booking.id, phone("0550 33 33 33"))
        .await
        .expect("colleague edit");
    assert!(matches!(after, BookingUpdate::Deferred(_)));
    let own = update_booking(&test.studio, &manager(), &booking.id, phone("0550 44 44 44"))
        .await
        .expect("approver edit");
    assert!(matches!(own, BookingUpdate::Applied(_)));

    let twice = accept_conflict(&test.studio, &manager(), &pending.id).await;
    assert!(matches!(twice, Err(ServiceError::AlreadyResolved(_))));
}
