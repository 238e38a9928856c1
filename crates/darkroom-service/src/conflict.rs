//! Pending booking edits awaiting a manager's decision.

use chrono::Utc;
use darkroom_core::actor::{Actor, Rank, Role};
use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::model::booking::Booking;
use darkroom_db::model::conflict::{BookingConflict, ConflictStatus};

use crate::activity;
use crate::error::{ServiceError, ServiceResult};
use crate::mirror::list_mirrored;
use crate::notify::NewNotification;
use crate::studio::Studio;
use crate::sync::write::{insert_record, push_record};

/// ## Summary
/// Stores a deferred edit as a pending conflict and tells the managers.
///
/// ## Errors
/// Returns an error if the conflict cannot be stored or queued locally.
pub(crate) async fn record_conflict(
    studio: &Studio,
    actor: &Actor,
    proposal: Booking,
) -> ServiceResult<BookingConflict> {
    let conflict = BookingConflict {
        id: uuid::Uuid::now_v7().to_string(),
        booking_id: proposal.id.clone(),
        proposed_by_id: actor.id.clone(),
        proposed_by_name: actor.name.clone(),
        proposed_rank: actor.rank(),
        proposal,
        status: ConflictStatus::Pending,
        resolved_by_id: None,
        resolved_by_name: None,
        resolved_at: None,
        created_at: Utc::now(),
    };
    insert_record(studio, &conflict).await?;
    activity::record(
        studio,
        actor,
        "conflict",
        EntityKind::Booking,
        &conflict.booking_id,
        format!("Edit to {} awaits manager approval", conflict.proposal.client_name),
    )
    .await?;

    studio.notifier.publish_detached(
        &studio.store,
        NewNotification {
            kind: "booking_conflict",
            title: format!("Edit needs approval: {}", conflict.proposal.client_name),
            message: format!(
                "{} changed a booking last edited by a higher rank.",
                conflict.proposed_by_name
            ),
            target_roles: vec![Role::Manager, Role::Admin],
            booking_id: Some(conflict.booking_id.clone()),
        },
    );
    Ok(conflict)
}

/// ## Summary
/// Conflicts, newest first, optionally limited to one status.
pub async fn list_conflicts(studio: &Studio, status: Option<ConflictStatus>) -> Vec<BookingConflict> {
    let mut conflicts: Vec<BookingConflict> = list_mirrored(studio).await;
    if let Some(status) = status {
        conflicts.retain(|conflict| conflict.status == status);
    }
    conflicts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    conflicts
}

/// ## Errors
/// Returns `NotFound` when no such conflict exists.
pub async fn get_conflict(studio: &Studio, id: &str) -> ServiceResult<BookingConflict> {
    studio
        .store
        .find::<BookingConflict>(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("conflict {id}")))
}

async fn load_pending(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<BookingConflict> {
    actor.require(Rank::Manager, "resolve booking conflicts")?;
    let conflict = get_conflict(studio, id).await?;
    if !conflict.is_pending() {
        return Err(ServiceError::AlreadyResolved(format!(
            "conflict {id} was already {}",
            conflict.status.as_str()
        )));
    }
    Ok(conflict)
}

fn close(conflict: &mut BookingConflict, actor: &Actor, status: ConflictStatus) {
    conflict.status = status;
    conflict.resolved_by_id = Some(actor.id.clone());
    conflict.resolved_by_name = Some(actor.name.clone());
    conflict.resolved_at = Some(Utc::now());
}

/// ## Summary
/// Applies the proposed edit to the live booking. The workflow stage, the
/// payments and the provenance of the live booking are kept; everything else
/// comes from the proposal. The booking is then protected at the highest rank.
///
/// ## Errors
/// - `AuthorizationError` below manager rank
/// - `NotFound` when the conflict or its booking is missing or in the trash
/// - `AlreadyResolved` when the conflict is no longer pending
#[tracing::instrument(skip(studio, actor), fields(actor = %actor.id))]
pub async fn accept_conflict(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<Booking> {
    let _conflict_guard = studio.store.lock_row(EntityKind::BookingConflict.table(), id).await;
    let mut conflict = load_pending(studio, actor, id).await?;

    let _booking_guard = studio
        .store
        .lock_row(EntityKind::Booking.table(), &conflict.booking_id)
        .await;
    let live = match studio.store.find::<Booking>(conflict.booking_id.as_str()).await? {
        Some(booking) if !booking.is_deleted() => booking,
        _ => {
            return Err(ServiceError::NotFound(format!(
                "booking {} behind conflict {id}",
                conflict.booking_id
            )));
        }
    };

    let accepted = Booking {
        status: live.status,
        status_history: live.status_history,
        selection_confirmed_at: live.selection_confirmed_at,
        delivery_deadline: live.delivery_deadline,
        delivered_at: live.delivered_at,
        paid_amount: live.paid_amount,
        client_token: live.client_token,
        created_by: live.created_by,
        created_by_name: live.created_by_name,
        created_at: live.created_at,
        deleted_at: None,
        deleted_by: None,
        last_editor_rank: Rank::MAX,
        updated_by: Some(actor.id.clone()),
        updated_by_name: Some(format!(
            "{} (Approved by {})",
            conflict.proposed_by_name, actor.name
        )),
        updated_at: Utc::now(),
        ..conflict.proposal.clone()
    };
    close(&mut conflict, actor, ConflictStatus::Accepted);

    let mut tx = studio.store.begin();
    tx.upsert(&accepted)?;
    tx.upsert(&conflict)?;
    tx.commit().await?;

    push_record(studio, SyncOperation::Update, &accepted).await?;
    push_record(studio, SyncOperation::Update, &conflict).await?;
    activity::record(
        studio,
        actor,
        "conflict_accept",
        EntityKind::Booking,
        &accepted.id,
        format!(
            "Approved {}'s edit to {}",
            conflict.proposed_by_name, accepted.client_name
        ),
    )
    .await?;
    tracing::info!(booking_id = %accepted.id, "Conflict accepted");
    Ok(accepted)
}

/// ## Summary
/// Discards the proposed edit; the live booking is untouched.
///
/// ## Errors
/// - `AuthorizationError` below manager rank
/// - `NotFound` when the conflict does not exist
/// - `AlreadyResolved` when the conflict is no longer pending
#[tracing::instrument(skip(studio, actor), fields(actor = %actor.id))]
pub async fn reject_conflict(
    studio: &Studio,
    actor: &Actor,
    id: &str,
) -> ServiceResult<BookingConflict> {
    let _guard = studio.store.lock_row(EntityKind::BookingConflict.table(), id).await;
    let mut conflict = load_pending(studio, actor, id).await?;
    close(&mut conflict, actor, ConflictStatus::Rejected);

    studio.store.upsert(&conflict).await?;
    push_record(studio, SyncOperation::Update, &conflict).await?;
    activity::record(
        studio,
        actor,
        "conflict_reject",
        EntityKind::Booking,
        &conflict.booking_id,
        format!("Rejected {}'s edit", conflict.proposed_by_name),
    )
    .await?;
    Ok(conflict)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::booking::{BookingPatch, BookingUpdate, NewBooking, create_booking, update_booking};
    use crate::testing::{manager, memory_studio, reception};

    async fn deferred_edit(studio: &Studio) -> (Booking, BookingConflict) {
        let date = NaiveDate::from_ymd_opt(2026, 6, 12).expect("date");
        let booking = create_booking(studio, &manager(), NewBooking::new("Amina B.", date))
            .await
            .expect("create");
        let patch = BookingPatch {
            client_phone: Some("0555 12 34 56".to_string()),
            total_amount: Some(40_000.0),
            ..BookingPatch::default()
        };
        let BookingUpdate::Deferred(conflict) = update_booking(studio, &reception(), &booking.id, patch)
            .await
            .expect("update")
        else {
            panic!("reception edit over a manager edit must be deferred");
        };
        (booking, conflict)
    }

    #[test_log::test(tokio::test)]
    async fn test_accept_applies_proposal_at_highest_rank() {
        let (studio, cloud) = memory_studio().await.expect("studio");
        let (booking, conflict) = deferred_edit(&studio).await;
        assert_eq!(
            studio.store.find::<Booking>(booking.id.as_str()).await.expect("find"),
            Some(booking.clone())
        );

        let accepted = accept_conflict(&studio, &manager(), &conflict.id)
            .await
            .expect("accept");
        assert_eq!(accepted.client_phone.as_deref(), Some("0555 12 34 56"));
        assert!((accepted.total_amount - 40_000.0).abs() < f64::EPSILON);
        assert_eq!(accepted.last_editor_rank, Rank::MAX);
        assert_eq!(
            accepted.updated_by_name.as_deref(),
            Some("Karim Desk (Approved by Samira Manager)")
        );
        assert_eq!(accepted.status_history, booking.status_history);

        let stored = get_conflict(&studio, &conflict.id).await.expect("conflict");
        assert_eq!(stored.status, ConflictStatus::Accepted);
        assert_eq!(stored.resolved_by_id.as_deref(), Some("u-manager"));
        let row = cloud.row("bookings", &booking.id).expect("mirrored");
        assert_eq!(row.get("total_amount"), Some(&serde_json::json!(40_000.0)));

        let again = accept_conflict(&studio, &manager(), &conflict.id).await;
        assert!(matches!(again, Err(ServiceError::AlreadyResolved(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_reject_leaves_booking_untouched() {
        let (studio, _cloud) = memory_studio().await.expect("studio");
        let (booking, conflict) = deferred_edit(&studio).await;

        let denied = reject_conflict(&studio, &reception(), &conflict.id).await;
        assert!(matches!(denied, Err(ServiceError::AuthorizationError(_))));

        let rejected = reject_conflict(&studio, &manager(), &conflict.id)
            .await
            .expect("reject");
        assert_eq!(rejected.status, ConflictStatus::Rejected);
        assert_eq!(
            studio.store.find::<Booking>(booking.id.as_str()).await.expect("find"),
            Some(booking)
        );
        assert!(list_conflicts(&studio, Some(ConflictStatus::Pending)).await.is_empty());
        assert_eq!(list_conflicts(&studio, None).await.len(), 1);
    }
}
