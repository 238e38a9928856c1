//! Append-only audit trail of every mutation.

use chrono::Utc;
use darkroom_core::actor::Actor;
use darkroom_core::types::EntityKind;
use darkroom_db::model::activity::ActivityLog;

use crate::error::ServiceResult;
use crate::mirror::list_mirrored;
use crate::studio::Studio;
use crate::sync::write::insert_record;

/// ## Summary
/// Appends an audit entry and mirrors it.
///
/// ## Errors
/// Returns an error if the entry cannot be stored or queued locally.
#[tracing::instrument(skip(studio, actor, summary), fields(actor = %actor.id))]
pub async fn record(
    studio: &Studio,
    actor: &Actor,
    action: &str,
    kind: EntityKind,
    entity_id: &str,
    summary: impl Into<String>,
) -> ServiceResult<ActivityLog> {
    let entry = ActivityLog {
        id: uuid::Uuid::now_v7().to_string(),
        actor_id: actor.id.clone(),
        actor_name: actor.name.clone(),
        actor_role: actor.role_label().to_string(),
        action: action.to_string(),
        entity_type: kind.as_str().to_string(),
        entity_id: entity_id.to_string(),
        summary: summary.into(),
        created_at: Utc::now(),
    };
    insert_record(studio, &entry).await?;
    Ok(entry)
}

/// ## Summary
/// Audit entries, newest first, optionally limited to one entity.
pub async fn list(studio: &Studio, entity: Option<(EntityKind, &str)>) -> Vec<ActivityLog> {
    let mut entries: Vec<ActivityLog> = list_mirrored(studio).await;
    if let Some((kind, id)) = entity {
        entries.retain(|entry| entry.entity_type == kind.as_str() && entry.entity_id == id);
    }
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_studio, reception};

    #[test_log::test(tokio::test)]
    async fn test_entries_are_mirrored_and_listed_newest_first() {
        let (studio, cloud) = memory_studio().await.expect("studio");
        let actor = reception();

        record(&studio, &actor, "create", EntityKind::Booking, "b1", "Booked a wedding")
            .await
            .expect("first");
        record(&studio, &actor, "update", EntityKind::Booking, "b1", "Moved to June")
            .await
            .expect("second");
        record(&studio, &actor, "create", EntityKind::Reminder, "r1", "Call back")
            .await
            .expect("third");

        assert_eq!(cloud.rows("activity_logs").len(), 3);
        let for_booking = list(&studio, Some((EntityKind::Booking, "b1"))).await;
        let summaries: Vec<_> = for_booking.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(summaries, vec!["Moved to June", "Booked a wedding"]);
        assert_eq!(for_booking[0].actor_role, "Reception");
    }
}
