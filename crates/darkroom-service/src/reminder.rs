//! Follow-up reminders, free-standing or tied to a booking.

use chrono::{NaiveDate, Utc};
use darkroom_core::actor::Actor;
use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::model::reminder::Reminder;
use serde::Deserialize;

use crate::activity;
use crate::booking::get_booking;
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle;
use crate::mirror::list_mirrored;
use crate::studio::Studio;
use crate::sync::write::{insert_record, push_record};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    pub booking_id: Option<String>,
    pub title: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub reminder_type: String,
}

/// ## Summary
/// Creates a reminder. A reminder tied to a booking requires the booking to
/// be live.
///
/// ## Errors
/// - `ValidationError` for an empty title
/// - `NotFound` when the booking does not exist or is in the trash
#[tracing::instrument(skip(studio, actor, input), fields(actor = %actor.id))]
pub async fn create_reminder(
    studio: &Studio,
    actor: &Actor,
    input: NewReminder,
) -> ServiceResult<Reminder> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ServiceError::ValidationError("reminder title is required".to_string()));
    }
    if let Some(booking_id) = &input.booking_id {
        get_booking(studio, booking_id).await?;
    }

    let now = Utc::now();
    let reminder = Reminder {
        id: uuid::Uuid::now_v7().to_string(),
        booking_id: input.booking_id,
        title: title.to_string(),
        due_date: input.due_date,
        completed: false,
        reminder_type: input.reminder_type,
        created_by: Some(actor.id.clone()),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        deleted_by: None,
    };
    insert_record(studio, &reminder).await?;
    activity::record(
        studio,
        actor,
        "create",
        EntityKind::Reminder,
        &reminder.id,
        format!("Reminder '{}' due {}", reminder.title, reminder.due_date),
    )
    .await?;
    Ok(reminder)
}

/// ## Summary
/// Flips a reminder between done and open.
///
/// ## Errors
/// Returns `NotFound` when the reminder does not exist or is in the trash.
pub async fn toggle_reminder(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<Reminder> {
    let _guard = studio.store.lock_row(EntityKind::Reminder.table(), id).await;
    let mut reminder = match studio.store.find::<Reminder>(id).await? {
        Some(reminder) if reminder.deleted_at.is_none() => reminder,
        _ => return Err(ServiceError::NotFound(format!("reminder {id}"))),
    };
    reminder.completed = !reminder.completed;
    reminder.updated_at = Utc::now();

    studio.store.upsert(&reminder).await?;
    push_record(studio, SyncOperation::Update, &reminder).await?;
    activity::record(
        studio,
        actor,
        if reminder.completed { "complete" } else { "reopen" },
        EntityKind::Reminder,
        id,
        format!("Reminder '{}'", reminder.title),
    )
    .await?;
    Ok(reminder)
}

/// Live reminders by due date.
pub async fn list_reminders(studio: &Studio) -> Vec<Reminder> {
    let mut reminders: Vec<Reminder> = list_mirrored(studio).await;
    reminders.retain(|reminder| reminder.deleted_at.is_none());
    reminders.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
    reminders
}

pub async fn list_for_booking(studio: &Studio, booking_id: &str) -> Vec<Reminder> {
    let mut reminders = list_reminders(studio).await;
    reminders.retain(|reminder| reminder.booking_id.as_deref() == Some(booking_id));
    reminders
}

/// Open reminders due on or before `today`.
pub async fn due_reminders(studio: &Studio, today: NaiveDate) -> Vec<Reminder> {
    let mut reminders = list_reminders(studio).await;
    reminders.retain(|reminder| !reminder.completed && reminder.due_date <= today);
    reminders
}

/// ## Errors
/// See [`lifecycle::soft_delete`].
pub async fn delete_reminder(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<usize> {
    lifecycle::soft_delete(studio, actor, EntityKind::Reminder, id).await
}
