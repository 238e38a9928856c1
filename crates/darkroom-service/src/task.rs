//! Dashboard tasks handed to a role, usually for one booking.

use chrono::Utc;
use darkroom_core::actor::{Actor, Role};
use darkroom_core::types::{EntityKind, SyncOperation};
use darkroom_db::model::task::DashboardTask;

use crate::activity;
use crate::booking::get_booking;
use crate::error::{ServiceError, ServiceResult};
use crate::mirror::list_mirrored;
use crate::studio::Studio;
use crate::sync::write::{insert_record, push_record};

/// ## Summary
/// Adds a task to the dashboard of `assigned_role` (everyone when `None`).
///
/// ## Errors
/// - `ValidationError` for an empty title
/// - `NotFound` when the booking does not exist or is in the trash
#[tracing::instrument(skip(studio, actor), fields(actor = %actor.id))]
pub async fn create_task(
    studio: &Studio,
    actor: &Actor,
    booking_id: Option<&str>,
    title: &str,
    assigned_role: Option<Role>,
) -> ServiceResult<DashboardTask> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::ValidationError("task title is required".to_string()));
    }
    if let Some(booking_id) = booking_id {
        get_booking(studio, booking_id).await?;
    }

    let now = Utc::now();
    let task = DashboardTask {
        id: uuid::Uuid::now_v7().to_string(),
        booking_id: booking_id.map(str::to_string),
        title: title.to_string(),
        assigned_role: assigned_role.map(|role| role.as_str().to_string()),
        completed: false,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        deleted_by: None,
    };
    insert_record(studio, &task).await?;
    activity::record(
        studio,
        actor,
        "create",
        EntityKind::DashboardTask,
        &task.id,
        format!("Task '{}'", task.title),
    )
    .await?;
    Ok(task)
}

/// ## Errors
/// Returns `NotFound` when the task does not exist or is in the trash.
pub async fn toggle_task(studio: &Studio, actor: &Actor, id: &str) -> ServiceResult<DashboardTask> {
    let _guard = studio.store.lock_row(EntityKind::DashboardTask.table(), id).await;
    let mut task = match studio.store.find::<DashboardTask>(id).await? {
        Some(task) if task.deleted_at.is_none() => task,
        _ => return Err(ServiceError::NotFound(format!("task {id}"))),
    };
    task.completed = !task.completed;
    task.updated_at = Utc::now();

    studio.store.upsert(&task).await?;
    push_record(studio, SyncOperation::Update, &task).await?;
    activity::record(
        studio,
        actor,
        if task.completed { "complete" } else { "reopen" },
        EntityKind::DashboardTask,
        id,
        format!("Task '{}'", task.title),
    )
    .await?;
    Ok(task)
}

/// Live tasks visible to `role`, oldest first.
pub async fn list_for_role(studio: &Studio, role: Role) -> Vec<DashboardTask> {
    let mut tasks: Vec<DashboardTask> = list_mirrored(studio).await;
    tasks.retain(|task| {
        task.deleted_at.is_none()
            && task.assigned_role.as_deref().is_none_or(|assigned| assigned == role.as_str())
    });
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    tasks
}

pub async fn list_for_booking(studio: &Studio, booking_id: &str) -> Vec<DashboardTask> {
    let mut tasks: Vec<DashboardTask> = list_mirrored(studio).await;
    tasks.retain(|task| task.deleted_at.is_none() && task.booking_id.as_deref() == Some(booking_id));
    tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    tasks
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::booking::{NewBooking, create_booking};
    use crate::testing::{memory_studio, reception};

    #[test_log::test(tokio::test)]
    async fn test_tasks_follow_role_and_booking() {
        let (studio, _cloud) = memory_studio().await.expect("studio");
        let date = NaiveDate::from_ymd_opt(2026, 7, 4).expect("date");
        let booking = create_booking(&studio, &reception(), NewBooking::new("Walid", date))
            .await
            .expect("booking");

        let edit = create_task(&studio, &reception(), Some(&booking.id), "Retouch portraits", Some(Role::Editor))
            .await
            .expect("edit task");
        create_task(&studio, &reception(), None, "Restock frames", None)
            .await
            .expect("shared task");

        let for_editor: Vec<String> = list_for_role(&studio, Role::Editor)
            .await
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(for_editor, vec!["Retouch portraits", "Restock frames"]);
        assert_eq!(list_for_role(&studio, Role::Printer).await.len(), 1);
        assert_eq!(list_for_booking(&studio, &booking.id).await, vec![edit.clone()]);

        let done = toggle_task(&studio, &reception(), &edit.id).await.expect("toggle");
        assert!(done.completed);
    }
}
