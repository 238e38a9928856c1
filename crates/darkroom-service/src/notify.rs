//! Fire-and-forget staff notifications: in-process pub/sub plus a capped persisted list.

use chrono::Utc;
use darkroom_core::actor::Role;
use darkroom_db::db::query::{Direction, Filter};
use darkroom_db::db::store::LocalStore;
use darkroom_db::db::wire::SqlValue;
use darkroom_db::model::LocalRecord;
use darkroom_db::model::notification::Notification;
use tokio::sync::broadcast;

use crate::error::ServiceResult;

const CHANNEL_DEPTH: usize = 64;

/// Event about to be published.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub target_roles: Vec<Role>,
    pub booking_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
    capacity: usize,
}

impl Notifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(CHANNEL_DEPTH);
        Self {
            sender,
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// ## Summary
    /// Persists and broadcasts a notification, then trims the persisted list
    /// to the configured capacity (oldest first).
    ///
    /// ## Errors
    /// Returns an error if the local store write fails.
    #[tracing::instrument(skip(self, store, event), fields(kind = event.kind))]
    pub async fn publish(
        &self,
        store: &LocalStore,
        event: NewNotification,
    ) -> ServiceResult<Notification> {
        let notification = Notification {
            id: uuid::Uuid::now_v7().to_string(),
            kind: event.kind.to_string(),
            title: event.title,
            message: event.message,
            target_roles: event.target_roles,
            booking_id: event.booking_id,
            read: false,
            created_at: Utc::now(),
        };
        store.upsert(&notification).await?;
        self.trim(store).await?;

        // No subscribers is fine.
        if self.sender.send(notification.clone()).is_err() {
            tracing::trace!("Notification published with no live subscribers");
        }
        Ok(notification)
    }

    /// ## Summary
    /// Fire-and-forget variant of [`Notifier::publish`]; failures are logged.
    pub fn publish_detached(&self, store: &LocalStore, event: NewNotification) {
        let notifier = self.clone();
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.publish(&store, event).await {
                tracing::warn!(error = %err, "Failed to publish notification");
            }
        });
    }

    /// ## Summary
    /// Persisted notifications, newest first.
    ///
    /// ## Errors
    /// Returns an error if the local store read fails.
    pub async fn list(&self, store: &LocalStore) -> ServiceResult<Vec<Notification>> {
        Ok(store
            .find_where(Filter::IsNotNull("id"), Some(("createdAt", Direction::Desc)))
            .await?)
    }

    /// ## Summary
    /// Persisted notifications addressed to `role`, newest first.
    ///
    /// ## Errors
    /// Returns an error if the local store read fails.
    pub async fn list_for_role(
        &self,
        store: &LocalStore,
        role: Role,
    ) -> ServiceResult<Vec<Notification>> {
        let mut all = self.list(store).await?;
        all.retain(|n| n.target_roles.is_empty() || n.target_roles.contains(&role));
        Ok(all)
    }

    /// ## Errors
    /// Returns an error if the local store write fails.
    pub async fn mark_read(&self, store: &LocalStore, id: &str) -> ServiceResult<bool> {
        let changed = store
            .update_where(
                Notification::SCHEMA,
                vec![("read", SqlValue::from(true))],
                &Filter::id(id),
            )
            .await?;
        Ok(changed > 0)
    }

    async fn trim(&self, store: &LocalStore) -> ServiceResult<()> {
        let all = self.list(store).await?;
        if all.len() <= self.capacity {
            return Ok(());
        }
        let stale: Vec<SqlValue> = all[self.capacity..]
            .iter()
            .map(|n| SqlValue::from(n.id.as_str()))
            .collect();
        let removed = store
            .delete_where(Notification::SCHEMA, &Filter::In("id", stale))
            .await?;
        tracing::debug!(removed, "Trimmed notification list");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use darkroom_db::db::connection::open_in_memory;

    use super::*;

    fn event(n: usize) -> NewNotification {
        NewNotification {
            kind: "booking_delivered",
            title: format!("Delivered #{n}"),
            message: "Clean up the shoot folder".to_string(),
            target_roles: vec![Role::Editor, Role::Printer],
            booking_id: Some(format!("b{n}")),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_list_is_capped_to_newest() {
        let store = open_in_memory().await.expect("store");
        let notifier = Notifier::new(3);

        for n in 0..5 {
            notifier.publish(&store, event(n)).await.expect("publish");
        }

        let all = notifier.list(&store).await.expect("list");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].title, "Delivered #4");
        assert_eq!(all[2].title, "Delivered #2");
    }

    #[test_log::test(tokio::test)]
    async fn test_subscribers_receive_events() {
        let store = open_in_memory().await.expect("store");
        let notifier = Notifier::new(50);
        let mut rx = notifier.subscribe();

        notifier.publish(&store, event(1)).await.expect("publish");
        let received = rx.recv().await.expect("event");
        assert_eq!(received.booking_id.as_deref(), Some("b1"));

        let for_reception = notifier
            .list_for_role(&store, Role::Reception)
            .await
            .expect("list");
        assert!(for_reception.is_empty());
    }
}
