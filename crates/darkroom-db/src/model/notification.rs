use chrono::{DateTime, Utc};
use darkroom_core::actor::Role;
use serde::{Deserialize, Serialize};

use crate::db::schema::{NOTIFICATIONS, TableSchema};
use crate::db::wire::SqlValue;
use crate::model::{LocalRecord, null_default};

/// Persisted copy of an event published to staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default, deserialize_with = "null_default")]
    pub target_roles: Vec<Role>,
    pub booking_id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl LocalRecord for Notification {
    const SCHEMA: &'static TableSchema = &NOTIFICATIONS;

    fn key(&self) -> SqlValue {
        SqlValue::from(self.id.as_str())
    }
}
