use chrono::{DateTime, Utc};
use darkroom_core::types::EntityKind;
use serde::{Deserialize, Serialize};

use crate::db::schema::{ACTIVITY_LOGS, TableSchema};
use crate::db::wire::SqlValue;
use crate::model::{CloudRecord, LocalRecord};

/// Immutable audit record of one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub actor_id: String,
    pub actor_name: String,
    /// Human-readable role label at the time of the action.
    pub actor_role: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl LocalRecord for ActivityLog {
    const SCHEMA: &'static TableSchema = &ACTIVITY_LOGS;

    fn key(&self) -> SqlValue {
        SqlValue::from(self.id.as_str())
    }
}

impl CloudRecord for ActivityLog {
    const KIND: EntityKind = EntityKind::ActivityLog;
    const CLOUD_ALIASES: &'static [(&'static str, &'static [&'static str])] = &[
        ("actorId", &["user_id"]),
        ("actorName", &["user_name"]),
        ("actorRole", &["user_role"]),
        ("summary", &["details", "description"]),
    ];

    fn record_id(&self) -> &str {
        &self.id
    }
}
