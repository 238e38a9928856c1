use chrono::{DateTime, Utc};
use darkroom_core::types::{EntityKind, SyncOperation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::schema::{SYNC_QUEUE, TableSchema};
use crate::db::wire::SqlValue;
use crate::model::{LocalRecord, null_default};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    #[default]
    Pending,
    /// Gave up after too many failures or a permanent rejection. Kept for inspection.
    Dead,
}

impl QueueStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dead => "dead",
        }
    }
}

/// One outbound mutation waiting for the cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueEntry {
    /// Store-assigned sequence; defines FIFO order.
    pub id: i64,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub operation: SyncOperation,
    /// Cloud-shaped row (create/update) or null (delete).
    #[serde(default)]
    pub payload: Value,
    #[serde(default, deserialize_with = "null_default")]
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_default")]
    pub retry_count: u32,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl SyncQueueEntry {
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == QueueStatus::Pending && self.next_attempt_at.is_none_or(|at| at <= now)
    }
}

impl LocalRecord for SyncQueueEntry {
    const SCHEMA: &'static TableSchema = &SYNC_QUEUE;

    fn key(&self) -> SqlValue {
        SqlValue::Integer(self.id)
    }
}
