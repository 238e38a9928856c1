use chrono::{DateTime, Utc};
use darkroom_core::actor::Rank;
use darkroom_core::types::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::schema::{BOOKING_CONFLICTS, TableSchema};
use crate::db::wire::SqlValue;
use crate::model::booking::Booking;
use crate::model::{CloudRecord, LocalRecord, rank_level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ConflictStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// A booking edit held back because a higher-ranked actor edited the row last.
/// Never deleted; only its status moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConflict {
    pub id: String,
    pub booking_id: String,
    pub proposed_by_id: String,
    pub proposed_by_name: String,
    #[serde(with = "rank_level")]
    pub proposed_rank: Rank,
    /// The full booking as the proposer wanted it stored.
    pub proposal: Booking,
    pub status: ConflictStatus,
    pub resolved_by_id: Option<String>,
    pub resolved_by_name: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BookingConflict {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ConflictStatus::Pending
    }
}

impl LocalRecord for BookingConflict {
    const SCHEMA: &'static TableSchema = &BOOKING_CONFLICTS;

    fn key(&self) -> SqlValue {
        SqlValue::from(self.id.as_str())
    }
}

impl CloudRecord for BookingConflict {
    const KIND: EntityKind = EntityKind::BookingConflict;
    const CLOUD_ALIASES: &'static [(&'static str, &'static [&'static str])] = &[
        ("proposal", &["proposed_data", "payload"]),
        ("proposedById", &["user_id"]),
        ("proposedByName", &["user_name"]),
    ];

    fn record_id(&self) -> &str {
        &self.id
    }

    fn normalize_cloud(object: &mut Map<String, Value>) {
        if let Some(Value::String(status)) = object.get_mut("status") {
            *status = match status.trim().to_ascii_lowercase().as_str() {
                "resolved" | "approved" | "accepted" => "accepted".to_string(),
                "rejected" | "declined" => "rejected".to_string(),
                _ => "pending".to_string(),
            };
        }
    }
}
