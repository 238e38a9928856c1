use chrono::{DateTime, NaiveDate, Utc};
use darkroom_core::types::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::schema::{REMINDERS, TableSchema};
use crate::db::wire::SqlValue;
use crate::model::cloud::date_only;
use crate::model::{CloudRecord, LocalRecord, null_default};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    /// Owning booking. Free-standing reminders have none.
    pub booking_id: Option<String>,
    pub title: String,
    pub due_date: NaiveDate,
    #[serde(default, deserialize_with = "null_default")]
    pub completed: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub reminder_type: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl LocalRecord for Reminder {
    const SCHEMA: &'static TableSchema = &REMINDERS;

    fn key(&self) -> SqlValue {
        SqlValue::from(self.id.as_str())
    }
}

impl CloudRecord for Reminder {
    const KIND: EntityKind = EntityKind::Reminder;
    const CLOUD_ALIASES: &'static [(&'static str, &'static [&'static str])] = &[
        ("dueDate", &["date", "remind_at"]),
        ("reminderType", &["type"]),
        ("completed", &["is_completed", "done"]),
    ];

    fn record_id(&self) -> &str {
        &self.id
    }

    fn normalize_cloud(object: &mut Map<String, Value>) {
        date_only(object, "dueDate");
    }
}
