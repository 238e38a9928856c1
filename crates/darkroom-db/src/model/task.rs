use chrono::{DateTime, Utc};
use darkroom_core::types::EntityKind;
use serde::{Deserialize, Serialize};

use crate::db::schema::{DASHBOARD_TASKS, TableSchema};
use crate::db::wire::SqlValue;
use crate::model::{CloudRecord, LocalRecord, null_default};

/// Work item shown on a role's dashboard, usually tied to a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTask {
    pub id: String,
    pub booking_id: Option<String>,
    pub title: String,
    pub assigned_role: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl LocalRecord for DashboardTask {
    const SCHEMA: &'static TableSchema = &DASHBOARD_TASKS;

    fn key(&self) -> SqlValue {
        SqlValue::from(self.id.as_str())
    }
}

impl CloudRecord for DashboardTask {
    const KIND: EntityKind = EntityKind::DashboardTask;
    const CLOUD_ALIASES: &'static [(&'static str, &'static [&'static str])] =
        &[("assignedRole", &["role", "assigned_to"]), ("completed", &["done", "is_done"])];

    fn record_id(&self) -> &str {
        &self.id
    }
}
