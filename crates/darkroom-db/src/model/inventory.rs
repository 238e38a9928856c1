use chrono::{DateTime, Utc};
use darkroom_core::error::{CoreError, CoreResult};
use darkroom_core::types::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::schema::{INVENTORY, INVENTORY_LOGS, TableSchema};
use crate::db::wire::SqlValue;
use crate::model::{CloudRecord, LocalRecord, null_default};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Camera,
    Lens,
    Light,
    Accessory,
    Drone,
    Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    #[default]
    Storage,
    /// Out with a staff member; always has an assignee.
    Deployed,
    Maintenance,
}

impl InventoryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Deployed => "deployed",
            Self::Maintenance => "maintenance",
        }
    }
}

/// Physical asset tracked by the studio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub item_type: ItemType,
    #[serde(default, deserialize_with = "null_default")]
    pub status: InventoryStatus,
    pub assigned_to: Option<String>,
    pub assigned_to_name: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub battery_total: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub battery_charged: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub memory_total: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub memory_free: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl InventoryItem {
    /// ## Summary
    /// Checks pool bounds and the status/assignee pairing.
    ///
    /// ## Errors
    /// Returns `ValidationError` describing the first violated rule.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ValidationError("item name is required".to_string()));
        }
        if self.battery_charged > self.battery_total {
            return Err(CoreError::ValidationError(format!(
                "{} charged batteries exceed the {} available",
                self.battery_charged, self.battery_total
            )));
        }
        if self.memory_free > self.memory_total {
            return Err(CoreError::ValidationError(format!(
                "{} free memory cards exceed the {} available",
                self.memory_free, self.memory_total
            )));
        }
        match (self.status, self.assigned_to.is_some()) {
            (InventoryStatus::Deployed, false) => Err(CoreError::ValidationError(
                "a deployed item needs an assignee".to_string(),
            )),
            (InventoryStatus::Storage | InventoryStatus::Maintenance, true) => {
                Err(CoreError::ValidationError(format!(
                    "an item in {} cannot have an assignee",
                    self.status.as_str()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Marks one battery charged. No-op when all are charged.
    pub fn charge_battery(&mut self) -> bool {
        step_up(&mut self.battery_charged, self.battery_total)
    }

    /// Marks one battery drained. No-op when none are charged.
    pub fn drain_battery(&mut self) -> bool {
        step_down(&mut self.battery_charged)
    }

    /// Marks one memory card used. No-op when none are free.
    pub fn use_memory_card(&mut self) -> bool {
        step_down(&mut self.memory_free)
    }

    /// Marks one memory card freed. No-op when all are free.
    pub fn free_memory_card(&mut self) -> bool {
        step_up(&mut self.memory_free, self.memory_total)
    }
}

fn step_up(counter: &mut u32, ceiling: u32) -> bool {
    if *counter >= ceiling {
        return false;
    }
    *counter += 1;
    true
}

fn step_down(counter: &mut u32) -> bool {
    if *counter == 0 {
        return false;
    }
    *counter -= 1;
    true
}

impl LocalRecord for InventoryItem {
    const SCHEMA: &'static TableSchema = &INVENTORY;

    fn key(&self) -> SqlValue {
        SqlValue::from(self.id.as_str())
    }
}

impl CloudRecord for InventoryItem {
    const KIND: EntityKind = EntityKind::InventoryItem;
    const CLOUD_ALIASES: &'static [(&'static str, &'static [&'static str])] = &[
        ("itemType", &["type", "category"]),
        ("batteryTotal", &["batteries_total", "total_batteries"]),
        ("batteryCharged", &["batteries_charged", "charged_batteries"]),
        ("memoryTotal", &["memory_cards_total", "total_memory_cards"]),
        ("memoryFree", &["memory_cards_free", "free_memory_cards"]),
        ("assignedTo", &["assignee_id"]),
        ("assignedToName", &["assignee_name"]),
    ];

    fn record_id(&self) -> &str {
        &self.id
    }

    fn normalize_cloud(object: &mut Map<String, Value>) {
        for field in ["itemType", "status"] {
            if let Some(Value::String(value)) = object.get_mut(field) {
                *value = value.trim().to_ascii_lowercase();
            }
        }
    }
}

/// What happened to an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryAction {
    Created,
    Assigned,
    Returned,
    MaintenanceIn,
    MaintenanceOut,
    BatteryCharged,
    BatteryDrained,
    MemoryUsed,
    MemoryFreed,
    NotesUpdated,
    Deleted,
    Purged,
}

impl InventoryAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::Returned => "returned",
            Self::MaintenanceIn => "maintenance_in",
            Self::MaintenanceOut => "maintenance_out",
            Self::BatteryCharged => "battery_charged",
            Self::BatteryDrained => "battery_drained",
            Self::MemoryUsed => "memory_used",
            Self::MemoryFreed => "memory_freed",
            Self::NotesUpdated => "notes_updated",
            Self::Deleted => "deleted",
            Self::Purged => "purged",
        }
    }
}

/// Append-only record of an inventory transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLog {
    pub id: String,
    pub item_id: String,
    pub action: InventoryAction,
    pub actor_id: String,
    pub actor_name: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl LocalRecord for InventoryLog {
    const SCHEMA: &'static TableSchema = &INVENTORY_LOGS;

    fn key(&self) -> SqlValue {
        SqlValue::from(self.id.as_str())
    }
}

impl CloudRecord for InventoryLog {
    const KIND: EntityKind = EntityKind::InventoryLog;
    const CLOUD_ALIASES: &'static [(&'static str, &'static [&'static str])] = &[
        ("itemId", &["inventory_id", "equipment_id"]),
        ("actorId", &["user_id"]),
        ("actorName", &["user_name"]),
        ("detail", &["details", "description"]),
    ];

    fn record_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: "i1".to_string(),
            name: "Canon R5".to_string(),
            item_type: ItemType::Camera,
            status: InventoryStatus::Storage,
            assigned_to: None,
            assigned_to_name: None,
            battery_total: 2,
            battery_charged: 1,
            memory_total: 1,
            memory_free: 1,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        }
    }

    #[test]
    fn test_battery_pool_is_bounded() {
        let mut item = item();
        assert!(item.charge_battery());
        assert!(!item.charge_battery());
        assert_eq!(item.battery_charged, 2);

        assert!(item.drain_battery());
        assert!(item.drain_battery());
        assert!(!item.drain_battery());
        assert_eq!(item.battery_charged, 0);
        assert!(item.validate().is_ok());
    }

    #[test]
    fn test_memory_pool_is_bounded() {
        let mut item = item();
        assert!(!item.free_memory_card());
        assert!(item.use_memory_card());
        assert!(!item.use_memory_card());
        assert_eq!(item.memory_free, 0);
    }

    #[test]
    fn test_status_assignee_pairing() {
        let mut item = item();
        item.status = InventoryStatus::Deployed;
        assert!(item.validate().is_err());

        item.assigned_to = Some("u1".to_string());
        assert!(item.validate().is_ok());

        item.status = InventoryStatus::Maintenance;
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_counts_above_total_are_invalid() {
        let mut item = item();
        item.battery_charged = 3;
        assert!(item.validate().is_err());
    }
}
