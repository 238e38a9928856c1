use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Entity types mirrored between the local store and the cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Booking,
    Reminder,
    DashboardTask,
    InventoryItem,
    InventoryLog,
    ActivityLog,
    BookingConflict,
}

impl EntityKind {
    pub const ALL: [Self; 7] = [
        Self::Booking,
        Self::Reminder,
        Self::DashboardTask,
        Self::InventoryItem,
        Self::InventoryLog,
        Self::ActivityLog,
        Self::BookingConflict,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Reminder => "reminder",
            Self::DashboardTask => "dashboard_task",
            Self::InventoryItem => "inventory_item",
            Self::InventoryLog => "inventory_log",
            Self::ActivityLog => "activity_log",
            Self::BookingConflict => "booking_conflict",
        }
    }

    /// Table name shared by the local store and the cloud.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Booking => "bookings",
            Self::Reminder => "reminders",
            Self::DashboardTask => "dashboard_tasks",
            Self::InventoryItem => "inventory",
            Self::InventoryLog => "inventory_logs",
            Self::ActivityLog => "activity_logs",
            Self::BookingConflict => "booking_conflicts",
        }
    }

    /// ## Summary
    /// Parses an entity kind from its storage name.
    ///
    /// ## Errors
    /// Returns `InvalidInput` for an unknown kind.
    pub fn parse(value: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value || kind.table() == value)
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown entity kind '{value}'")))
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of mutation carried by an outbound sync entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_parse_accepts_table_names() {
        assert_eq!(EntityKind::parse("bookings").ok(), Some(EntityKind::Booking));
        assert_eq!(
            EntityKind::parse("inventory_item").ok(),
            Some(EntityKind::InventoryItem)
        );
        assert!(EntityKind::parse("payments").is_err());
    }
}
